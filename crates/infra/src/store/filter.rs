use agencyops_core::{AgencyId, UserId};
use agencyops_recharges::RechargeRequest;
use agencyops_requests::SupportRequest;
use agencyops_transactions::Transaction;

/// Assignee criterion of a [`ListFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Assignee {
    #[default]
    Any,
    Unassigned,
    Is(UserId),
}

/// Row filter for work items. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only rows in a non-terminal status.
    pub open_only: bool,
    pub assignee: Assignee,
    /// Submitter (agent, requester).
    pub owner: Option<UserId>,
    pub agency_id: Option<AgencyId>,
    /// Named decider (the chef of a recharge request).
    pub approver: Option<UserId>,
}

impl ListFilter {
    pub fn open() -> Self {
        Self {
            open_only: true,
            ..Self::default()
        }
    }

    pub fn assigned(mut self, assignee: Assignee) -> Self {
        self.assignee = assignee;
        self
    }

    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn in_agency(mut self, agency_id: AgencyId) -> Self {
        self.agency_id = Some(agency_id);
        self
    }

    pub fn decided_by(mut self, approver: UserId) -> Self {
        self.approver = Some(approver);
        self
    }

    pub(crate) fn matches<T: Listed>(&self, row: &T) -> bool {
        if self.open_only && !row.is_open() {
            return false;
        }
        let assignee_ok = match self.assignee {
            Assignee::Any => true,
            Assignee::Unassigned => row.assignee().is_none(),
            Assignee::Is(id) => row.assignee() == Some(id),
        };
        assignee_ok
            && self.owner.is_none_or(|o| row.owner() == o)
            && self.agency_id.is_none_or(|a| row.agency() == Some(a))
            && self.approver.is_none_or(|a| row.approver() == Some(a))
    }
}

/// What a listable row exposes to [`ListFilter`].
pub(crate) trait Listed {
    fn owner(&self) -> UserId;

    fn is_open(&self) -> bool;

    fn assignee(&self) -> Option<UserId> {
        None
    }

    fn agency(&self) -> Option<AgencyId> {
        None
    }

    fn approver(&self) -> Option<UserId> {
        None
    }
}

impl Listed for Transaction {
    fn owner(&self) -> UserId {
        self.agent_id()
    }

    fn is_open(&self) -> bool {
        Transaction::is_open(self)
    }

    fn assignee(&self) -> Option<UserId> {
        self.assigned_to()
    }

    fn agency(&self) -> Option<AgencyId> {
        self.agency_id()
    }
}

impl Listed for RechargeRequest {
    fn owner(&self) -> UserId {
        self.agent_id()
    }

    fn is_open(&self) -> bool {
        self.is_created() && !self.status().is_terminal()
    }

    fn approver(&self) -> Option<UserId> {
        Some(self.chef_agence_id())
    }
}

impl Listed for SupportRequest {
    fn owner(&self) -> UserId {
        self.demandeur_id()
    }

    fn is_open(&self) -> bool {
        SupportRequest::is_open(self)
    }

    fn assignee(&self) -> Option<UserId> {
        self.assigned_to()
    }
}
