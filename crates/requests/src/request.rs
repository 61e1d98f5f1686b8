use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agencyops_auth::{Action, Grant, Resource, Workflow};
use agencyops_core::{Aggregate, AggregateRoot, DomainError, RequestId, UserId};
use agencyops_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Unassigned,
    Assigned,
    Resolved,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Unassigned => "unassigned",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Resolved => "resolved",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Resolved)
    }
}

/// Aggregate root: a support request raised by any user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportRequest {
    id: RequestId,
    created_at: DateTime<Utc>,
    demandeur_id: UserId,
    #[serde(rename = "type")]
    request_type: String,
    sujet: String,
    description: String,
    attachment_ref: Option<String>,
    status: RequestStatus,
    assigned_to: Option<UserId>,
    reponse: Option<String>,
    resolved_by_id: Option<UserId>,
    resolution_date: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl SupportRequest {
    pub fn empty(id: RequestId) -> Self {
        Self {
            id,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            demandeur_id: UserId::nil(),
            request_type: String::new(),
            sujet: String::new(),
            description: String::new(),
            attachment_ref: None,
            status: RequestStatus::Unassigned,
            assigned_to: None,
            reponse: None,
            resolved_by_id: None,
            resolution_date: None,
            version: 0,
            created: false,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn demandeur_id(&self) -> UserId {
        self.demandeur_id
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn sujet(&self) -> &str {
        &self.sujet
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn attachment_ref(&self) -> Option<&str> {
        self.attachment_ref.as_deref()
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn assigned_to(&self) -> Option<UserId> {
        self.assigned_to
    }

    pub fn reponse(&self) -> Option<&str> {
        self.reponse.as_deref()
    }

    pub fn resolved_by_id(&self) -> Option<UserId> {
        self.resolved_by_id
    }

    pub fn resolution_date(&self) -> Option<DateTime<Utc>> {
        self.resolution_date
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_open(&self) -> bool {
        self.created && !self.status.is_terminal()
    }

    pub fn resource(&self) -> Resource {
        Resource::SupportRequest {
            demandeur_id: self.demandeur_id,
            assigned_to: self.assigned_to,
        }
    }
}

impl AggregateRoot for SupportRequest {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitRequest.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub grant: Grant,
    pub request_type: String,
    pub sujet: String,
    pub description: String,
    pub attachment_ref: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClaimRequest.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequest {
    pub grant: Grant,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseRequest.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRequest {
    pub grant: Grant,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReassignRequest.
#[derive(Debug, Clone, PartialEq)]
pub struct ReassignRequest {
    pub grant: Grant,
    pub assignee: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResolveRequest.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveRequest {
    pub grant: Grant,
    pub reponse: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SupportRequestCommand {
    Submit(SubmitRequest),
    Claim(ClaimRequest),
    Release(ReleaseRequest),
    Reassign(ReassignRequest),
    Resolve(ResolveRequest),
}

/// Event: RequestSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubmitted {
    pub request_id: RequestId,
    pub demandeur_id: UserId,
    pub request_type: String,
    pub sujet: String,
    pub description: String,
    pub attachment_ref: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestClaimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestClaimed {
    pub request_id: RequestId,
    pub by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReleased {
    pub request_id: RequestId,
    pub by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestReassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReassigned {
    pub request_id: RequestId,
    pub by: UserId,
    pub to: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestResolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResolved {
    pub request_id: RequestId,
    pub by: UserId,
    pub reponse: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportRequestEvent {
    Submitted(RequestSubmitted),
    Claimed(RequestClaimed),
    Released(RequestReleased),
    Reassigned(RequestReassigned),
    Resolved(RequestResolved),
}

impl Event for SupportRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SupportRequestEvent::Submitted(_) => "requests.request.submitted",
            SupportRequestEvent::Claimed(_) => "requests.request.claimed",
            SupportRequestEvent::Released(_) => "requests.request.released",
            SupportRequestEvent::Reassigned(_) => "requests.request.reassigned",
            SupportRequestEvent::Resolved(_) => "requests.request.resolved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SupportRequestEvent::Submitted(e) => e.occurred_at,
            SupportRequestEvent::Claimed(e) => e.occurred_at,
            SupportRequestEvent::Released(e) => e.occurred_at,
            SupportRequestEvent::Reassigned(e) => e.occurred_at,
            SupportRequestEvent::Resolved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SupportRequest {
    type Command = SupportRequestCommand;
    type Event = SupportRequestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SupportRequestEvent::Submitted(e) => {
                self.id = e.request_id;
                self.created_at = e.occurred_at;
                self.demandeur_id = e.demandeur_id;
                self.request_type = e.request_type.clone();
                self.sujet = e.sujet.clone();
                self.description = e.description.clone();
                self.attachment_ref = e.attachment_ref.clone();
                self.status = RequestStatus::Unassigned;
                self.created = true;
            }
            SupportRequestEvent::Claimed(e) => {
                self.status = RequestStatus::Assigned;
                self.assigned_to = Some(e.by);
            }
            SupportRequestEvent::Released(_) => {
                self.status = RequestStatus::Unassigned;
                self.assigned_to = None;
            }
            SupportRequestEvent::Reassigned(e) => {
                self.status = RequestStatus::Assigned;
                self.assigned_to = Some(e.to);
            }
            SupportRequestEvent::Resolved(e) => {
                self.status = RequestStatus::Resolved;
                self.assigned_to = self.assigned_to.or(Some(e.by));
                self.reponse = Some(e.reponse.clone());
                self.resolved_by_id = Some(e.by);
                self.resolution_date = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SupportRequestCommand::Submit(cmd) => self.handle_submit(cmd),
            SupportRequestCommand::Claim(cmd) => self.handle_claim(cmd),
            SupportRequestCommand::Release(cmd) => self.handle_release(cmd),
            SupportRequestCommand::Reassign(cmd) => self.handle_reassign(cmd),
            SupportRequestCommand::Resolve(cmd) => self.handle_resolve(cmd),
        }
    }
}

fn non_blank(value: &str, field: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_owned())
}

impl SupportRequest {
    fn ensure_grant(grant: &Grant, action: Action) -> Result<(), DomainError> {
        if grant.workflow() != Workflow::SupportRequests || grant.action() != action {
            return Err(DomainError::invariant(format!(
                "grant for {:?}/{:?} used for support_requests/{action:?}",
                grant.workflow(),
                grant.action()
            )));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.status.is_terminal() {
            return Err(DomainError::already_finalized(self.status.as_str()));
        }
        Ok(())
    }

    fn ensure_assignee(&self, grant: &Grant) -> Result<(), DomainError> {
        if grant.overrides_assignment() || self.assigned_to == Some(grant.actor_id()) {
            return Ok(());
        }
        Err(DomainError::permission_denied("only the assignee may act on this request"))
    }

    fn handle_submit(&self, cmd: &SubmitRequest) -> Result<Vec<SupportRequestEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Submit)?;
        if self.created {
            return Err(DomainError::conflict("support request already exists"));
        }

        Ok(vec![SupportRequestEvent::Submitted(RequestSubmitted {
            request_id: self.id,
            demandeur_id: cmd.grant.actor_id(),
            request_type: non_blank(&cmd.request_type, "type")?,
            sujet: non_blank(&cmd.sujet, "sujet")?,
            description: non_blank(&cmd.description, "description")?,
            attachment_ref: cmd
                .attachment_ref
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_owned),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_claim(&self, cmd: &ClaimRequest) -> Result<Vec<SupportRequestEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Claim)?;
        self.ensure_open()?;
        if let Some(holder) = self.assigned_to {
            return Err(DomainError::AlreadyClaimed { holder });
        }

        Ok(vec![SupportRequestEvent::Claimed(RequestClaimed {
            request_id: self.id,
            by: cmd.grant.actor_id(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseRequest) -> Result<Vec<SupportRequestEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Release)?;
        self.ensure_open()?;
        if self.status != RequestStatus::Assigned {
            return Err(DomainError::invariant("only an assigned request can be released"));
        }
        self.ensure_assignee(&cmd.grant)?;

        Ok(vec![SupportRequestEvent::Released(RequestReleased {
            request_id: self.id,
            by: cmd.grant.actor_id(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reassign(&self, cmd: &ReassignRequest) -> Result<Vec<SupportRequestEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Reassign)?;
        self.ensure_open()?;
        if !cmd.grant.overrides_assignment() {
            return Err(DomainError::permission_denied("only admin_general may reassign"));
        }
        if self.assigned_to == Some(cmd.assignee) {
            return Err(DomainError::validation("request is already assigned to that user"));
        }

        Ok(vec![SupportRequestEvent::Reassigned(RequestReassigned {
            request_id: self.id,
            by: cmd.grant.actor_id(),
            to: cmd.assignee,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resolve(&self, cmd: &ResolveRequest) -> Result<Vec<SupportRequestEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Resolve)?;
        self.ensure_open()?;
        if self.assigned_to.is_none() && !cmd.grant.overrides_assignment() {
            return Err(DomainError::permission_denied("request must be claimed before it is resolved"));
        }
        self.ensure_assignee(&cmd.grant)?;

        Ok(vec![SupportRequestEvent::Resolved(RequestResolved {
            request_id: self.id,
            by: cmd.grant.actor_id(),
            reponse: non_blank(&cmd.reponse, "reponse")?,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_auth::{Actor, SubAdminPermissions, authorize};
    use agencyops_core::AgencyId;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn helpdesk() -> Actor {
        Actor::SousAdmin {
            id: UserId::new(),
            permissions: SubAdminPermissions {
                can_validate_transactions: false,
                can_manage_requests: true,
            },
        }
    }

    fn grant(actor: &Actor, action: Action, r: &SupportRequest) -> Grant {
        authorize(actor, Workflow::SupportRequests, action, &r.resource()).unwrap()
    }

    fn submitted() -> SupportRequest {
        let agent = Actor::Agent {
            id: UserId::new(),
            agency_id: Some(AgencyId::new()),
        };
        let cmd = SupportRequestCommand::Submit(SubmitRequest {
            grant: authorize(&agent, Workflow::SupportRequests, Action::Submit, &Resource::None).unwrap(),
            request_type: "probleme_technique".into(),
            sujet: "Solde non mis à jour".into(),
            description: "Ma recharge approuvée n'apparaît pas.".into(),
            attachment_ref: None,
            occurred_at: now(),
        });
        SupportRequest::empty(RequestId::new()).execute(&cmd).unwrap().0
    }

    fn claimed(actor: &Actor, r: &SupportRequest) -> Result<SupportRequest, DomainError> {
        r.execute(&SupportRequestCommand::Claim(ClaimRequest {
            grant: grant(actor, Action::Claim, r),
            occurred_at: now(),
        }))
        .map(|(next, _)| next)
    }

    #[test]
    fn submit_requires_subject_and_description() {
        let agent = Actor::Agent {
            id: UserId::new(),
            agency_id: None,
        };
        let cmd = SupportRequestCommand::Submit(SubmitRequest {
            grant: authorize(&agent, Workflow::SupportRequests, Action::Submit, &Resource::None).unwrap(),
            request_type: "autre".into(),
            sujet: " ".into(),
            description: "x".into(),
            attachment_ref: None,
            occurred_at: now(),
        });
        let err = SupportRequest::empty(RequestId::new()).handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("sujet")));
    }

    #[test]
    fn second_claimer_sees_the_winner() {
        let a = helpdesk();
        let b = helpdesk();
        let r = claimed(&a, &submitted()).unwrap();
        assert_eq!(r.status(), RequestStatus::Assigned);
        assert_eq!(claimed(&b, &r).unwrap_err(), DomainError::AlreadyClaimed { holder: a.id() });
    }

    #[test]
    fn resolve_requires_reponse_and_is_terminal() {
        let sub = helpdesk();
        let r = claimed(&sub, &submitted()).unwrap();

        let resolve = |reponse: &str, r: &SupportRequest| {
            r.execute(&SupportRequestCommand::Resolve(ResolveRequest {
                grant: authorize(
                    &Actor::AdminGeneral { id: UserId::new() },
                    Workflow::SupportRequests,
                    Action::Resolve,
                    &r.resource(),
                )
                .unwrap(),
                reponse: reponse.into(),
                occurred_at: now(),
            }))
        };

        assert!(matches!(resolve("", &r), Err(DomainError::Validation(_))));

        let (done, _) = r
            .execute(&SupportRequestCommand::Resolve(ResolveRequest {
                grant: grant(&sub, Action::Resolve, &r),
                reponse: "Recharge créditée, merci.".into(),
                occurred_at: now(),
            }))
            .unwrap();
        assert_eq!(done.status(), RequestStatus::Resolved);
        assert_eq!(done.resolved_by_id(), Some(sub.id()));
        assert!(done.resolution_date().is_some());
        assert_eq!(resolve("encore", &done).unwrap_err(), DomainError::AlreadyFinalized("resolved".into()));
    }

    #[test]
    fn release_and_reassign() {
        let sub = helpdesk();
        let other = helpdesk();
        let admin = Actor::AdminGeneral { id: UserId::new() };
        let r = claimed(&sub, &submitted()).unwrap();

        let (released, _) = r
            .execute(&SupportRequestCommand::Release(ReleaseRequest {
                grant: grant(&sub, Action::Release, &r),
                occurred_at: now(),
            }))
            .unwrap();
        assert_eq!(released.status(), RequestStatus::Unassigned);
        assert_eq!(released.assigned_to(), None);

        let (moved, _) = r
            .execute(&SupportRequestCommand::Reassign(ReassignRequest {
                grant: grant(&admin, Action::Reassign, &r),
                assignee: other.id(),
                occurred_at: now(),
            }))
            .unwrap();
        assert_eq!(moved.assigned_to(), Some(other.id()));
        assert_eq!(moved.status(), RequestStatus::Assigned);
    }
}
