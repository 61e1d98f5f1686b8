use chrono::Utc;
use serde::{Deserialize, Serialize};

use agencyops_auth::{Action, Actor, Resource, Workflow, can_perform};
use agencyops_catalog::Payload;
use agencyops_core::{AgencyId, Aggregate, AggregateRoot, ExpectedVersion, Money, OperationTypeId, TransactionId, UserId};
use agencyops_directory::ProfileChange;
use agencyops_events::{EventBus, TransitionEvent};
use agencyops_transactions::{
    RejectTransaction, SubmitTransaction, Transaction, TransactionCommand, TransactionEvent, ValidateTransaction,
};

use crate::config::CommissionBeneficiary;
use crate::error::WorkflowError;
use crate::queue::{QueueView, transition};
use crate::store::{EntityStore, Guard, ListFilter, UnitOfWork};
use crate::workflow::{Engine, log_refusal, submitting_agency};

/// What an agent fills in; fee and commission are computed server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub op_type_id: OperationTypeId,
    #[serde(default)]
    pub payload: Payload,
    pub montant_principal: Money,
    #[serde(default)]
    pub proof_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub proof_url: Option<String>,
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    #[tracing::instrument(skip(self, input), fields(op_type = %input.op_type_id))]
    pub fn submit_transaction(&self, actor_id: UserId, input: NewTransaction) -> Result<Transaction, WorkflowError> {
        self.try_submit_transaction(actor_id, input)
            .inspect_err(|err| log_refusal("submit_transaction", err))
    }

    fn try_submit_transaction(&self, actor_id: UserId, input: NewTransaction) -> Result<Transaction, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let grant = self.grant(&actor, Workflow::Transactions, Action::Submit, &Resource::None)?;
        let agency_id = submitting_agency(&actor, "submit transactions")?;

        let op_type = self
            .store()
            .operation_type(&input.op_type_id)?
            .ok_or_else(|| WorkflowError::not_found(format!("operation type {}", input.op_type_id)))?;
        if !self.access.is_enabled(agency_id, &op_type.id)? {
            return Err(WorkflowError::Validation(format!(
                "operation type '{}' is not enabled for this agency",
                op_type.id
            )));
        }

        if let Some(reference) = input.proof_ref.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            if self.proofs().public_url(reference).is_none() {
                return Err(WorkflowError::Validation(format!("unknown proof reference '{reference}'")));
            }
        }

        let available_solde = self.load_profile(actor_id)?.solde;
        let now = Utc::now();
        let command = TransactionCommand::Submit(SubmitTransaction {
            grant,
            agency_id: Some(agency_id),
            op_type,
            payload: input.payload,
            montant_principal: input.montant_principal,
            frais: self.fees.fee_for(Some(agency_id)),
            proof_ref: input.proof_ref,
            available_solde,
            occurred_at: now,
        });
        let (created, events) = Transaction::empty(TransactionId::new()).execute(&command)?;

        let mut uow = UnitOfWork::new();
        uow.put_transaction(created.clone(), Guard::Absent);
        self.commit(uow, transition(&actor, "submit", None, &created, &events, now))?;
        Ok(created)
    }

    pub fn transaction(&self, actor_id: UserId, id: TransactionId) -> Result<Transaction, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let tx: Transaction = self.load_item(id)?;
        self.grant(&actor, Workflow::Transactions, Action::Read, &tx.resource())?;
        Ok(tx)
    }

    /// The transaction plus a resolvable link to its proof, for validators.
    pub fn transaction_detail(&self, actor_id: UserId, id: TransactionId) -> Result<TransactionDetail, WorkflowError> {
        let transaction = self.transaction(actor_id, id)?;
        let proof_url = transaction.proof_ref().and_then(|r| self.proofs().public_url(r));
        Ok(TransactionDetail { transaction, proof_url })
    }

    /// Every transaction the actor may read, oldest first.
    pub fn transaction_history(&self, actor_id: UserId) -> Result<Vec<Transaction>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let filter = match actor {
            Actor::Agent { id, .. } => ListFilter::default().owned_by(id),
            Actor::ChefAgence {
                agency_id: Some(agency_id),
                ..
            } => ListFilter::default().in_agency(agency_id),
            _ => ListFilter::default(),
        };
        Ok(self
            .store()
            .transactions(&filter)?
            .into_iter()
            .filter(|tx| can_perform(&actor, Workflow::Transactions, Action::Read, &tx.resource()))
            .collect())
    }

    pub fn transaction_queue(&self, actor_id: UserId, view: QueueView) -> Result<Vec<Transaction>, WorkflowError> {
        self.queue::<Transaction>(actor_id, view)
    }

    #[tracing::instrument(skip(self))]
    pub fn claim_transaction(&self, actor_id: UserId, id: TransactionId) -> Result<Transaction, WorkflowError> {
        self.claim::<Transaction>(actor_id, id)
    }

    #[tracing::instrument(skip(self))]
    pub fn release_transaction(&self, actor_id: UserId, id: TransactionId) -> Result<Transaction, WorkflowError> {
        self.release::<Transaction>(actor_id, id)
    }

    #[tracing::instrument(skip(self))]
    pub fn reassign_transaction(
        &self,
        actor_id: UserId,
        id: TransactionId,
        assignee: UserId,
    ) -> Result<Transaction, WorkflowError> {
        self.reassign::<Transaction>(actor_id, id, assignee)
    }

    /// Validate, debiting the agent and crediting the commission in the same
    /// commit as the status change.
    #[tracing::instrument(skip(self))]
    pub fn validate_transaction(&self, actor_id: UserId, id: TransactionId) -> Result<Transaction, WorkflowError> {
        self.try_validate_transaction(actor_id, id)
            .inspect_err(|err| log_refusal("validate_transaction", err))
    }

    fn try_validate_transaction(&self, actor_id: UserId, id: TransactionId) -> Result<Transaction, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let tx: Transaction = self.load_item(id)?;
        let grant = self.grant(&actor, Workflow::Transactions, Action::Validate, &tx.resource())?;

        let now = Utc::now();
        let command = TransactionCommand::Validate(ValidateTransaction { grant, occurred_at: now });
        let (validated, events) = tx.execute(&command)?;

        let mut uow = UnitOfWork::new();
        uow.put_transaction(validated.clone(), Guard::Version(ExpectedVersion::Exact(tx.version())));
        for event in &events {
            if let TransactionEvent::Validated(e) = event {
                if e.debit.is_positive() {
                    uow.change_profile(e.agent_id, ProfileChange::Debit(e.debit));
                }
                if e.commission.is_positive() {
                    let beneficiary = self.commission_beneficiary(e.agent_id, validated.agency_id())?;
                    uow.change_profile(beneficiary, ProfileChange::AccrueCommission(e.commission));
                }
            }
        }

        self.commit(uow, transition(&actor, "validate", Some(&tx), &validated, &events, now))?;
        Ok(validated)
    }

    #[tracing::instrument(skip(self, reason))]
    pub fn reject_transaction(
        &self,
        actor_id: UserId,
        id: TransactionId,
        reason: &str,
    ) -> Result<Transaction, WorkflowError> {
        self.try_reject_transaction(actor_id, id, reason)
            .inspect_err(|err| log_refusal("reject_transaction", err))
    }

    fn try_reject_transaction(&self, actor_id: UserId, id: TransactionId, reason: &str) -> Result<Transaction, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let tx: Transaction = self.load_item(id)?;
        let grant = self.grant(&actor, Workflow::Transactions, Action::Reject, &tx.resource())?;

        let now = Utc::now();
        let command = TransactionCommand::Reject(RejectTransaction {
            grant,
            reason: reason.to_owned(),
            occurred_at: now,
        });
        let (rejected, events) = tx.execute(&command)?;

        let mut uow = UnitOfWork::new();
        uow.put_transaction(rejected.clone(), Guard::Version(ExpectedVersion::Exact(tx.version())));
        self.commit(uow, transition(&actor, "reject", Some(&tx), &rejected, &events, now))?;
        Ok(rejected)
    }

    fn commission_beneficiary(&self, agent_id: UserId, agency_id: Option<AgencyId>) -> Result<UserId, WorkflowError> {
        match self.config().commission_beneficiary {
            CommissionBeneficiary::Agent => Ok(agent_id),
            CommissionBeneficiary::Chef => {
                let chef = match agency_id {
                    Some(agency_id) => self.store().agency(agency_id)?.and_then(|a| a.chef_id),
                    None => None,
                };
                Ok(chef.unwrap_or(agent_id))
            }
        }
    }
}
