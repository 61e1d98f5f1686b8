use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agencyops_auth::{Action, Grant, Resource, Workflow};
use agencyops_catalog::{OperationType, Payload, validate_payload};
use agencyops_commission::compute_commission;
use agencyops_core::{
    Aggregate, AggregateRoot, AgencyId, DomainError, Money, OperationTypeId, TransactionId, UserId,
};
use agencyops_events::Event;

/// Transaction status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    PendingValidation,
    Assigned,
    Validated,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::PendingValidation => "pending_validation",
            TransactionStatus::Assigned => "assigned",
            TransactionStatus::Validated => "validated",
            TransactionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Validated | TransactionStatus::Rejected)
    }
}

/// Aggregate root: a submitted financial operation.
///
/// Amounts (`frais`, `montant_total`, `commission_generee`) and the balance
/// impact flag are snapshots taken at submission; later catalog edits never
/// reach an existing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    id: TransactionId,
    created_at: DateTime<Utc>,
    agent_id: UserId,
    agency_id: Option<AgencyId>,
    op_type_id: Option<OperationTypeId>,
    payload: Payload,
    montant_principal: Money,
    frais: Money,
    montant_total: Money,
    commission_generee: Money,
    impacts_balance: bool,
    proof_ref: Option<String>,
    status: TransactionStatus,
    assigned_to: Option<UserId>,
    validated_by: Option<UserId>,
    rejection_reason: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Transaction {
    /// Create an empty, not-yet-submitted aggregate instance.
    pub fn empty(id: TransactionId) -> Self {
        Self {
            id,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            agent_id: UserId::nil(),
            agency_id: None,
            op_type_id: None,
            payload: Payload::new(),
            montant_principal: Money::ZERO,
            frais: Money::ZERO,
            montant_total: Money::ZERO,
            commission_generee: Money::ZERO,
            impacts_balance: false,
            proof_ref: None,
            status: TransactionStatus::PendingValidation,
            assigned_to: None,
            validated_by: None,
            rejection_reason: None,
            processed_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn agent_id(&self) -> UserId {
        self.agent_id
    }

    pub fn agency_id(&self) -> Option<AgencyId> {
        self.agency_id
    }

    pub fn op_type_id(&self) -> Option<&OperationTypeId> {
        self.op_type_id.as_ref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn montant_principal(&self) -> Money {
        self.montant_principal
    }

    pub fn frais(&self) -> Money {
        self.frais
    }

    pub fn montant_total(&self) -> Money {
        self.montant_total
    }

    pub fn commission_generee(&self) -> Money {
        self.commission_generee
    }

    pub fn impacts_balance(&self) -> bool {
        self.impacts_balance
    }

    pub fn proof_ref(&self) -> Option<&str> {
        self.proof_ref.as_deref()
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn assigned_to(&self) -> Option<UserId> {
        self.assigned_to
    }

    pub fn validated_by(&self) -> Option<UserId> {
        self.validated_by
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_open(&self) -> bool {
        self.created && !self.status.is_terminal()
    }

    /// The view of this transaction the authorization rules need.
    pub fn resource(&self) -> Resource {
        Resource::Transaction {
            agent_id: self.agent_id,
            agency_id: self.agency_id,
            assigned_to: self.assigned_to,
        }
    }
}

impl AggregateRoot for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitTransaction.
///
/// `available_solde` is the agent balance read at submission time; it backs the
/// primary insufficient-funds check. The debit itself happens at validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTransaction {
    pub grant: Grant,
    pub agency_id: Option<AgencyId>,
    pub op_type: OperationType,
    pub payload: Payload,
    pub montant_principal: Money,
    pub frais: Money,
    pub proof_ref: Option<String>,
    pub available_solde: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClaimTransaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTransaction {
    pub grant: Grant,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseTransaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseTransaction {
    pub grant: Grant,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReassignTransaction.
///
/// The assignee's eligibility (active sous_admin with the validation flag) is
/// checked by the caller, which can see profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ReassignTransaction {
    pub grant: Grant,
    pub assignee: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ValidateTransaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateTransaction {
    pub grant: Grant,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectTransaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectTransaction {
    pub grant: Grant,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionCommand {
    Submit(SubmitTransaction),
    Claim(ClaimTransaction),
    Release(ReleaseTransaction),
    Reassign(ReassignTransaction),
    Validate(ValidateTransaction),
    Reject(RejectTransaction),
}

/// Event: TransactionSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSubmitted {
    pub transaction_id: TransactionId,
    pub agent_id: UserId,
    pub agency_id: Option<AgencyId>,
    pub op_type_id: OperationTypeId,
    pub payload: Payload,
    pub montant_principal: Money,
    pub frais: Money,
    pub montant_total: Money,
    pub commission_generee: Money,
    pub impacts_balance: bool,
    pub proof_ref: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionClaimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionClaimed {
    pub transaction_id: TransactionId,
    pub by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReleased {
    pub transaction_id: TransactionId,
    pub by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionReassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReassigned {
    pub transaction_id: TransactionId,
    pub by: UserId,
    pub to: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionValidated.
///
/// `debit` and `commission` are the balance effects the store must apply in
/// the same write; both are zero when the operation does not impact balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionValidated {
    pub transaction_id: TransactionId,
    pub by: UserId,
    pub agent_id: UserId,
    pub debit: Money,
    pub commission: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRejected {
    pub transaction_id: TransactionId,
    pub by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
    Submitted(TransactionSubmitted),
    Claimed(TransactionClaimed),
    Released(TransactionReleased),
    Reassigned(TransactionReassigned),
    Validated(TransactionValidated),
    Rejected(TransactionRejected),
}

impl Event for TransactionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransactionEvent::Submitted(_) => "transactions.transaction.submitted",
            TransactionEvent::Claimed(_) => "transactions.transaction.claimed",
            TransactionEvent::Released(_) => "transactions.transaction.released",
            TransactionEvent::Reassigned(_) => "transactions.transaction.reassigned",
            TransactionEvent::Validated(_) => "transactions.transaction.validated",
            TransactionEvent::Rejected(_) => "transactions.transaction.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransactionEvent::Submitted(e) => e.occurred_at,
            TransactionEvent::Claimed(e) => e.occurred_at,
            TransactionEvent::Released(e) => e.occurred_at,
            TransactionEvent::Reassigned(e) => e.occurred_at,
            TransactionEvent::Validated(e) => e.occurred_at,
            TransactionEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Transaction {
    type Command = TransactionCommand;
    type Event = TransactionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransactionEvent::Submitted(e) => {
                self.id = e.transaction_id;
                self.created_at = e.occurred_at;
                self.agent_id = e.agent_id;
                self.agency_id = e.agency_id;
                self.op_type_id = Some(e.op_type_id.clone());
                self.payload = e.payload.clone();
                self.montant_principal = e.montant_principal;
                self.frais = e.frais;
                self.montant_total = e.montant_total;
                self.commission_generee = e.commission_generee;
                self.impacts_balance = e.impacts_balance;
                self.proof_ref = e.proof_ref.clone();
                self.status = TransactionStatus::PendingValidation;
                self.created = true;
            }
            TransactionEvent::Claimed(e) => {
                self.status = TransactionStatus::Assigned;
                self.assigned_to = Some(e.by);
            }
            TransactionEvent::Released(_) => {
                self.status = TransactionStatus::PendingValidation;
                self.assigned_to = None;
            }
            TransactionEvent::Reassigned(e) => {
                self.status = TransactionStatus::Assigned;
                self.assigned_to = Some(e.to);
            }
            TransactionEvent::Validated(e) => {
                self.status = TransactionStatus::Validated;
                self.assigned_to = self.assigned_to.or(Some(e.by));
                self.validated_by = Some(e.by);
                self.processed_at = Some(e.occurred_at);
            }
            TransactionEvent::Rejected(e) => {
                self.status = TransactionStatus::Rejected;
                self.assigned_to = self.assigned_to.or(Some(e.by));
                self.validated_by = Some(e.by);
                self.rejection_reason = Some(e.reason.clone());
                self.processed_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransactionCommand::Submit(cmd) => self.handle_submit(cmd),
            TransactionCommand::Claim(cmd) => self.handle_claim(cmd),
            TransactionCommand::Release(cmd) => self.handle_release(cmd),
            TransactionCommand::Reassign(cmd) => self.handle_reassign(cmd),
            TransactionCommand::Validate(cmd) => self.handle_validate(cmd),
            TransactionCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl Transaction {
    fn ensure_grant(grant: &Grant, action: Action) -> Result<(), DomainError> {
        if grant.workflow() != Workflow::Transactions || grant.action() != action {
            return Err(DomainError::invariant(format!(
                "grant for {:?}/{:?} used for transactions/{action:?}",
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

    /// Finalizing requires being the assignee, unless the grant overrides
    /// assignment (admin_general force-finalizes, even unclaimed items).
    fn ensure_may_finalize(&self, grant: &Grant) -> Result<(), DomainError> {
        if grant.overrides_assignment() {
            return Ok(());
        }
        match self.assigned_to {
            Some(holder) if holder == grant.actor_id() => Ok(()),
            Some(_) => Err(DomainError::permission_denied("only the assignee may finalize this transaction")),
            None => Err(DomainError::permission_denied("transaction must be claimed before it is finalized")),
        }
    }

    fn handle_submit(&self, cmd: &SubmitTransaction) -> Result<Vec<TransactionEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Submit)?;
        if self.created {
            return Err(DomainError::conflict("transaction already exists"));
        }

        let op = &cmd.op_type;
        if !op.is_active() {
            return Err(DomainError::validation(format!("operation type '{}' is not active", op.id)));
        }
        if cmd.montant_principal.is_negative() {
            return Err(DomainError::validation("montant_principal must not be negative"));
        }
        if op.impacts_balance && !cmd.montant_principal.is_positive() {
            return Err(DomainError::validation("montant_principal must be positive"));
        }
        if cmd.frais.is_negative() {
            return Err(DomainError::validation("frais must not be negative"));
        }

        validate_payload(op, &cmd.payload)?;

        let proof_ref = cmd
            .proof_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned);
        if op.proof_required && proof_ref.is_none() {
            return Err(DomainError::validation(format!("operation type '{}' requires a proof", op.id)));
        }

        let commission_generee = compute_commission(cmd.montant_principal, &op.commission_config)?;
        let montant_total = cmd.montant_principal.checked_add(cmd.frais)?;

        if op.impacts_balance && cmd.available_solde < montant_total {
            return Err(DomainError::InsufficientFunds {
                available: cmd.available_solde,
                required: montant_total,
            });
        }

        Ok(vec![TransactionEvent::Submitted(TransactionSubmitted {
            transaction_id: self.id,
            agent_id: cmd.grant.actor_id(),
            agency_id: cmd.agency_id,
            op_type_id: op.id.clone(),
            payload: cmd.payload.clone(),
            montant_principal: cmd.montant_principal,
            frais: cmd.frais,
            montant_total,
            commission_generee,
            impacts_balance: op.impacts_balance,
            proof_ref,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_claim(&self, cmd: &ClaimTransaction) -> Result<Vec<TransactionEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Claim)?;
        self.ensure_open()?;
        if let Some(holder) = self.assigned_to {
            return Err(DomainError::AlreadyClaimed { holder });
        }

        Ok(vec![TransactionEvent::Claimed(TransactionClaimed {
            transaction_id: self.id,
            by: cmd.grant.actor_id(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseTransaction) -> Result<Vec<TransactionEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Release)?;
        self.ensure_open()?;
        if self.status != TransactionStatus::Assigned {
            return Err(DomainError::invariant("only an assigned transaction can be released"));
        }
        self.ensure_may_finalize(&cmd.grant)?;

        Ok(vec![TransactionEvent::Released(TransactionReleased {
            transaction_id: self.id,
            by: cmd.grant.actor_id(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reassign(&self, cmd: &ReassignTransaction) -> Result<Vec<TransactionEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Reassign)?;
        self.ensure_open()?;
        if !cmd.grant.overrides_assignment() {
            return Err(DomainError::permission_denied("only admin_general may reassign"));
        }
        if self.assigned_to == Some(cmd.assignee) {
            return Err(DomainError::validation("transaction is already assigned to that user"));
        }

        Ok(vec![TransactionEvent::Reassigned(TransactionReassigned {
            transaction_id: self.id,
            by: cmd.grant.actor_id(),
            to: cmd.assignee,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_validate(&self, cmd: &ValidateTransaction) -> Result<Vec<TransactionEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Validate)?;
        self.ensure_open()?;
        self.ensure_may_finalize(&cmd.grant)?;

        let (debit, commission) = if self.impacts_balance {
            (self.montant_total, self.commission_generee)
        } else {
            (Money::ZERO, Money::ZERO)
        };

        Ok(vec![TransactionEvent::Validated(TransactionValidated {
            transaction_id: self.id,
            by: cmd.grant.actor_id(),
            agent_id: self.agent_id,
            debit,
            commission,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectTransaction) -> Result<Vec<TransactionEvent>, DomainError> {
        Self::ensure_grant(&cmd.grant, Action::Reject)?;
        self.ensure_open()?;
        self.ensure_may_finalize(&cmd.grant)?;

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("rejection_reason must not be empty"));
        }

        Ok(vec![TransactionEvent::Rejected(TransactionRejected {
            transaction_id: self.id,
            by: cmd.grant.actor_id(),
            reason: reason.to_owned(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_auth::{Actor, SubAdminPermissions, authorize};
    use agencyops_catalog::{FieldKind, FormField, OperationTypeStatus};
    use agencyops_commission::{CommissionConfig, CommissionTier, TierCommission};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn transfert_national() -> OperationType {
        OperationType {
            id: OperationTypeId::new("op_transfert_national").unwrap(),
            name: "Transfert National".to_string(),
            description: String::new(),
            impacts_balance: true,
            proof_required: false,
            status: OperationTypeStatus::Active,
            fields: vec![
                FormField::new("nom_beneficiaire", FieldKind::Text, true),
                FormField::new("tel_beneficiaire", FieldKind::Tel, true),
            ],
            commission_config: CommissionConfig::Tiers {
                tiers: vec![
                    CommissionTier::bounded(0, 50_000, TierCommission::Amount(Money::new(250))),
                    CommissionTier::bounded(50_001, 200_000, TierCommission::Percent(dec!(1))),
                    CommissionTier::unbounded(200_001, TierCommission::Percent(dec!(0.8))),
                ],
            },
        }
    }

    fn agent() -> Actor {
        Actor::Agent {
            id: UserId::new(),
            agency_id: Some(AgencyId::new()),
        }
    }

    fn admin() -> Actor {
        Actor::AdminGeneral { id: UserId::new() }
    }

    fn validator() -> Actor {
        Actor::SousAdmin {
            id: UserId::new(),
            permissions: SubAdminPermissions {
                can_validate_transactions: true,
                can_manage_requests: false,
            },
        }
    }

    fn grant(actor: &Actor, action: Action, tx: &Transaction) -> Grant {
        authorize(actor, Workflow::Transactions, action, &tx.resource()).unwrap()
    }

    fn submit_cmd(actor: &Actor, principal: i64, solde: i64) -> TransactionCommand {
        TransactionCommand::Submit(SubmitTransaction {
            grant: authorize(actor, Workflow::Transactions, Action::Submit, &Resource::None).unwrap(),
            agency_id: actor.agency_id(),
            op_type: transfert_national(),
            payload: json!({"nom_beneficiaire": "Fatou Ndiaye", "tel_beneficiaire": "771234567"})
                .as_object()
                .cloned()
                .unwrap(),
            montant_principal: Money::new(principal),
            frais: Money::new(250),
            proof_ref: None,
            available_solde: Money::new(solde),
            occurred_at: now(),
        })
    }

    fn submitted(actor: &Actor) -> Transaction {
        let tx = Transaction::empty(TransactionId::new());
        tx.execute(&submit_cmd(actor, 50_000, 1_000_000)).unwrap().0
    }

    fn claimed_by(actor: &Actor, tx: &Transaction) -> Transaction {
        let cmd = TransactionCommand::Claim(ClaimTransaction {
            grant: grant(actor, Action::Claim, tx),
            occurred_at: now(),
        });
        tx.execute(&cmd).unwrap().0
    }

    fn validate(actor: &Actor, tx: &Transaction) -> Result<(Transaction, Vec<TransactionEvent>), DomainError> {
        validate_with_grant(grant(actor, Action::Validate, tx), tx)
    }

    fn validate_with_grant(g: Grant, tx: &Transaction) -> Result<(Transaction, Vec<TransactionEvent>), DomainError> {
        tx.execute(&TransactionCommand::Validate(ValidateTransaction {
            grant: g,
            occurred_at: now(),
        }))
    }

    fn reject(actor: &Actor, tx: &Transaction, reason: &str) -> Result<(Transaction, Vec<TransactionEvent>), DomainError> {
        tx.execute(&TransactionCommand::Reject(RejectTransaction {
            grant: grant(actor, Action::Reject, tx),
            reason: reason.to_string(),
            occurred_at: now(),
        }))
    }

    #[test]
    fn submit_snapshots_amounts_in_pending_validation() {
        let agent = agent();
        let tx = submitted(&agent);

        assert_eq!(tx.status(), TransactionStatus::PendingValidation);
        assert_eq!(tx.montant_total(), Money::new(50_250));
        assert_eq!(tx.commission_generee(), Money::new(250));
        assert_eq!(tx.agent_id(), agent.id());
        assert_eq!(tx.assigned_to(), None);
        assert_eq!(tx.version(), 1);
    }

    #[test]
    fn submit_refuses_missing_required_field() {
        let agent = agent();
        let TransactionCommand::Submit(mut cmd) = submit_cmd(&agent, 10_000, 100_000) else {
            unreachable!()
        };
        cmd.payload.remove("tel_beneficiaire");
        let err = Transaction::empty(TransactionId::new())
            .handle(&TransactionCommand::Submit(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn submit_requires_proof_when_operation_demands_it() {
        let agent = agent();
        let TransactionCommand::Submit(mut cmd) = submit_cmd(&agent, 10_000, 100_000) else {
            unreachable!()
        };
        cmd.op_type.proof_required = true;
        cmd.proof_ref = Some("   ".into());
        let empty = Transaction::empty(TransactionId::new());
        assert!(matches!(
            empty.handle(&TransactionCommand::Submit(cmd.clone())),
            Err(DomainError::Validation(_))
        ));

        cmd.proof_ref = Some("proofs/abc.jpg".into());
        assert!(empty.handle(&TransactionCommand::Submit(cmd)).is_ok());
    }

    #[test]
    fn submit_refuses_inactive_operation_type() {
        let agent = agent();
        let TransactionCommand::Submit(mut cmd) = submit_cmd(&agent, 10_000, 100_000) else {
            unreachable!()
        };
        cmd.op_type.status = OperationTypeStatus::Inactive;
        let err = Transaction::empty(TransactionId::new())
            .handle(&TransactionCommand::Submit(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn submit_checks_funds_against_total() {
        let agent = agent();
        let err = Transaction::empty(TransactionId::new())
            .handle(&submit_cmd(&agent, 50_000, 50_249))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientFunds {
                available: Money::new(50_249),
                required: Money::new(50_250),
            }
        );
    }

    #[test]
    fn claim_then_validate_emits_balance_effects() {
        let agent = agent();
        let sub = validator();
        let tx = claimed_by(&sub, &submitted(&agent));
        assert_eq!(tx.status(), TransactionStatus::Assigned);
        assert_eq!(tx.assigned_to(), Some(sub.id()));

        let (done, events) = validate(&sub, &tx).unwrap();
        assert_eq!(done.status(), TransactionStatus::Validated);
        assert_eq!(done.validated_by(), Some(sub.id()));
        match &events[0] {
            TransactionEvent::Validated(e) => {
                assert_eq!(e.debit, Money::new(50_250));
                assert_eq!(e.commission, Money::new(250));
                assert_eq!(e.agent_id, agent.id());
            }
            other => panic!("expected Validated, got {other:?}"),
        }
    }

    #[test]
    fn claimed_transaction_cannot_be_claimed_again() {
        let first = validator();
        let second = validator();
        let tx = claimed_by(&first, &submitted(&agent()));

        let err = tx
            .handle(&TransactionCommand::Claim(ClaimTransaction {
                grant: grant(&second, Action::Claim, &tx),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::AlreadyClaimed { holder: first.id() });
    }

    #[test]
    fn admin_may_force_validate_unclaimed_transaction() {
        let admin = admin();
        let tx = submitted(&agent());
        let (done, _) = validate(&admin, &tx).unwrap();
        assert_eq!(done.status(), TransactionStatus::Validated);
        assert_eq!(done.assigned_to(), Some(admin.id()));
    }

    #[test]
    fn finalized_transaction_is_immutable() {
        let sub = validator();
        let tx = claimed_by(&sub, &submitted(&agent()));
        let (done, _) = validate(&sub, &tx).unwrap();

        let err = validate_with_grant(grant(&admin(), Action::Validate, &done), &done).unwrap_err();
        assert_eq!(err, DomainError::AlreadyFinalized("validated".into()));
        assert!(reject(&admin(), &done, "doublon").is_err());
        assert_eq!(done.montant_total(), Money::new(50_250));
    }

    #[test]
    fn reject_requires_reason() {
        let sub = validator();
        let tx = claimed_by(&sub, &submitted(&agent()));

        let err = reject(&sub, &tx, "   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let (done, _) = reject(&sub, &tx, "numéro invalide").unwrap();
        assert_eq!(done.status(), TransactionStatus::Rejected);
        assert_eq!(done.rejection_reason(), Some("numéro invalide"));
    }

    #[test]
    fn release_returns_item_to_queue() {
        let sub = validator();
        let tx = claimed_by(&sub, &submitted(&agent()));
        let (released, _) = tx
            .execute(&TransactionCommand::Release(ReleaseTransaction {
                grant: grant(&sub, Action::Release, &tx),
                occurred_at: now(),
            }))
            .unwrap();
        assert_eq!(released.status(), TransactionStatus::PendingValidation);
        assert_eq!(released.assigned_to(), None);
    }

    #[test]
    fn reassign_of_pending_item_assigns_it() {
        let admin = admin();
        let sub = validator();
        let tx = submitted(&agent());
        let (moved, _) = tx
            .execute(&TransactionCommand::Reassign(ReassignTransaction {
                grant: grant(&admin, Action::Reassign, &tx),
                assignee: sub.id(),
                occurred_at: now(),
            }))
            .unwrap();
        assert_eq!(moved.status(), TransactionStatus::Assigned);
        assert_eq!(moved.assigned_to(), Some(sub.id()));

        // The new assignee may now finalize.
        assert!(validate(&sub, &moved).is_ok());
    }

    #[test]
    fn grant_for_another_action_is_refused() {
        let sub = validator();
        let tx = claimed_by(&sub, &submitted(&agent()));
        let claim_grant = grant(&sub, Action::Claim, &tx);
        let err = validate_with_grant(claim_grant, &tx).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Claim,
        Release,
        Validate,
        Reject,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Claim),
            Just(Step::Release),
            Just(Step::Validate),
            Just(Step::Reject),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: once terminal, no step changes the transaction, and amounts never drift.
        #[test]
        fn terminal_state_absorbs_every_step(steps in prop::collection::vec(step(), 1..20)) {
            let admin = admin();
            let mut tx = submitted(&agent());
            let total = tx.montant_total();
            let commission = tx.commission_generee();
            let mut terminal: Option<Transaction> = None;

            for s in steps {
                let action = match s {
                    Step::Claim => Action::Claim,
                    Step::Release => Action::Release,
                    Step::Validate => Action::Validate,
                    Step::Reject => Action::Reject,
                };
                let g = grant(&admin, action, &tx);
                let cmd = match s {
                    Step::Claim => TransactionCommand::Claim(ClaimTransaction { grant: g, occurred_at: now() }),
                    Step::Release => TransactionCommand::Release(ReleaseTransaction { grant: g, occurred_at: now() }),
                    Step::Validate => TransactionCommand::Validate(ValidateTransaction { grant: g, occurred_at: now() }),
                    Step::Reject => TransactionCommand::Reject(RejectTransaction {
                        grant: g,
                        reason: "motif".into(),
                        occurred_at: now(),
                    }),
                };

                match tx.execute(&cmd) {
                    Ok((next, _)) => {
                        prop_assert!(terminal.is_none());
                        tx = next;
                        if tx.status().is_terminal() {
                            terminal = Some(tx.clone());
                        }
                    }
                    Err(DomainError::AlreadyFinalized(_)) => prop_assert!(terminal.is_some()),
                    Err(_) => prop_assert!(terminal.is_none()),
                }

                if let Some(t) = &terminal {
                    prop_assert_eq!(&tx, t);
                }
                prop_assert_eq!(tx.montant_total(), total);
                prop_assert_eq!(tx.commission_generee(), commission);
            }
        }
    }
}
