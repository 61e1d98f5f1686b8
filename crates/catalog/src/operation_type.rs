use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use agencyops_commission::{CommissionConfig, validate_commission_config};
use agencyops_core::{DomainError, DomainResult, Entity, EntityKind, OperationTypeId};

/// Catalog lifecycle of an operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationTypeStatus {
    Active,
    Inactive,
    Archived,
}

/// Input kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Tel,
    Select,
    Date,
}

/// One field of an operation type's submission form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
    /// Obsolete fields are kept for historical payloads but no longer collected.
    #[serde(default)]
    pub obsolete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            required,
            obsolete: false,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// A submittable financial operation (transfer, bill payment, subscription...).
///
/// Transactions reference it by id and snapshot the amounts it produces, so
/// later edits of `commission_config` never alter historical transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationType {
    pub id: OperationTypeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub impacts_balance: bool,
    #[serde(alias = "proof_is_required")]
    pub proof_required: bool,
    pub status: OperationTypeStatus,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub commission_config: CommissionConfig,
}

impl OperationType {
    pub fn is_active(&self) -> bool {
        self.status == OperationTypeStatus::Active
    }

    /// Fields still collected on new submissions.
    pub fn live_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|f| !f.obsolete)
    }

    /// Validate the record before it is persisted by the catalog.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("operation type name must not be empty"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(DomainError::validation("field name must not be empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
            if field.kind == FieldKind::Select && field.options.is_empty() {
                return Err(DomainError::validation(format!(
                    "select field '{}' has no options",
                    field.name
                )));
            }
        }

        validate_commission_config(&self.commission_config)
    }
}

impl Entity for OperationType {
    type Id = OperationTypeId;

    const KIND: EntityKind = EntityKind::OperationType;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_commission::{CommissionTier, TierCommission};
    use agencyops_core::Money;

    fn op(fields: Vec<FormField>, commission_config: CommissionConfig) -> OperationType {
        OperationType {
            id: OperationTypeId::new("op_test").unwrap(),
            name: "Test".to_string(),
            description: String::new(),
            impacts_balance: true,
            proof_required: false,
            status: OperationTypeStatus::Active,
            fields,
            commission_config,
        }
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let op = op(
            vec![
                FormField::new("montant", FieldKind::Number, true),
                FormField::new("montant", FieldKind::Text, false),
            ],
            CommissionConfig::None,
        );
        assert!(matches!(op.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn select_without_options_is_rejected() {
        let op = op(vec![FormField::new("formule", FieldKind::Select, true)], CommissionConfig::None);
        assert!(op.validate().is_err());
    }

    #[test]
    fn broken_commission_schedule_fails_validation() {
        let op = op(
            vec![],
            CommissionConfig::Tiers {
                tiers: vec![CommissionTier::bounded(0, 10, TierCommission::Amount(Money::new(1)))],
            },
        );
        assert!(matches!(op.validate(), Err(DomainError::Config(_))));
    }

    #[test]
    fn deserializes_catalog_record_with_legacy_proof_flag() {
        let json = r#"{
            "id": "op_paiement_sde",
            "name": "Paiement Facture SDE",
            "impacts_balance": true,
            "proof_is_required": true,
            "status": "active",
            "fields": [
                {"name": "ref_client_sde", "label": "Référence Client SDE", "type": "text", "required": true}
            ],
            "commission_config": {"type": "fixed", "amount": 100}
        }"#;
        let op: OperationType = serde_json::from_str(json).unwrap();
        assert!(op.proof_required);
        assert!(op.is_active());
        assert_eq!(op.fields[0].kind, FieldKind::Text);
        assert!(op.validate().is_ok());
    }
}
