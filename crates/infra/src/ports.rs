//! External collaborators consumed by the workflows, with in-memory adapters.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use uuid::Uuid;

use agencyops_core::{AgencyId, Money, OperationTypeId};

use crate::store::StoreError;

/// Proof/attachment storage. Workflows keep only the returned reference.
pub trait ProofStorage: Send + Sync {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, StoreError>;

    fn public_url(&self, reference: &str) -> Option<String>;
}

#[derive(Debug)]
pub struct InMemoryProofStorage {
    base_url: String,
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryProofStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryProofStorage {
    fn default() -> Self {
        Self::new("memory://proofs")
    }
}

impl ProofStorage for InMemoryProofStorage {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String, StoreError> {
        let reference = format!("proofs/{}", Uuid::now_v7());
        let mut objects = self.objects.write().map_err(|_| StoreError::Poisoned)?;
        objects.insert(reference.clone(), (content_type.to_owned(), bytes.to_vec()));
        Ok(reference)
    }

    fn public_url(&self, reference: &str) -> Option<String> {
        let objects = self.objects.read().ok()?;
        objects
            .contains_key(reference)
            .then(|| format!("{}/{reference}", self.base_url.trim_end_matches('/')))
    }
}

/// Platform fee charged on top of the principal.
pub trait FeePolicy: Send + Sync {
    fn fee_for(&self, agency_id: Option<AgencyId>) -> Money;
}

/// One flat fee, optionally overridden per agency.
#[derive(Debug, Clone)]
pub struct FlatFeePolicy {
    default: Money,
    overrides: HashMap<AgencyId, Money>,
}

impl FlatFeePolicy {
    pub fn new(default: Money) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, agency_id: AgencyId, fee: Money) -> Self {
        self.overrides.insert(agency_id, fee);
        self
    }
}

impl FeePolicy for FlatFeePolicy {
    fn fee_for(&self, agency_id: Option<AgencyId>) -> Money {
        agency_id
            .and_then(|a| self.overrides.get(&a).copied())
            .unwrap_or(self.default)
    }
}

/// Which operation types each agency may submit.
///
/// An agency without an entry has nothing enabled.
pub trait AgencyAccessList: Send + Sync {
    fn is_enabled(&self, agency_id: AgencyId, op_type_id: &OperationTypeId) -> Result<bool, StoreError>;

    fn enabled_for(&self, agency_id: AgencyId) -> Result<Vec<OperationTypeId>, StoreError>;

    /// Replace the agency's enabled list.
    fn set(&self, agency_id: AgencyId, op_type_ids: Vec<OperationTypeId>) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryAgencyAccess {
    enabled: RwLock<HashMap<AgencyId, BTreeSet<OperationTypeId>>>,
}

impl InMemoryAgencyAccess {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgencyAccessList for InMemoryAgencyAccess {
    fn is_enabled(&self, agency_id: AgencyId, op_type_id: &OperationTypeId) -> Result<bool, StoreError> {
        let enabled = self.enabled.read().map_err(|_| StoreError::Poisoned)?;
        Ok(enabled.get(&agency_id).is_some_and(|ops| ops.contains(op_type_id)))
    }

    fn enabled_for(&self, agency_id: AgencyId) -> Result<Vec<OperationTypeId>, StoreError> {
        let enabled = self.enabled.read().map_err(|_| StoreError::Poisoned)?;
        Ok(enabled
            .get(&agency_id)
            .map(|ops| ops.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn set(&self, agency_id: AgencyId, op_type_ids: Vec<OperationTypeId>) -> Result<(), StoreError> {
        let mut enabled = self.enabled.write().map_err(|_| StoreError::Poisoned)?;
        enabled.insert(agency_id, op_type_ids.into_iter().collect());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agency_override_wins_over_default_fee() {
        let special = AgencyId::new();
        let fees = FlatFeePolicy::new(Money::new(250)).with_override(special, Money::new(100));
        assert_eq!(fees.fee_for(Some(special)), Money::new(100));
        assert_eq!(fees.fee_for(Some(AgencyId::new())), Money::new(250));
        assert_eq!(fees.fee_for(None), Money::new(250));
    }

    #[test]
    fn access_list_is_replaced_not_merged() {
        let access = InMemoryAgencyAccess::new();
        let agency = AgencyId::new();
        let sde = OperationTypeId::new("op_paiement_sde").unwrap();
        let canal = OperationTypeId::new("op_reabo_canal").unwrap();

        assert!(!access.is_enabled(agency, &sde).unwrap());
        access.set(agency, vec![sde.clone(), canal.clone()]).unwrap();
        assert!(access.is_enabled(agency, &sde).unwrap());

        access.set(agency, vec![canal.clone()]).unwrap();
        assert!(!access.is_enabled(agency, &sde).unwrap());
        assert_eq!(access.enabled_for(agency).unwrap(), vec![canal]);
    }

    #[test]
    fn uploaded_proof_gets_a_public_url() {
        let proofs = InMemoryProofStorage::new("https://cdn.example/");
        let reference = proofs.upload(b"%PDF", "application/pdf").unwrap();
        let url = proofs.public_url(&reference).unwrap();
        assert_eq!(url, format!("https://cdn.example/{reference}"));
        assert_eq!(proofs.public_url("proofs/unknown"), None);
    }
}
