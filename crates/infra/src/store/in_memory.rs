use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use agencyops_catalog::OperationType;
use agencyops_core::{
    AgencyId, AggregateRoot, EntityKind, OperationTypeId, RechargeId, RequestId, TransactionId, UserId,
};
use agencyops_directory::{Agency, Profile};
use agencyops_recharges::RechargeRequest;
use agencyops_requests::SupportRequest;
use agencyops_transactions::Transaction;

use super::filter::{ListFilter, Listed};
use super::unit_of_work::{Guard, UnitOfWork, Write};
use super::{EntityStore, StoreError};

#[derive(Debug, Default)]
struct State {
    // Ids are time-ordered, so BTreeMap iteration is creation order.
    transactions: BTreeMap<TransactionId, Transaction>,
    recharges: BTreeMap<RechargeId, RechargeRequest>,
    requests: BTreeMap<RequestId, SupportRequest>,
    operation_types: BTreeMap<OperationTypeId, OperationType>,
    agencies: HashMap<AgencyId, Agency>,
    profiles: HashMap<UserId, Profile>,
}

/// What a guard is checked against.
#[derive(Debug, Clone, Copy)]
struct RowMeta {
    version: u64,
    assignee: Option<UserId>,
}

/// In-memory entity store.
///
/// Intended for tests/dev. One lock covers every table, so a commit (status
/// writes and balance deltas together) is a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    state: RwLock<State>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&state))
    }
}

fn list<K, T: Listed + Clone>(rows: &BTreeMap<K, T>, filter: &ListFilter) -> Vec<T> {
    rows.values().filter(|r| filter.matches(*r)).cloned().collect()
}

fn check_guard(
    kind: EntityKind,
    id: &dyn core::fmt::Display,
    current: Option<RowMeta>,
    guard: Guard,
) -> Result<(), StoreError> {
    match (guard, current) {
        (Guard::Absent, None) => Ok(()),
        (Guard::Absent, Some(_)) => Err(StoreError::AlreadyExists {
            kind,
            id: id.to_string(),
        }),
        (Guard::Version(_) | Guard::Unclaimed { .. }, None) => Err(StoreError::NotFound {
            kind,
            id: id.to_string(),
        }),
        (Guard::Version(expected), Some(row)) => {
            if expected.matches(row.version) {
                Ok(())
            } else {
                Err(StoreError::Conflict {
                    kind,
                    id: id.to_string(),
                    detail: format!("expected {expected:?}, found {}", row.version),
                })
            }
        }
        (Guard::Unclaimed { version }, Some(row)) => {
            if let Some(holder) = row.assignee {
                return Err(StoreError::AlreadyClaimed { holder });
            }
            if row.version != version {
                return Err(StoreError::Conflict {
                    kind,
                    id: id.to_string(),
                    detail: format!("expected version {version}, found {}", row.version),
                });
            }
            Ok(())
        }
    }
}

fn unversioned() -> RowMeta {
    RowMeta {
        version: 0,
        assignee: None,
    }
}

impl EntityStore for InMemoryEntityStore {
    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        self.read(|s| s.transactions.get(&id).cloned())
    }

    fn transactions(&self, filter: &ListFilter) -> Result<Vec<Transaction>, StoreError> {
        self.read(|s| list(&s.transactions, filter))
    }

    fn recharge(&self, id: RechargeId) -> Result<Option<RechargeRequest>, StoreError> {
        self.read(|s| s.recharges.get(&id).cloned())
    }

    fn recharges(&self, filter: &ListFilter) -> Result<Vec<RechargeRequest>, StoreError> {
        self.read(|s| list(&s.recharges, filter))
    }

    fn support_request(&self, id: RequestId) -> Result<Option<SupportRequest>, StoreError> {
        self.read(|s| s.requests.get(&id).cloned())
    }

    fn support_requests(&self, filter: &ListFilter) -> Result<Vec<SupportRequest>, StoreError> {
        self.read(|s| list(&s.requests, filter))
    }

    fn operation_type(&self, id: &OperationTypeId) -> Result<Option<OperationType>, StoreError> {
        self.read(|s| s.operation_types.get(id).cloned())
    }

    fn operation_types(&self) -> Result<Vec<OperationType>, StoreError> {
        self.read(|s| s.operation_types.values().cloned().collect())
    }

    fn agency(&self, id: AgencyId) -> Result<Option<Agency>, StoreError> {
        self.read(|s| s.agencies.get(&id).cloned())
    }

    fn profile(&self, id: UserId) -> Result<Option<Profile>, StoreError> {
        self.read(|s| s.profiles.get(&id).cloned())
    }

    fn agencies(&self) -> Result<Vec<Agency>, StoreError> {
        self.read(|s| {
            let mut rows: Vec<Agency> = s.agencies.values().cloned().collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            rows
        })
    }

    fn profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.read(|s| {
            let mut rows: Vec<Profile> = s.profiles.values().cloned().collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            rows
        })
    }

    fn commit(&self, uow: UnitOfWork) -> Result<(), StoreError> {
        if uow.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;

        // 1) Check every guard and stage profile effects; nothing is written yet.
        let mut staged_profiles: HashMap<UserId, Profile> = HashMap::new();
        for write in &uow.writes {
            match write {
                Write::Transaction(tx, guard) => check_guard(
                    EntityKind::Transaction,
                    tx.id(),
                    state.transactions.get(tx.id()).map(|row| RowMeta {
                        version: row.version(),
                        assignee: row.assigned_to(),
                    }),
                    *guard,
                )?,
                Write::Recharge(r, guard) => check_guard(
                    EntityKind::RechargeRequest,
                    r.id(),
                    state.recharges.get(r.id()).map(|row| RowMeta {
                        version: row.version(),
                        assignee: None,
                    }),
                    *guard,
                )?,
                Write::SupportRequest(r, guard) => check_guard(
                    EntityKind::SupportRequest,
                    r.id(),
                    state.requests.get(r.id()).map(|row| RowMeta {
                        version: row.version(),
                        assignee: row.assigned_to(),
                    }),
                    *guard,
                )?,
                Write::OperationType(op, guard) => check_guard(
                    EntityKind::OperationType,
                    &op.id,
                    state.operation_types.get(&op.id).map(|_| unversioned()),
                    *guard,
                )?,
                Write::Agency(agency, guard) => check_guard(
                    EntityKind::Agency,
                    &agency.id,
                    state.agencies.get(&agency.id).map(|_| unversioned()),
                    *guard,
                )?,
                Write::Profile(profile, guard) => {
                    let current = staged_profiles
                        .get(&profile.id)
                        .or_else(|| state.profiles.get(&profile.id))
                        .map(|_| unversioned());
                    check_guard(EntityKind::Profile, &profile.id, current, *guard)?;
                    staged_profiles.insert(profile.id, profile.clone());
                }
                Write::ProfileChange(user_id, change) => {
                    let profile = match staged_profiles.entry(*user_id) {
                        Entry::Occupied(e) => e.into_mut(),
                        Entry::Vacant(v) => {
                            let stored = state.profiles.get(user_id).cloned().ok_or_else(|| {
                                StoreError::NotFound {
                                    kind: EntityKind::Profile,
                                    id: user_id.to_string(),
                                }
                            })?;
                            v.insert(stored)
                        }
                    };
                    profile.apply_change(change).map_err(StoreError::Rejected)?;
                }
            }
        }

        // 2) Apply.
        for write in uow.writes {
            match write {
                Write::Transaction(tx, _) => {
                    state.transactions.insert(*tx.id(), tx);
                }
                Write::Recharge(r, _) => {
                    state.recharges.insert(*r.id(), r);
                }
                Write::SupportRequest(r, _) => {
                    state.requests.insert(*r.id(), r);
                }
                Write::OperationType(op, _) => {
                    state.operation_types.insert(op.id.clone(), op);
                }
                Write::Agency(agency, _) => {
                    state.agencies.insert(agency.id, agency);
                }
                Write::Profile(..) | Write::ProfileChange(..) => {}
            }
        }
        state.profiles.extend(staged_profiles);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_auth::Role;
    use agencyops_core::{ExpectedVersion, Money};
    use agencyops_directory::ProfileChange;

    fn agent(solde: i64) -> Profile {
        Profile::new(UserId::new(), "Moussa", Role::Agent, Some(AgencyId::new())).with_solde(Money::new(solde))
    }

    fn seeded(profile: &Profile) -> InMemoryEntityStore {
        let store = InMemoryEntityStore::new();
        let mut uow = UnitOfWork::new();
        uow.put_profile(profile.clone(), Guard::Absent);
        store.commit(uow).unwrap();
        store
    }

    #[test]
    fn failed_change_rolls_back_the_whole_unit() {
        let a = agent(1_000);
        let b = agent(0);
        let store = seeded(&a);
        let mut uow = UnitOfWork::new();
        uow.put_profile(b.clone(), Guard::Absent);
        store.commit(uow).unwrap();

        let mut uow = UnitOfWork::new();
        uow.change_profile(b.id, ProfileChange::Credit(Money::new(500)))
            .change_profile(a.id, ProfileChange::Debit(Money::new(5_000)));

        let err = store.commit(uow).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(store.profile(b.id).unwrap().unwrap().solde, Money::ZERO);
        assert_eq!(store.profile(a.id).unwrap().unwrap().solde, Money::new(1_000));
    }

    #[test]
    fn chained_changes_on_one_profile_see_each_other() {
        let a = agent(1_000);
        let store = seeded(&a);

        let mut uow = UnitOfWork::new();
        uow.change_profile(a.id, ProfileChange::Debit(Money::new(600)))
            .change_profile(a.id, ProfileChange::Debit(Money::new(600)));
        assert!(store.commit(uow).is_err());

        let mut uow = UnitOfWork::new();
        uow.change_profile(a.id, ProfileChange::Debit(Money::new(600)))
            .change_profile(a.id, ProfileChange::AccrueCommission(Money::new(50)));
        store.commit(uow).unwrap();

        let stored = store.profile(a.id).unwrap().unwrap();
        assert_eq!(stored.solde, Money::new(400));
        assert_eq!(stored.commissions_dues, Money::new(50));
    }

    #[test]
    fn rosters_list_by_name() {
        let store = InMemoryEntityStore::new();
        let mut uow = UnitOfWork::new();
        uow.put_agency(Agency::new(AgencyId::new(), "Agence Thiès", None), Guard::Absent)
            .put_agency(Agency::new(AgencyId::new(), "Agence Plateau", None), Guard::Absent)
            .put_profile(Profile::new(UserId::new(), "Ousmane", Role::ChefAgence, None), Guard::Absent)
            .put_profile(agent(0), Guard::Absent);
        store.commit(uow).unwrap();

        let agencies: Vec<String> = store.agencies().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(agencies, ["Agence Plateau", "Agence Thiès"]);
        let names: Vec<String> = store.profiles().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Moussa", "Ousmane"]);
    }

    #[test]
    fn duplicate_insert_is_refused() {
        let a = agent(0);
        let store = seeded(&a);
        let mut uow = UnitOfWork::new();
        uow.put_profile(a.clone(), Guard::Absent);
        assert!(matches!(store.commit(uow), Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn change_on_unknown_profile_is_not_found() {
        let store = InMemoryEntityStore::new();
        let mut uow = UnitOfWork::new();
        uow.change_profile(UserId::new(), ProfileChange::Credit(Money::new(1)));
        assert!(matches!(store.commit(uow), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn unclaimed_guard_reports_holder_before_version() {
        let holder = UserId::new();
        let meta = RowMeta {
            version: 3,
            assignee: Some(holder),
        };
        assert_eq!(
            check_guard(EntityKind::Transaction, &"t", Some(meta), Guard::Unclaimed { version: 2 }),
            Err(StoreError::AlreadyClaimed { holder })
        );

        let free = RowMeta {
            version: 3,
            assignee: None,
        };
        assert!(matches!(
            check_guard(EntityKind::Transaction, &"t", Some(free), Guard::Unclaimed { version: 2 }),
            Err(StoreError::Conflict { .. })
        ));
        assert!(check_guard(EntityKind::Transaction, &"t", Some(free), Guard::Unclaimed { version: 3 }).is_ok());
        assert!(check_guard(EntityKind::Transaction, &"t", Some(free), Guard::Version(ExpectedVersion::Any)).is_ok());
    }
}
