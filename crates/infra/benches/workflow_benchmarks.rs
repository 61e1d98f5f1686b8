use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use agencyops_auth::{Role, SubAdminPermissions};
use agencyops_catalog::{FieldKind, FormField, OperationType, OperationTypeStatus};
use agencyops_commission::{CommissionConfig, CommissionTier, TierCommission, compute_commission};
use agencyops_core::{AgencyId, Money, OperationTypeId, UserId};
use agencyops_directory::{Agency, Profile, ProfileChange};
use agencyops_events::{InMemoryEventBus, TransitionEvent};
use agencyops_infra::{EngineConfig, EntityStore, InMemoryEntityStore, NewTransaction, UnitOfWork, workflow::Engine};
use rust_decimal_macros::dec;

type BenchEngine = Engine<Arc<InMemoryEntityStore>, Arc<InMemoryEventBus<TransitionEvent>>>;

struct Setup {
    engine: BenchEngine,
    agent: UserId,
    validator: UserId,
    op: OperationTypeId,
}

fn tiers() -> CommissionConfig {
    CommissionConfig::Tiers {
        tiers: vec![
            CommissionTier::bounded(0, 50_000, TierCommission::Amount(Money::new(250))),
            CommissionTier::bounded(50_001, 200_000, TierCommission::Percent(dec!(1))),
            CommissionTier::unbounded(200_001, TierCommission::Percent(dec!(0.8))),
        ],
    }
}

fn setup() -> Setup {
    let engine = Engine::new(
        Arc::new(InMemoryEntityStore::new()),
        Arc::new(InMemoryEventBus::new()),
        EngineConfig::default(),
    );
    let agency = AgencyId::new();
    let admin = Profile::new(UserId::new(), "admin", Role::AdminGeneral, None);
    let validator = Profile::new(UserId::new(), "validator", Role::SousAdmin, None).with_permissions(SubAdminPermissions::all());
    let agent = Profile::new(UserId::new(), "agent", Role::Agent, Some(agency)).with_solde(Money::new(i64::MAX / 4));
    let (admin_id, validator_id, agent_id) = (admin.id, validator.id, agent.id);
    engine
        .provision(vec![Agency::new(agency, "bench", None)], vec![admin, validator, agent])
        .unwrap();

    let op = engine
        .register_operation_type(
            admin_id,
            OperationType {
                id: OperationTypeId::new("op_transfert_nat").unwrap(),
                name: "Transfert National".into(),
                description: String::new(),
                impacts_balance: true,
                proof_required: false,
                status: OperationTypeStatus::Active,
                fields: vec![FormField::new("nom_beneficiaire", FieldKind::Text, true)],
                commission_config: tiers(),
            },
        )
        .unwrap()
        .id;
    engine.set_agency_access(admin_id, agency, vec![op.clone()]).unwrap();

    Setup {
        engine,
        agent: agent_id,
        validator: validator_id,
        op,
    }
}

fn new_transaction(op: &OperationTypeId, amount: i64) -> NewTransaction {
    let mut payload = serde_json::Map::new();
    payload.insert("nom_beneficiaire".into(), "Aminata".into());
    NewTransaction {
        op_type_id: op.clone(),
        payload,
        montant_principal: Money::new(amount),
        proof_ref: None,
    }
}

fn bench_commission(c: &mut Criterion) {
    let mut group = c.benchmark_group("commission");
    let config = tiers();
    for amount in [10_000i64, 150_000, 5_000_000] {
        group.bench_with_input(BenchmarkId::new("tiers", amount), &amount, |b, &amount| {
            b.iter(|| compute_commission(black_box(Money::new(amount)), &config).unwrap());
        });
    }
    group.finish();
}

fn bench_transaction_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction_lifecycle");

    group.bench_function("submit", |b| {
        let s = setup();
        b.iter(|| {
            s.engine
                .submit_transaction(s.agent, new_transaction(&s.op, black_box(75_000)))
                .unwrap()
        });
    });

    group.bench_function("submit_claim_validate", |b| {
        let s = setup();
        b.iter(|| {
            let tx = s.engine.submit_transaction(s.agent, new_transaction(&s.op, 75_000)).unwrap();
            s.engine.claim_transaction(s.validator, tx.transaction_id()).unwrap();
            s.engine.validate_transaction(s.validator, tx.transaction_id()).unwrap()
        });
    });

    group.finish();
}

fn bench_unit_of_work_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_of_work_commit");

    for changes in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(changes as u64));
        group.bench_with_input(BenchmarkId::new("profile_changes", changes), &changes, |b, &changes| {
            let store = InMemoryEntityStore::new();
            let agent = Profile::new(UserId::new(), "agent", Role::Agent, Some(AgencyId::new()));
            let agent_id = agent.id;
            let mut seed = UnitOfWork::new();
            seed.put_profile(agent, agencyops_infra::Guard::Absent);
            store.commit(seed).unwrap();

            b.iter(|| {
                let mut uow = UnitOfWork::new();
                for _ in 0..changes {
                    uow.change_profile(agent_id, ProfileChange::Credit(Money::new(1)));
                }
                store.commit(black_box(uow)).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_commission,
    bench_transaction_lifecycle,
    bench_unit_of_work_commit
);
criterion_main!(benches);
