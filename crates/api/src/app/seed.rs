//! Demo agency, users and catalog for local runs (`AGENCYOPS_SEED_DEMO=true`).

use rust_decimal_macros::dec;

use agencyops_auth::{Role, SubAdminPermissions};
use agencyops_catalog::{FieldKind, FormField, OperationType, OperationTypeStatus};
use agencyops_commission::{CommissionConfig, CommissionTier, TierCommission};
use agencyops_core::{AgencyId, Money, OperationTypeId, UserId};
use agencyops_directory::{Agency, Profile};
use agencyops_infra::WorkflowError;

use crate::app::services::AppEngine;

/// Ids of the seeded users, for minting tokens.
#[derive(Debug, Clone, Copy)]
pub struct DemoUsers {
    pub agency: AgencyId,
    pub admin: UserId,
    pub sous_admin: UserId,
    pub chef: UserId,
    pub agent: UserId,
}

fn catalog() -> Result<Vec<OperationType>, WorkflowError> {
    Ok(vec![
        OperationType {
            id: OperationTypeId::new("op_transfert_nat")?,
            name: "Transfert National".into(),
            description: "Envoi d'argent domestique".into(),
            impacts_balance: true,
            proof_required: false,
            status: OperationTypeStatus::Active,
            fields: vec![
                FormField::new("tel_beneficiaire", FieldKind::Tel, true),
                FormField::new("nom_beneficiaire", FieldKind::Text, true),
                FormField::new("motif_transfert", FieldKind::Text, false),
            ],
            commission_config: CommissionConfig::Tiers {
                tiers: vec![
                    CommissionTier::bounded(0, 50_000, TierCommission::Amount(Money::new(250))),
                    CommissionTier::bounded(50_001, 200_000, TierCommission::Percent(dec!(1))),
                    CommissionTier::unbounded(200_001, TierCommission::Percent(dec!(0.8))),
                ],
            },
        },
        OperationType {
            id: OperationTypeId::new("op_paiement_sde")?,
            name: "Paiement Facture SDE".into(),
            description: "Règlement facture eau SDE".into(),
            impacts_balance: true,
            proof_required: true,
            status: OperationTypeStatus::Active,
            fields: vec![
                FormField::new("ref_client_sde", FieldKind::Text, true),
                FormField::new("num_facture_sde", FieldKind::Text, true),
            ],
            commission_config: CommissionConfig::Fixed { amount: Money::new(100) },
        },
        OperationType {
            id: OperationTypeId::new("op_reabo_canal")?,
            name: "Réabonnement Canal+".into(),
            description: "Réabonnement bouquet Canal+".into(),
            impacts_balance: true,
            proof_required: false,
            status: OperationTypeStatus::Active,
            fields: vec![
                FormField::new("num_decodeur_canal", FieldKind::Text, true),
                FormField::new("formule_canal", FieldKind::Select, true).with_options(["Access", "Evasion", "Tout Canal+"]),
                FormField::new("duree_canal", FieldKind::Number, true),
            ],
            commission_config: CommissionConfig::Percentage { rate: dec!(1.5) },
        },
    ])
}

/// Provision one agency with a chef and an agent, an admin_general, a
/// fully-permissioned sous_admin and the demo catalog.
pub fn seed_demo(engine: &AppEngine) -> Result<DemoUsers, WorkflowError> {
    let agency = AgencyId::new();
    let admin = Profile::new(UserId::new(), "Admin Général", Role::AdminGeneral, None);
    let sous_admin = Profile::new(UserId::new(), "Sous-Admin", Role::SousAdmin, None)
        .with_permissions(SubAdminPermissions::all());
    let chef = Profile::new(UserId::new(), "Chef Plateau", Role::ChefAgence, Some(agency)).with_solde(Money::new(1_000_000));
    let agent = Profile::new(UserId::new(), "Agent Plateau", Role::Agent, Some(agency)).with_solde(Money::new(250_000));

    let users = DemoUsers {
        agency,
        admin: admin.id,
        sous_admin: sous_admin.id,
        chef: chef.id,
        agent: agent.id,
    };

    engine.provision(
        vec![Agency::new(agency, "Agence Plateau", Some(chef.id))],
        vec![admin, sous_admin, chef, agent],
    )?;

    let mut enabled = Vec::new();
    for op_type in catalog()? {
        enabled.push(engine.register_operation_type(users.admin, op_type)?.id);
    }
    engine.set_agency_access(users.admin, agency, enabled)?;

    tracing::info!(
        agency = %users.agency,
        admin = %users.admin,
        sous_admin = %users.sous_admin,
        chef = %users.chef,
        agent = %users.agent,
        "demo data seeded"
    );
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agencyops_infra::EngineConfig;

    use crate::app::build_services;

    #[test]
    fn seeded_agent_sees_the_whole_demo_catalog() {
        let services = build_services(EngineConfig::default());
        let users = seed_demo(services.engine()).unwrap();

        let available = services.engine().available_operation_types(users.agent).unwrap();
        assert_eq!(available.len(), 3);
        assert_eq!(services.engine().whoami(users.chef).unwrap().solde, Money::new(1_000_000));
    }
}
