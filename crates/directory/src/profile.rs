use serde::{Deserialize, Serialize};

use agencyops_auth::{Actor, Role, SubAdminPermissions};
use agencyops_core::{AgencyId, DomainError, DomainResult, Entity, EntityKind, Money, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Suspended,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Suspended => "suspended",
        }
    }
}

/// A user of the platform and, for agents and chefs, their balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub agency_id: Option<AgencyId>,
    /// Operating balance (agents and chefs only).
    pub solde: Money,
    /// Commissions earned but not yet moved into `solde`.
    pub commissions_dues: Money,
    pub status: ProfileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
    /// Only meaningful for `sous_admin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<SubAdminPermissions>,
}

/// A targeted mutation of one profile.
///
/// The store applies these against the stored row inside its write lock, so
/// concurrent balance effects on one user serialize instead of overwriting
/// each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileChange {
    Debit(Money),
    Credit(Money),
    AccrueCommission(Money),
    /// Move earned commission into the operating balance.
    ConvertCommission(Money),
    SetStatus {
        status: ProfileStatus,
        reason: Option<String>,
    },
    SetPermissions(SubAdminPermissions),
}

impl Profile {
    pub fn new(id: UserId, name: impl Into<String>, role: Role, agency_id: Option<AgencyId>) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            agency_id,
            solde: Money::ZERO,
            commissions_dues: Money::ZERO,
            status: ProfileStatus::Active,
            suspension_reason: None,
            permissions: (role == Role::SousAdmin).then(SubAdminPermissions::none),
        }
    }

    pub fn with_solde(mut self, solde: Money) -> Self {
        self.solde = solde;
        self
    }

    pub fn with_permissions(mut self, permissions: SubAdminPermissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ProfileStatus::Active
    }

    /// Resolve the actor this profile acts as.
    ///
    /// Suspended users are refused every action.
    pub fn to_actor(&self) -> DomainResult<Actor> {
        if !self.is_active() {
            return Err(DomainError::permission_denied(format!("user {} is suspended", self.id)));
        }

        let id = self.id;
        Ok(match self.role {
            Role::Agent => Actor::Agent {
                id,
                agency_id: self.agency_id,
            },
            Role::ChefAgence => Actor::ChefAgence {
                id,
                agency_id: self.agency_id,
            },
            Role::AdminGeneral => Actor::AdminGeneral { id },
            Role::SousAdmin => Actor::SousAdmin {
                id,
                permissions: self.permissions.unwrap_or_default(),
            },
            Role::Developpeur => Actor::Developpeur { id },
        })
    }

    /// Apply one change, leaving `self` untouched on error.
    pub fn apply_change(&mut self, change: &ProfileChange) -> DomainResult<()> {
        match change {
            ProfileChange::Debit(amount) => {
                self.ensure_balance_holder()?;
                ensure_non_negative(*amount)?;
                if self.solde < *amount {
                    return Err(DomainError::InsufficientFunds {
                        available: self.solde,
                        required: *amount,
                    });
                }
                self.solde = self.solde.checked_sub(*amount)?;
            }
            ProfileChange::Credit(amount) => {
                self.ensure_balance_holder()?;
                ensure_non_negative(*amount)?;
                self.solde = self.solde.checked_add(*amount)?;
            }
            ProfileChange::AccrueCommission(amount) => {
                self.ensure_balance_holder()?;
                ensure_non_negative(*amount)?;
                self.commissions_dues = self.commissions_dues.checked_add(*amount)?;
            }
            ProfileChange::ConvertCommission(amount) => {
                self.ensure_balance_holder()?;
                if !amount.is_positive() {
                    return Err(DomainError::validation("transfer amount must be positive"));
                }
                if self.commissions_dues < *amount {
                    return Err(DomainError::InsufficientFunds {
                        available: self.commissions_dues,
                        required: *amount,
                    });
                }
                let solde = self.solde.checked_add(*amount)?;
                self.commissions_dues = self.commissions_dues.checked_sub(*amount)?;
                self.solde = solde;
            }
            ProfileChange::SetStatus { status, reason } => {
                let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
                match status {
                    ProfileStatus::Suspended => {
                        let Some(reason) = reason else {
                            return Err(DomainError::validation("suspension requires a reason"));
                        };
                        self.suspension_reason = Some(reason.to_owned());
                    }
                    ProfileStatus::Active => self.suspension_reason = None,
                }
                self.status = *status;
            }
            ProfileChange::SetPermissions(permissions) => {
                if self.role != Role::SousAdmin {
                    return Err(DomainError::validation(format!(
                        "permissions only apply to sous_admin (user is {})",
                        self.role
                    )));
                }
                self.permissions = Some(*permissions);
            }
        }
        Ok(())
    }

    fn ensure_balance_holder(&self) -> DomainResult<()> {
        if self.role.holds_balance() {
            Ok(())
        } else {
            Err(DomainError::validation(format!("{} holds no balance", self.role)))
        }
    }
}

fn ensure_non_negative(amount: Money) -> DomainResult<()> {
    if amount.is_negative() {
        return Err(DomainError::validation("amount must not be negative"));
    }
    Ok(())
}

impl Entity for Profile {
    type Id = UserId;

    const KIND: EntityKind = EntityKind::Profile;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
