//! Infrastructure layer: entity store, task queue, workflow services and the
//! collaborators they consume.

pub mod config;
pub mod error;
pub mod ports;
pub mod queue;
pub mod store;
pub mod workflow;


pub use config::{CommissionBeneficiary, EngineConfig};
pub use error::WorkflowError;
pub use ports::{
    AgencyAccessList, FeePolicy, FlatFeePolicy, InMemoryAgencyAccess, InMemoryProofStorage, ProofStorage,
};
pub use queue::{QueueView, WorkItem};
pub use store::{Assignee, EntityStore, Guard, InMemoryEntityStore, ListFilter, StoreError, UnitOfWork};
pub use workflow::Engine;
pub use workflow::recharges::{DirectRecharge, NewRecharge};
pub use workflow::requests::NewSupportRequest;
pub use workflow::stats::{
    AgencyStats, AgentDashboard, CatalogDashboard, ChefDashboard, Dashboard, GlobalDashboard, SousAdminDashboard,
    SubAdminStats,
};
pub use workflow::proofs::{MAX_PROOF_BYTES, UploadedProof};
pub use workflow::transactions::{NewTransaction, TransactionDetail};
