//! Request bodies that are not already workflow input types.

use serde::Deserialize;

use agencyops_catalog::OperationTypeStatus;
use agencyops_core::{Money, OperationTypeId, UserId};
use agencyops_directory::ProfileStatus;
use agencyops_infra::QueueView;

#[derive(Debug, Default, Deserialize)]
pub struct QueueQuery {
    #[serde(default)]
    pub view: QueueView,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub assignee: UserId,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub reponse: String,
}

#[derive(Debug, Deserialize)]
pub struct DirectRechargeRequest {
    pub agent_id: UserId,
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
pub struct TransferCommissionsRequest {
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: ProfileStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetOperationTypeStatusRequest {
    pub status: OperationTypeStatus,
}

#[derive(Debug, Deserialize)]
pub struct AgencyAccessRequest {
    pub op_type_ids: Vec<OperationTypeId>,
}
