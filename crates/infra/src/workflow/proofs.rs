use serde::Serialize;

use agencyops_auth::{Action, Resource, Workflow};
use agencyops_core::UserId;
use agencyops_events::{EventBus, TransitionEvent};

use crate::error::WorkflowError;
use crate::store::EntityStore;
use crate::workflow::{Engine, log_refusal};

/// Largest accepted attachment.
pub const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;

const ACCEPTED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "application/pdf"];

/// A stored attachment, ready to be cited as a transaction's `proof_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedProof {
    pub reference: String,
    pub url: String,
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    /// Store a receipt or screenshot on behalf of a submitting agent.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn upload_proof(&self, actor_id: UserId, bytes: &[u8], content_type: &str) -> Result<UploadedProof, WorkflowError> {
        self.try_upload_proof(actor_id, bytes, content_type)
            .inspect_err(|err| log_refusal("upload_proof", err))
    }

    fn try_upload_proof(&self, actor_id: UserId, bytes: &[u8], content_type: &str) -> Result<UploadedProof, WorkflowError> {
        let actor = self.actor(actor_id)?;
        self.grant(&actor, Workflow::Transactions, Action::Submit, &Resource::None)?;

        if bytes.is_empty() {
            return Err(WorkflowError::Validation("proof file is empty".to_string()));
        }
        if bytes.len() > MAX_PROOF_BYTES {
            return Err(WorkflowError::Validation(format!(
                "proof file exceeds {MAX_PROOF_BYTES} bytes"
            )));
        }
        let content_type = content_type.split(';').next().unwrap_or_default().trim();
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
            return Err(WorkflowError::Validation(format!(
                "unsupported proof content type '{content_type}'"
            )));
        }

        let reference = self.proofs().upload(bytes, content_type)?;
        let url = self
            .proofs()
            .public_url(&reference)
            .ok_or_else(|| WorkflowError::Store(format!("proof {reference} vanished after upload")))?;

        tracing::info!(actor = %actor_id, %reference, "proof uploaded");
        Ok(UploadedProof { reference, url })
    }
}
