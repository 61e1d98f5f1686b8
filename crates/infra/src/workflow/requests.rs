use chrono::Utc;
use serde::Deserialize;

use agencyops_auth::{Action, Resource, Workflow, can_perform};
use agencyops_core::{Aggregate, AggregateRoot, ExpectedVersion, RequestId, UserId};
use agencyops_events::{EventBus, TransitionEvent};
use agencyops_requests::{ResolveRequest, SubmitRequest, SupportRequest, SupportRequestCommand};

use crate::error::WorkflowError;
use crate::queue::{QueueView, transition};
use crate::store::{EntityStore, Guard, ListFilter, UnitOfWork};
use crate::workflow::{Engine, log_refusal};

#[derive(Debug, Clone, Deserialize)]
pub struct NewSupportRequest {
    #[serde(rename = "type")]
    pub request_type: String,
    pub sujet: String,
    pub description: String,
    #[serde(default)]
    pub attachment_ref: Option<String>,
}

impl<S, B> Engine<S, B>
where
    S: EntityStore,
    B: EventBus<TransitionEvent>,
{
    #[tracing::instrument(skip(self, input), fields(request_type = %input.request_type))]
    pub fn submit_support_request(
        &self,
        actor_id: UserId,
        input: NewSupportRequest,
    ) -> Result<SupportRequest, WorkflowError> {
        self.try_submit_support_request(actor_id, input)
            .inspect_err(|err| log_refusal("submit_support_request", err))
    }

    fn try_submit_support_request(
        &self,
        actor_id: UserId,
        input: NewSupportRequest,
    ) -> Result<SupportRequest, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let grant = self.grant(&actor, Workflow::SupportRequests, Action::Submit, &Resource::None)?;

        let now = Utc::now();
        let command = SupportRequestCommand::Submit(SubmitRequest {
            grant,
            request_type: input.request_type,
            sujet: input.sujet,
            description: input.description,
            attachment_ref: input.attachment_ref,
            occurred_at: now,
        });
        let (created, events) = SupportRequest::empty(RequestId::new()).execute(&command)?;

        let mut uow = UnitOfWork::new();
        uow.put_support_request(created.clone(), Guard::Absent);
        self.commit(uow, transition(&actor, "submit", None, &created, &events, now))?;
        Ok(created)
    }

    pub fn support_request(&self, actor_id: UserId, id: RequestId) -> Result<SupportRequest, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let request: SupportRequest = self.load_item(id)?;
        self.grant(&actor, Workflow::SupportRequests, Action::Read, &request.resource())?;
        Ok(request)
    }

    /// Requests filed by the actor, oldest first.
    pub fn my_support_requests(&self, actor_id: UserId) -> Result<Vec<SupportRequest>, WorkflowError> {
        let actor = self.actor(actor_id)?;
        Ok(self
            .store()
            .support_requests(&ListFilter::default().owned_by(actor.id()))?
            .into_iter()
            .filter(|r| can_perform(&actor, Workflow::SupportRequests, Action::Read, &r.resource()))
            .collect())
    }

    pub fn support_request_queue(&self, actor_id: UserId, view: QueueView) -> Result<Vec<SupportRequest>, WorkflowError> {
        self.queue::<SupportRequest>(actor_id, view)
    }

    #[tracing::instrument(skip(self))]
    pub fn claim_support_request(&self, actor_id: UserId, id: RequestId) -> Result<SupportRequest, WorkflowError> {
        self.claim::<SupportRequest>(actor_id, id)
    }

    #[tracing::instrument(skip(self))]
    pub fn release_support_request(&self, actor_id: UserId, id: RequestId) -> Result<SupportRequest, WorkflowError> {
        self.release::<SupportRequest>(actor_id, id)
    }

    #[tracing::instrument(skip(self))]
    pub fn reassign_support_request(
        &self,
        actor_id: UserId,
        id: RequestId,
        assignee: UserId,
    ) -> Result<SupportRequest, WorkflowError> {
        self.reassign::<SupportRequest>(actor_id, id, assignee)
    }

    #[tracing::instrument(skip(self, reponse))]
    pub fn resolve_support_request(
        &self,
        actor_id: UserId,
        id: RequestId,
        reponse: &str,
    ) -> Result<SupportRequest, WorkflowError> {
        self.try_resolve_support_request(actor_id, id, reponse)
            .inspect_err(|err| log_refusal("resolve_support_request", err))
    }

    fn try_resolve_support_request(
        &self,
        actor_id: UserId,
        id: RequestId,
        reponse: &str,
    ) -> Result<SupportRequest, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let request: SupportRequest = self.load_item(id)?;
        let grant = self.grant(&actor, Workflow::SupportRequests, Action::Resolve, &request.resource())?;

        let now = Utc::now();
        let (resolved, events) = request.execute(&SupportRequestCommand::Resolve(ResolveRequest {
            grant,
            reponse: reponse.to_owned(),
            occurred_at: now,
        }))?;

        let mut uow = UnitOfWork::new();
        uow.put_support_request(resolved.clone(), Guard::Version(ExpectedVersion::Exact(request.version())));
        self.commit(uow, transition(&actor, "resolve", Some(&request), &resolved, &events, now))?;
        Ok(resolved)
    }
}
