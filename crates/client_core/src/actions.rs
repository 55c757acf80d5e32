use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Job, JobId},
    error::ErrorBody,
    protocol::{ActionAck, SubmitJobRequest},
};
use thiserror::Error;
use tracing::info;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service refused the action. The detail text is the server's own
    /// wording; the dispatcher performs no precondition checks of its own.
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },
}

/// Issues mutating requests against the scheduler. Fire-and-confirm: on
/// success it does nothing further — the effect becomes visible through the
/// next push event or poll cycle, never through a local write.
pub struct ActionDispatcher {
    http: Client,
    base_url: String,
}

impl ActionDispatcher {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.base_url.clone(),
        }
    }

    pub async fn submit(&self, request: &SubmitJobRequest) -> Result<Job, ActionError> {
        let response = self
            .http
            .post(format!("{}/api/jobs", self.base_url))
            .json(request)
            .send()
            .await?;
        let job: Job = check(response).await?.json().await?;
        info!(job_id = %job.id, job_type = %job.job_type, "job submitted");
        Ok(job)
    }

    pub async fn boost(&self, id: &JobId) -> Result<ActionAck, ActionError> {
        self.post_action(id, "boost").await
    }

    pub async fn retry(&self, id: &JobId) -> Result<ActionAck, ActionError> {
        self.post_action(id, "retry").await
    }

    pub async fn cancel(&self, id: &JobId) -> Result<ActionAck, ActionError> {
        let response = self
            .http
            .delete(format!("{}/api/jobs/{id}", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn post_action(&self, id: &JobId, action: &str) -> Result<ActionAck, ActionError> {
        let response = self
            .http
            .post(format!("{}/api/jobs/{id}/{action}", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Map non-success responses to [`ActionError::Rejected`], preserving the
/// server's `{"detail": ...}` body verbatim where present.
async fn check(response: Response) -> Result<Response, ActionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&raw)
        .map(|body| body.detail)
        .unwrap_or(raw);
    let detail = if detail.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request rejected")
            .to_string()
    } else {
        detail
    };

    Err(ActionError::Rejected { status, detail })
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod dispatcher_tests;
