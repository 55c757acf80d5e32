use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{JobEvent, JobId, JobPriority, JobStatus};

/// Inbound push-channel frame: `{"job_id": ..., "status": ..., "msg": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushFrame {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(rename = "msg", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PushFrame {
    /// Promote the raw frame to an event record, stamping the local
    /// observation time.
    pub fn observed(self, observed_at: DateTime<Utc>) -> JobEvent {
        JobEvent {
            job_id: self.job_id,
            status: self.status,
            message: self.message,
            observed_at,
        }
    }
}

/// Body for `POST /api/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: JobPriority,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Body returned by the boost/retry/cancel endpoints. Informational only;
/// state visibility always comes from the next pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionAck {
    pub status: String,
}
