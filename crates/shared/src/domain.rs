use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned job identifier. Opaque and stable for the job's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Leading fragment used in compact log output.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Delayed => "delayed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority. The service encodes it as 1 (low) / 2 (normal) / 3 (high)
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobPriority {
    Low,
    Normal,
    High,
}

impl JobPriority {
    pub fn label(&self) -> &'static str {
        match self {
            JobPriority::Low => "Low",
            JobPriority::Normal => "Normal",
            JobPriority::High => "High",
        }
    }
}

impl TryFrom<u8> for JobPriority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(JobPriority::Low),
            2 => Ok(JobPriority::Normal),
            3 => Ok(JobPriority::High),
            other => Err(format!("invalid priority {other}: expected 1, 2 or 3")),
        }
    }
}

impl From<JobPriority> for u8 {
    fn from(value: JobPriority) -> Self {
        match value {
            JobPriority::Low => 1,
            JobPriority::Normal => 2,
            JobPriority::High => 3,
        }
    }
}

/// One observed job record. A fresh pull replaces the whole record; only `id`
/// is stable across observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: JobId,
    pub status: JobStatus,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub priority: JobPriority,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retry_count: u32,
    pub user_id: String,
}

/// Aggregate queue depths as returned by `GET /api/stats`. Counters the
/// server omits deserialize as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    #[serde(rename = "queue:immediate:high", default)]
    pub immediate_high: u64,
    #[serde(rename = "queue:immediate:normal", default)]
    pub immediate_normal: u64,
    #[serde(rename = "queue:immediate:low", default)]
    pub immediate_low: u64,
    #[serde(rename = "queue:dead_letter", default)]
    pub dead_letter: u64,
    #[serde(default)]
    pub delayed: u64,
}

/// A state-transition notification as recorded by the dashboard. The wire
/// frame carries no timestamp; `observed_at` is stamped at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub observed_at: DateTime<Utc>,
}
