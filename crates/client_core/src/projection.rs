//! Read-only derivations of the snapshot for display. Pure functions: no
//! I/O, no state, no writes back into the engine.

use shared::domain::{Job, JobEvent, JobStatus, QueueStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatCard {
    pub label: &'static str,
    pub value: u64,
}

pub fn stat_cards(stats: &QueueStats) -> Vec<StatCard> {
    vec![
        StatCard {
            label: "High Priority",
            value: stats.immediate_high,
        },
        StatCard {
            label: "Normal Priority",
            value: stats.immediate_normal,
        },
        StatCard {
            label: "Low Priority",
            value: stats.immediate_low,
        },
        StatCard {
            label: "Dead Letter",
            value: stats.dead_letter,
        },
        StatCard {
            label: "Delayed",
            value: stats.delayed,
        },
    ]
}

/// One row of the recent-jobs table. The `can_*` flags are display
/// affordances only; whether an action is actually allowed stays with the
/// server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub id: String,
    pub status_tag: String,
    pub job_type: String,
    pub user_id: String,
    pub priority: &'static str,
    pub created: String,
    pub payload_summary: String,
    pub outcome: String,
    pub can_retry: bool,
    pub can_boost: bool,
    pub can_cancel: bool,
}

pub fn job_rows(jobs: &[Job]) -> Vec<JobRow> {
    jobs.iter().map(job_row).collect()
}

fn job_row(job: &Job) -> JobRow {
    let status_tag = if job.retry_count > 0 {
        format!("{} (x{})", job.status.as_str().to_uppercase(), job.retry_count)
    } else {
        job.status.as_str().to_uppercase()
    };

    let payload_summary = job
        .payload
        .get("subject")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| job.payload.to_string());

    let outcome = match (&job.error, &job.result) {
        (Some(error), _) => error.clone(),
        (None, Some(result)) => result.to_string(),
        (None, None) => "-".to_string(),
    };

    JobRow {
        id: job.id.0.clone(),
        status_tag,
        job_type: job.job_type.clone(),
        user_id: job.user_id.clone(),
        priority: job.priority.label(),
        created: job.created_at.format("%H:%M:%S").to_string(),
        payload_summary,
        outcome,
        can_retry: matches!(job.status, JobStatus::Failed),
        can_boost: matches!(job.status, JobStatus::Queued | JobStatus::Delayed),
        can_cancel: matches!(job.status, JobStatus::Queued | JobStatus::Delayed),
    }
}

/// Newest-first log lines for the scrolling event stream.
pub fn log_lines<'a>(events: impl IntoIterator<Item = &'a JobEvent>) -> Vec<String> {
    events
        .into_iter()
        .map(|event| {
            let mut line = format!(
                "[{}] {} moved to {}",
                event.observed_at.format("%H:%M:%S"),
                event.job_id.short(),
                event.status.as_str().to_uppercase()
            );
            if let Some(message) = &event.message {
                line.push_str(" - ");
                line.push_str(message);
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shared::domain::{JobId, JobPriority};

    use super::*;

    fn job(status: JobStatus, retry_count: u32) -> Job {
        Job {
            id: JobId("6740f1c2a9b3".into()),
            status,
            job_type: "email_notification".into(),
            payload: serde_json::json!({"subject": "Weekly report", "message": "..."}),
            result: None,
            error: None,
            priority: JobPriority::High,
            created_at: Utc.with_ymd_and_hms(2026, 8, 24, 10, 15, 0).unwrap(),
            scheduled_at: None,
            retry_count,
            user_id: "user_42".into(),
        }
    }

    #[test]
    fn stat_cards_cover_all_counters() {
        let cards = stat_cards(&QueueStats {
            immediate_high: 3,
            ..QueueStats::default()
        });
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[0], StatCard { label: "High Priority", value: 3 });
        assert!(cards[1..].iter().all(|card| card.value == 0));
    }

    #[test]
    fn row_prefers_subject_and_marks_retries() {
        let rows = job_rows(&[job(JobStatus::Failed, 2)]);
        let row = &rows[0];
        assert_eq!(row.status_tag, "FAILED (x2)");
        assert_eq!(row.payload_summary, "Weekly report");
        assert_eq!(row.priority, "High");
        assert_eq!(row.outcome, "-");
        assert!(row.can_retry);
        assert!(!row.can_boost);
    }

    #[test]
    fn row_actions_follow_status() {
        let rows = job_rows(&[job(JobStatus::Queued, 0), job(JobStatus::Active, 0)]);
        assert!(rows[0].can_boost && rows[0].can_cancel && !rows[0].can_retry);
        assert!(!rows[1].can_boost && !rows[1].can_cancel && !rows[1].can_retry);
    }

    #[test]
    fn error_wins_the_outcome_column() {
        let mut failed = job(JobStatus::Failed, 1);
        failed.error = Some("smtp timeout".into());
        failed.result = Some(serde_json::json!({"ok": false}));
        let rows = job_rows(&[failed]);
        assert_eq!(rows[0].outcome, "smtp timeout");
    }

    #[test]
    fn log_line_shape() {
        let event = JobEvent {
            job_id: JobId("abc123def456".into()),
            status: JobStatus::Failed,
            message: Some("smtp timeout".into()),
            observed_at: Utc.with_ymd_and_hms(2026, 8, 24, 10, 15, 30).unwrap(),
        };
        let lines = log_lines([&event]);
        assert_eq!(lines[0], "[10:15:30] abc123de moved to FAILED - smtp timeout");
    }
}
