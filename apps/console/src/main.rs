use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings,
    projection::{job_rows, log_lines, stat_cards},
    ActionDispatcher, Dashboard, DashboardEvent, Settings, Snapshot, Transport,
};
use shared::{
    domain::{JobId, JobPriority},
    protocol::SubmitJobRequest,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "jobdeck", about = "Console dashboard for the job scheduling service")]
struct Args {
    /// Base URL of the scheduler API; overrides jobdeck.toml and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Live dashboard: queue stats, recent jobs, event log.
    Watch,
    /// Submit a new job.
    Submit {
        #[arg(long, default_value = "email_notification")]
        job_type: String,
        #[arg(long, default_value = "user_console")]
        user: String,
        #[arg(long, default_value = "Weekly Analytics Report")]
        subject: String,
        #[arg(long, default_value = "Please find attached the weekly summary.")]
        message: String,
        /// 1 = low, 2 = normal, 3 = high.
        #[arg(long, default_value_t = 2)]
        priority: u8,
        /// Schedule the job this many seconds in the future.
        #[arg(long)]
        delay_secs: Option<i64>,
    },
    /// Move a queued or delayed job to the front of its queue.
    Boost { job_id: String },
    /// Re-enqueue a failed job.
    Retry { job_id: String },
    /// Cancel a queued or delayed job.
    Cancel { job_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.server_url {
        settings.base_url = url.trim_end_matches('/').to_string();
    }

    match args.command {
        Command::Watch => watch(settings).await,
        Command::Submit {
            job_type,
            user,
            subject,
            message,
            priority,
            delay_secs,
        } => {
            let dispatcher = ActionDispatcher::new(&settings);
            let now = Utc::now();
            let request = SubmitJobRequest {
                job_type,
                payload: serde_json::json!({
                    "subject": subject,
                    "message": message,
                    "timestamp": now,
                }),
                priority: JobPriority::try_from(priority).map_err(anyhow::Error::msg)?,
                user_id: user,
                created_at: now,
                scheduled_at: delay_secs.map(|secs| now + ChronoDuration::seconds(secs)),
            };
            let job = dispatcher.submit(&request).await?;
            println!("Submitted job {} ({})", job.id, job.status);
            Ok(())
        }
        Command::Boost { job_id } => {
            let ack = ActionDispatcher::new(&settings)
                .boost(&JobId(job_id))
                .await?;
            println!("{}", ack.status);
            Ok(())
        }
        Command::Retry { job_id } => {
            let ack = ActionDispatcher::new(&settings)
                .retry(&JobId(job_id))
                .await?;
            println!("{}", ack.status);
            Ok(())
        }
        Command::Cancel { job_id } => {
            let ack = ActionDispatcher::new(&settings)
                .cancel(&JobId(job_id))
                .await?;
            println!("{}", ack.status);
            Ok(())
        }
    }
}

async fn watch(settings: Settings) -> Result<()> {
    let dashboard = Dashboard::new(&settings);
    let transport = Transport::connect(&settings).await?;
    let mut updates = dashboard.subscribe();

    let engine = Arc::clone(&dashboard);
    let run_task = tokio::spawn(engine.run(transport));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Ok(DashboardEvent::SnapshotUpdated) => render(&dashboard.snapshot().await),
                Ok(DashboardEvent::TransportDown) => {
                    eprintln!("push channel down; updating from polls only");
                }
                Ok(DashboardEvent::Error(message)) => eprintln!("refresh failed: {message}"),
                Ok(DashboardEvent::EventLogged(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "renderer lagged behind dashboard updates");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    // Dropping the transport inside the aborted task tears down the push
    // connection and poll timer.
    run_task.abort();
    Ok(())
}

fn render(snapshot: &Snapshot) {
    println!("\n=== Queue Stats ===");
    for card in stat_cards(&snapshot.stats) {
        println!("{:<16} {}", card.label, card.value);
    }

    println!("\n=== Recent Jobs ===");
    for row in job_rows(&snapshot.jobs) {
        let mut actions = Vec::new();
        if row.can_retry {
            actions.push("retry");
        }
        if row.can_boost {
            actions.push("boost");
        }
        if row.can_cancel {
            actions.push("cancel");
        }
        println!(
            "{:<14} {:<22} {:<10} {:<7} {:<9} {:<30} {} [{}]",
            row.status_tag,
            row.job_type,
            row.user_id,
            row.priority,
            row.created,
            row.payload_summary,
            row.outcome,
            actions.join(",")
        );
    }
    if snapshot.jobs.is_empty() {
        println!("No jobs found.");
    }

    println!("\n=== Log Stream ===");
    for line in log_lines(&snapshot.event_log) {
        println!("{line}");
    }
}
