use anyhow::{anyhow, Result};
use chrono::Utc;
use futures::StreamExt;
use shared::{domain::JobEvent, protocol::PushFrame};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

use crate::config::Settings;

/// One normalized notification from the transport, regardless of which
/// channel produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// A parsed push-channel event. A hint to re-fetch, never state.
    Push(JobEvent),
    /// The fixed-interval backstop timer fired.
    PollTick,
    /// The push channel closed or errored. Polling continues regardless.
    Disconnected,
}

/// Owns one push-channel connection and one poll timer, normalized into a
/// single ordered stream of [`TransportSignal`]s. Dropping the transport
/// aborts both producer tasks.
pub struct Transport {
    signals: mpsc::Receiver<TransportSignal>,
    tasks: Vec<JoinHandle<()>>,
}

impl Transport {
    /// Start the poll timer and connect the push channel. The timer fires
    /// immediately once (the initial fetch) and then every `poll_interval`,
    /// unconditionally: even with push unavailable or silently dropping
    /// messages the dashboard converges within one interval. An unreachable
    /// push channel is surfaced as a single [`TransportSignal::Disconnected`]
    /// and the transport runs poll-only. Only a malformed `base_url` is an
    /// error.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let ws_url = push_url(&settings.base_url)?;
        let (tx, signals) = mpsc::channel(256);

        let push_tx = tx.clone();
        let reader_task = tokio::spawn(async move {
            let mut ws_reader = match connect_async(&ws_url).await {
                Ok((ws_stream, _)) => {
                    info!(%ws_url, "push channel connected");
                    ws_stream.split().1
                }
                Err(err) => {
                    warn!(%err, %ws_url, "push channel unreachable; running on polls alone");
                    let _ = push_tx.send(TransportSignal::Disconnected).await;
                    return;
                }
            };
            while let Some(message) = ws_reader.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<PushFrame>(&text) {
                        Ok(frame) => {
                            let event = frame.observed(Utc::now());
                            if push_tx.send(TransportSignal::Push(event)).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            warn!(%err, raw = %text, "discarding malformed push frame");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%err, "push channel receive failed");
                        break;
                    }
                }
            }
            let _ = push_tx.send(TransportSignal::Disconnected).await;
        });

        let poll_interval = settings.poll_interval;
        let poll_task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(TransportSignal::PollTick).await.is_err() {
                    return;
                }
            }
        });

        Ok(Self {
            signals,
            tasks: vec![reader_task, poll_task],
        })
    }

    /// Build a transport from a synthetic signal source. No tasks, no I/O;
    /// the caller drives the stream.
    pub fn from_signals(signals: mpsc::Receiver<TransportSignal>) -> Self {
        Self {
            signals,
            tasks: Vec::new(),
        }
    }

    /// Next signal in arrival order, or `None` once all producers are gone.
    pub async fn recv(&mut self) -> Option<TransportSignal> {
        self.signals.recv().await
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn push_url(base_url: &str) -> Result<String> {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(anyhow!("base_url must start with http:// or https://"));
    };
    Ok(format!("{}/api/ws", ws_base.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_url_rewrites_scheme() {
        assert_eq!(
            push_url("http://127.0.0.1:8000").unwrap(),
            "ws://127.0.0.1:8000/api/ws"
        );
        assert_eq!(
            push_url("https://scheduler.example/").unwrap(),
            "wss://scheduler.example/api/ws"
        );
        assert!(push_url("ftp://nope").is_err());
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod transport_tests;
