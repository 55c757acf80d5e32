use std::time::Duration;

use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use shared::domain::{JobId, JobStatus};
use tokio::net::TcpListener;

use super::*;

async fn spawn_push_server(handler: fn(WebSocket) -> futures::future::BoxFuture<'static, ()>) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route(
        "/api/ws",
        get(move |ws: WebSocketUpgrade| async move { ws.on_upgrade(handler).into_response() }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn scripted_socket(socket: WebSocket) -> futures::future::BoxFuture<'static, ()> {
    Box::pin(async move {
        let mut socket = socket;
        let frames = [
            r#"{"job_id":"abc123","status":"active"}"#,
            "definitely not json",
            r#"{"job_id":"def456","status":"completed","msg":"done in 1.2s"}"#,
        ];
        for frame in frames {
            if socket.send(WsMessage::Text(frame.to_string())).await.is_err() {
                return;
            }
        }
        let _ = socket.send(WsMessage::Close(None)).await;
    })
}

fn silent_socket(socket: WebSocket) -> futures::future::BoxFuture<'static, ()> {
    Box::pin(async move {
        let mut socket = socket;
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

#[tokio::test]
async fn push_frames_flow_and_malformed_ones_are_skipped() {
    let base_url = spawn_push_server(scripted_socket).await.expect("spawn server");
    let settings = Settings {
        base_url,
        poll_interval: Duration::from_secs(3600),
    };
    let mut transport = Transport::connect(&settings).await.expect("connect");

    let mut pushes = Vec::new();
    loop {
        match tokio::time::timeout(Duration::from_secs(5), transport.recv()).await {
            Ok(Some(TransportSignal::Push(event))) => pushes.push(event),
            Ok(Some(TransportSignal::PollTick)) => {}
            Ok(Some(TransportSignal::Disconnected)) => break,
            other => panic!("push channel stalled: {other:?}"),
        }
    }

    // The malformed frame was dropped with a warning, not forwarded.
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0].job_id, JobId("abc123".into()));
    assert_eq!(pushes[0].status, JobStatus::Active);
    assert!(pushes[0].message.is_none());
    assert_eq!(pushes[1].job_id, JobId("def456".into()));
    assert_eq!(pushes[1].status, JobStatus::Completed);
    assert_eq!(pushes[1].message.as_deref(), Some("done in 1.2s"));
}

#[tokio::test]
async fn refused_push_channel_degrades_to_poll_only() {
    // Bind and immediately drop a listener so the port is known-closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let settings = Settings {
        base_url,
        poll_interval: Duration::from_millis(50),
    };
    let mut transport = Transport::connect(&settings).await.expect("connect");

    let mut ticks = 0;
    let mut disconnects = 0;
    while ticks < 3 || disconnects == 0 {
        match tokio::time::timeout(Duration::from_secs(5), transport.recv()).await {
            Ok(Some(TransportSignal::PollTick)) => ticks += 1,
            Ok(Some(TransportSignal::Disconnected)) => disconnects += 1,
            other => panic!("transport stalled: {other:?}"),
        }
    }
    assert_eq!(disconnects, 1);
}

#[tokio::test]
async fn poll_timer_fires_independently_of_push_traffic() {
    let base_url = spawn_push_server(silent_socket).await.expect("spawn server");
    let settings = Settings {
        base_url,
        poll_interval: Duration::from_millis(50),
    };
    let mut transport = Transport::connect(&settings).await.expect("connect");

    let mut ticks = 0;
    for _ in 0..3 {
        match tokio::time::timeout(Duration::from_secs(5), transport.recv()).await {
            Ok(Some(TransportSignal::PollTick)) => ticks += 1,
            Ok(Some(other)) => panic!("unexpected signal: {other:?}"),
            other => panic!("poll timer stalled: {other:?}"),
        }
    }
    assert_eq!(ticks, 3);
}
