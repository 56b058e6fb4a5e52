//! HTTP server exposing the metrics stream to remote displays.
//!
//! This module provides an HTTP server that:
//! - Answers one-shot metric reads via GET /metrics
//! - Pushes a snapshot every broadcast tick over GET /ws (WebSocket)
//! - Reports liveness via GET /health
//!
//! # Architecture
//!
//! ```text
//! keystrokes ──→ engine ──→ broadcaster ──→ /ws subscribers ──→ displays
//!                   │
//!                   └──→ GET /metrics (peek)
//! ```

use crate::broadcast::MetricsBroadcaster;
use crate::config::ServerSettings;
use crate::core::MetricsSnapshot;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderValue,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Shared server state
pub struct ServerState {
    broadcaster: Arc<MetricsBroadcaster>,
    send_timeout: Duration,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub subscribers: usize,
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscribers: state.broadcaster.subscriber_count(),
    })
}

/// GET /metrics
async fn metrics(State(state): State<Arc<ServerState>>) -> Json<MetricsSnapshot> {
    Json(state.broadcaster.current_snapshot())
}

/// GET /ws
async fn stream(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(move |socket| forward_snapshots(socket, state))
}

/// Forward every snapshot of one subscription to a WebSocket client until
/// either side goes away.
async fn forward_snapshots(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut subscription = state.broadcaster.subscribe();
    let id = subscription.id();

    loop {
        tokio::select! {
            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    tracing::debug!("Subscriber {} removed by broadcaster", id);
                    break;
                };
                let frame = Message::Text(snapshot.to_json());
                match tokio::time::timeout(state.send_timeout, socket.send(frame)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!("Send to subscriber {} failed: {}", id, e);
                        break;
                    }
                    Err(_) => {
                        tracing::warn!("Send to subscriber {} timed out", id);
                        break;
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // Clients have nothing to say; pings are answered by axum
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.broadcaster.unsubscribe(id);
}

/// Build the router for `broadcaster`.
pub fn router(broadcaster: Arc<MetricsBroadcaster>, settings: &ServerSettings) -> Router {
    let state = Arc::new(ServerState {
        broadcaster,
        send_timeout: settings.send_timeout,
    });

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(stream))
        .layer(cors_layer(settings.cors_origins.as_deref()))
        .with_state(state)
}

/// Any origin unless a list is configured.
fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let allow_origin = match origins {
        None => AllowOrigin::any(),
        Some(origins) => AllowOrigin::list(origins.iter().filter_map(|origin| {
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            }
        })),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Run the HTTP server
pub async fn run(
    settings: &ServerSettings,
    broadcaster: Arc<MetricsBroadcaster>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(broadcaster, settings);

    let listener = TcpListener::bind((settings.bind.as_str(), settings.port)).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Metrics stream listening on ws://{}/ws", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
