//! Integration tests for the metrics HTTP/WebSocket server

use futures_util::StreamExt;
use keytempo::server::run;
use keytempo::stats::create_shared_stats;
use keytempo::{
    DictionaryFailurePolicy, MetricsBroadcaster, MetricsConfig, MetricsEngine, MetricsSnapshot,
    ServerSettings, SharedEngine, WordList,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

struct TestServer {
    addr: SocketAddr,
    engine: SharedEngine,
    broadcaster: Arc<MetricsBroadcaster>,
    shutdown: oneshot::Sender<()>,
}

async fn start_server() -> TestServer {
    start_server_with(None).await
}

async fn start_server_with(cors_origins: Option<Vec<String>>) -> TestServer {
    let engine = SharedEngine::new(MetricsEngine::new(
        MetricsConfig::default(),
        Box::new(WordList::from_words(["hello", "world"])),
        DictionaryFailurePolicy::CountAsIncorrect,
    ));
    let broadcaster = Arc::new(MetricsBroadcaster::new(
        engine.clone(),
        Duration::from_millis(50),
        16,
        create_shared_stats(),
    ));
    let settings = ServerSettings {
        bind: "127.0.0.1".to_string(),
        port: 0,
        cors_origins,
        ..ServerSettings::default()
    };

    let (addr, shutdown) = run(&settings, broadcaster.clone())
        .await
        .expect("Failed to start server");

    TestServer {
        addr,
        engine,
        broadcaster,
        shutdown,
    }
}

fn type_words(engine: &SharedEngine, words: &[&str]) {
    engine.with(|e| {
        let now = Instant::now();
        for word in words {
            for ch in word.chars() {
                e.on_char(ch, now);
            }
            e.on_boundary(now);
        }
    });
}

fn parse(message: Message) -> MetricsSnapshot {
    match message {
        Message::Text(text) => serde_json::from_str(&text).expect("snapshot JSON"),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = start_server().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/health", server.addr))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().is_some());
    assert_eq!(body["subscribers"], 0);

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = start_server().await;
    type_words(&server.engine, &["hello", "wrold"]);

    let response = reqwest::get(format!("http://{}/metrics", server.addr))
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["mode"], "typing");
    assert_eq!(body["total_words"], 2);
    assert_eq!(body["correct_words"], 1);
    assert_eq!(body["accuracy"], 50.0);
    // A one-shot read leaves the transition flag for the stream
    assert_eq!(body["refresh"], true);
    assert!(server.engine.with(|e| e.peek_snapshot(Instant::now())).refresh);

    let _ = server.shutdown.send(());
}

async fn allowed_origin(addr: SocketAddr, origin: &str) -> Option<String> {
    let response = reqwest::Client::new()
        .get(format!("http://{}/metrics", addr))
        .header("Origin", origin)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    response
        .headers()
        .get("access-control-allow-origin")
        .map(|value| value.to_str().expect("ascii header").to_string())
}

#[tokio::test]
async fn test_any_origin_allowed_by_default() {
    let server = start_server().await;

    let allowed = allowed_origin(server.addr, "http://192.168.1.40:8080").await;
    assert_eq!(allowed.as_deref(), Some("*"));

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn test_configured_origins_restrict_access() {
    let server = start_server_with(Some(vec!["http://display.local".to_string()])).await;

    let allowed = allowed_origin(server.addr, "http://display.local").await;
    assert_eq!(allowed.as_deref(), Some("http://display.local"));
    assert!(allowed_origin(server.addr, "http://elsewhere.example")
        .await
        .is_none());

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn test_websocket_receives_initial_and_periodic_snapshots() {
    let server = start_server().await;
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let broadcast_task = {
        let broadcaster = server.broadcaster.clone();
        tokio::spawn(async move { broadcaster.run(stop_rx).await })
    };

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
        .await
        .expect("Failed to connect");

    let initial = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("initial snapshot in time")
        .expect("stream open")
        .expect("valid frame");
    let initial = parse(initial);
    assert_eq!(initial.total_words, 0);
    assert_eq!(initial.accuracy, 100.0);

    type_words(&server.engine, &["hello"]);

    let mut saw_word = false;
    for _ in 0..20 {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("tick in time")
            .expect("stream open")
            .expect("valid frame");
        if parse(frame).total_words == 1 {
            saw_word = true;
            break;
        }
    }
    assert!(saw_word);

    let _ = stop_tx.send(true);
    broadcast_task.await.expect("broadcaster task");
    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn test_closed_client_is_unsubscribed() {
    let server = start_server().await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
        .await
        .expect("Failed to connect");
    // Initial snapshot proves the subscription exists
    let _ = socket.next().await;
    assert_eq!(server.broadcaster.subscriber_count(), 1);

    socket.close(None).await.expect("close");
    drop(socket);

    let mut remaining = 1;
    for _ in 0..50 {
        remaining = server.broadcaster.subscriber_count();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);

    let _ = server.shutdown.send(());
}
