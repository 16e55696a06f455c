//! Shared utilities for integration testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use waspeed_gateway::config::GatewayConfig;
use waspeed_gateway::lifecycle::Shutdown;
use waspeed_gateway::storage::{
    MemoryStore, StorageAdapter, StorageError, StorageHandles, StorageResult,
};
use waspeed_gateway::webhook::record::NormalizedEvent;
use waspeed_gateway::HttpServer;

/// Adapter that reports every persisted event on a channel.
pub struct RecordingAdapter {
    tx: mpsc::UnboundedSender<(NormalizedEvent, Value)>,
}

impl RecordingAdapter {
    #[allow(dead_code)]
    pub fn new() -> (
        Arc<Self>,
        mpsc::UnboundedReceiver<(NormalizedEvent, Value)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl StorageAdapter for RecordingAdapter {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn persist(&self, event: &NormalizedEvent, raw: &Value) -> StorageResult<()> {
        let _ = self.tx.send((event.clone(), raw.clone()));
        Ok(())
    }
}

/// Adapter that rejects every write.
#[allow(dead_code)]
pub struct FailingAdapter;

#[async_trait]
impl StorageAdapter for FailingAdapter {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn persist(&self, _event: &NormalizedEvent, _raw: &Value) -> StorageResult<()> {
        Err(StorageError::Rejected {
            backend: "failing",
            status: 500,
            body: "injected failure".to_string(),
        })
    }
}

/// Handles backed by an in-memory store, plus a direct handle for asserts.
#[allow(dead_code)]
pub fn memory_handles() -> (StorageHandles, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let handles = StorageHandles {
        primary: store.clone(),
        store: Some(store.clone()),
        mirrors: Vec::new(),
    };
    (handles, store)
}

/// Spawn the gateway on an ephemeral port. Returns the base URL and the
/// shutdown handle; trigger it at the end of the test.
pub async fn spawn_gateway(handles: StorageHandles) -> (String, Shutdown) {
    let config = GatewayConfig::default();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(&config, handles);

    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (format!("http://{}", addr), shutdown)
}

/// A representative message payload.
#[allow(dead_code)]
pub fn message_payload(event_id: &str, number: &str, text: &str) -> Value {
    json!({
        "eventID": event_id,
        "name": "Ana Souza",
        "number": number,
        "lastMessage": {"text": text, "type": "chat", "timestamp": 1700000000},
        "unreadMessages": 2,
        "labels": [{"id": "7", "name": "Lead", "hexColor": "#00ff00"}],
        "user": "suporte01",
        "eventDetails": {"origin": "mobile"}
    })
}
