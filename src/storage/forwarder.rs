//! Fan-out of accepted events to the configured adapters.
//!
//! The webhook handlers answer the sender before anything is written, so
//! everything here runs after the HTTP response is gone. A failed write can
//! only be logged and counted; delivery is best-effort, at most once.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::observability::metrics;
use crate::storage::{StorageAdapter, StorageResult};
use crate::webhook::record::NormalizedEvent;

/// One primary destination plus best-effort mirrors.
pub struct Forwarder {
    primary: Arc<dyn StorageAdapter>,
    mirrors: Vec<Arc<dyn StorageAdapter>>,
}

impl Forwarder {
    pub fn new(primary: Arc<dyn StorageAdapter>, mirrors: Vec<Arc<dyn StorageAdapter>>) -> Self {
        Self { primary, mirrors }
    }

    /// Name of the system of record, for logs.
    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Write to the primary, then mirror. A primary failure skips the
    /// mirrors; a mirror failure is logged and swallowed.
    pub async fn forward(&self, event: &NormalizedEvent, raw: &Value) -> StorageResult<()> {
        let start = Instant::now();
        match self.primary.persist(event, raw).await {
            Ok(()) => metrics::record_persist(self.primary.name(), "ok", start),
            Err(error) => {
                metrics::record_persist(self.primary.name(), "error", start);
                return Err(error);
            }
        }

        for mirror in &self.mirrors {
            let start = Instant::now();
            match mirror.persist(event, raw).await {
                Ok(()) => metrics::record_persist(mirror.name(), "ok", start),
                Err(error) => {
                    metrics::record_persist(mirror.name(), "error", start);
                    tracing::warn!(
                        adapter = mirror.name(),
                        event_id = %event.event_id,
                        id = %event.id,
                        error = %error,
                        "Mirror write failed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Spawn the forward on the runtime and return immediately.
    pub fn forward_detached(self: &Arc<Self>, event: NormalizedEvent, raw: Value) {
        let forwarder = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = forwarder.forward(&event, &raw).await {
                tracing::warn!(
                    adapter = forwarder.primary.name(),
                    event_id = %event.event_id,
                    id = %event.id,
                    error = %error,
                    "Event was acknowledged but could not be persisted"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageError, StorageResult};
    use crate::webhook::normalizer::normalize;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StorageAdapter for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn persist(&self, _event: &NormalizedEvent, _raw: &Value) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StorageError::Rejected {
                    backend: "counting",
                    status: 500,
                    body: "injected failure".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn sample() -> (NormalizedEvent, Value) {
        let raw = json!({"eventID": "msg", "number": "55@c.us"});
        let event = normalize(&raw, Uuid::new_v4(), Utc::now());
        (event, raw)
    }

    #[tokio::test]
    async fn forwards_to_primary_and_mirrors() {
        let primary = Counting::new(false);
        let mirror = Counting::new(false);
        let mirrors = vec![mirror.clone() as Arc<dyn StorageAdapter>];
        let forwarder = Forwarder::new(primary.clone(), mirrors);

        let (event, raw) = sample();
        forwarder.forward(&event, &raw).await.unwrap();

        assert_eq!(primary.calls(), 1);
        assert_eq!(mirror.calls(), 1);
    }

    #[tokio::test]
    async fn primary_failure_skips_mirrors() {
        let primary = Counting::new(true);
        let mirror = Counting::new(false);
        let mirrors = vec![mirror.clone() as Arc<dyn StorageAdapter>];
        let forwarder = Forwarder::new(primary.clone(), mirrors);

        let (event, raw) = sample();
        assert!(forwarder.forward(&event, &raw).await.is_err());

        assert_eq!(primary.calls(), 1);
        assert_eq!(mirror.calls(), 0);
    }

    #[tokio::test]
    async fn mirror_failure_is_swallowed() {
        let primary = Counting::new(false);
        let mirror = Counting::new(true);
        let mirrors = vec![mirror.clone() as Arc<dyn StorageAdapter>];
        let forwarder = Forwarder::new(primary.clone(), mirrors);

        let (event, raw) = sample();
        forwarder.forward(&event, &raw).await.unwrap();

        assert_eq!(mirror.calls(), 1);
    }

    #[tokio::test]
    async fn detached_forward_completes_in_background() {
        let primary = Counting::new(false);
        let forwarder = Arc::new(Forwarder::new(primary.clone(), Vec::new()));

        let (event, raw) = sample();
        forwarder.forward_detached(event, raw);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(primary.calls(), 1);
    }
}
