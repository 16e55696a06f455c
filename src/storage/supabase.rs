//! Supabase REST adapter (write-only document insert).

use async_trait::async_trait;
use serde_json::Value;

use crate::config::SupabaseConfig;
use crate::storage::{StorageAdapter, StorageError, StorageResult};
use crate::webhook::record::NormalizedEvent;

/// Inserts one JSON document per event through the PostgREST endpoint.
pub struct SupabaseAdapter {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
}

impl SupabaseAdapter {
    pub fn new(config: &SupabaseConfig) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|source| StorageError::Http {
                backend: "supabase",
                source,
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
            service_key: config.service_key.clone(),
        })
    }
}

#[async_trait]
impl StorageAdapter for SupabaseAdapter {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn persist(&self, event: &NormalizedEvent, raw: &Value) -> StorageResult<()> {
        let mut document = serde_json::to_value(event)?;
        document["raw"] = raw.clone();

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(&document)
            .send()
            .await
            .map_err(|source| StorageError::Http {
                backend: "supabase",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                backend: "supabase",
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
