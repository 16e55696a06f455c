//! Spreadsheet append adapter.
//!
//! # Responsibilities
//! - Project each event into the operator sheet's 11-column layout
//! - Append rows through the Sheets REST API (`values:append`)
//! - Bootstrap the header row once, when the sheet is still blank
//!
//! Cell formatting (colors, frozen rows) is left to whoever owns the
//! spreadsheet; this adapter only appends values.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::SheetsConfig;
use crate::storage::{StorageAdapter, StorageError, StorageResult};
use crate::webhook::record::{format_local, NormalizedEvent};

/// Column titles, in sheet order.
pub const HEADER: [&str; 11] = [
    "Data/Hora",
    "Tipo de Evento",
    "Nome",
    "Número",
    "Mensagem",
    "Tipo Mensagem",
    "Data Mensagem",
    "Não Lidas",
    "Etiquetas",
    "Usuário",
    "Detalhes",
];

/// One event as a sheet row, matching [`HEADER`] column for column.
pub fn row_values(event: &NormalizedEvent) -> [String; 11] {
    [
        event.data_hora.clone(),
        event.event_id.clone(),
        event.name.clone(),
        event.numero_formatado.clone(),
        event.mensagem_texto.clone(),
        event.mensagem_tipo.clone(),
        event
            .mensagem_timestamp
            .map(format_local)
            .unwrap_or_default(),
        event.unread_messages.to_string(),
        event.etiquetas.clone(),
        event.usuario.clone(),
        event.evento_detalhes.clone(),
    ]
}

/// Best-effort mirror writing rows to one spreadsheet range.
pub struct SheetsAdapter {
    client: reqwest::Client,
    endpoint: String,
    spreadsheet_id: String,
    range: String,
    access_token: String,
}

impl SheetsAdapter {
    pub fn new(config: &SheetsConfig) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|source| StorageError::Http {
                backend: "sheets",
                source,
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.endpoint, self.spreadsheet_id, range, suffix
        )
    }

    /// Sheet name component of the configured range (`Webhooks!A:K` →
    /// `Webhooks`).
    fn sheet_name(&self) -> &str {
        self.range
            .split_once('!')
            .map_or(self.range.as_str(), |(name, _)| name)
    }

    async fn append(&self, rows: Vec<Vec<String>>) -> StorageResult<()> {
        let url = self.values_url(
            &self.range,
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": rows }))
            .send()
            .await
            .map_err(|source| StorageError::Http {
                backend: "sheets",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                backend: "sheets",
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Append the header row when the first row of the sheet is empty.
    pub async fn ensure_header(&self) -> StorageResult<()> {
        let header_range = format!("{}!A1:K1", self.sheet_name());
        let url = self.values_url(&header_range, "");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|source| StorageError::Http {
                backend: "sheets",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                backend: "sheets",
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(|source| StorageError::Http {
            backend: "sheets",
            source,
        })?;
        if body.get("values").is_some() {
            return Ok(());
        }

        tracing::info!(range = %header_range, "Writing spreadsheet header row");
        let header = HEADER.iter().map(|title| title.to_string()).collect();
        self.append(vec![header]).await
    }
}

#[async_trait]
impl StorageAdapter for SheetsAdapter {
    fn name(&self) -> &'static str {
        "sheets"
    }

    async fn persist(&self, event: &NormalizedEvent, _raw: &Value) -> StorageResult<()> {
        self.append(vec![row_values(event).to_vec()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample_event() -> NormalizedEvent {
        let received = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();
        NormalizedEvent {
            id: Uuid::new_v4(),
            event_id: "msg".into(),
            name: "Ana".into(),
            number: "5511999@c.us".into(),
            numero_formatado: "5511999".into(),
            mensagem_texto: "oi".into(),
            mensagem_tipo: "chat".into(),
            mensagem_timestamp: Some(Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()),
            data_hora: "10/03/2024 15:00:00".into(),
            unread_messages: 2,
            etiquetas: "Lead, VIP".into(),
            usuario: "suporte01".into(),
            evento_detalhes: "{}".into(),
            received_at: received,
        }
    }

    #[test]
    fn rows_line_up_with_the_header() {
        let row = row_values(&sample_event());
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[0], "10/03/2024 15:00:00");
        assert_eq!(row[1], "msg");
        assert_eq!(row[3], "5511999");
        // Message timestamps render in São Paulo local time as well.
        assert_eq!(row[6], "14/11/2023 19:13:20");
        assert_eq!(row[7], "2");
        assert_eq!(row[8], "Lead, VIP");
        assert_eq!(row[10], "{}");
    }

    #[test]
    fn absent_message_timestamp_leaves_the_cell_blank() {
        let mut event = sample_event();
        event.mensagem_timestamp = None;
        assert_eq!(row_values(&event)[6], "");
    }
}
