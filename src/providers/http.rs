//! Snapshot source reading a JSON table over HTTP.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use url::Url;

use super::traits::{SnapshotError, SnapshotSource};
use crate::models::{EntityAttributes, EntityId, Snapshot};

/// Fetches the snapshot as a JSON array of row objects, one row per train.
///
/// Cell values are flattened to trimmed strings. Rows whose identifier
/// column holds no digit are skipped.
pub struct HttpSnapshotSource {
    client: Arc<ClientWithMiddleware>,
    url: Url,
    id_field: String,
    timeout: Duration,
}

impl HttpSnapshotSource {
    /// Creates a new source.
    pub fn new(
        client: Arc<ClientWithMiddleware>,
        url: Url,
        id_field: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self { client, url, id_field: id_field.into(), timeout }
    }

    fn parse_rows(&self, rows: Vec<serde_json::Map<String, Value>>) -> Snapshot {
        let mut snapshot = Snapshot::default();
        let mut skipped = 0usize;
        for row in rows {
            let fields: HashMap<String, String> =
                row.into_iter().map(|(key, value)| (key, cell_text(&value))).collect();
            match fields.get(&self.id_field).and_then(|raw| EntityId::from_raw(raw)) {
                Some(id) => snapshot.push(id, EntityAttributes::new(fields)),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, id_field = %self.id_field, "Skipped rows without a train number.");
        }
        snapshot
    }
}

fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    // The upstream sheet renders empty formula cells as "undefined".
    if text.to_ascii_lowercase().contains("undefined") {
        text.replace("undefined", "-").replace("Undefined", "-")
    } else {
        text
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Snapshot, SnapshotError> {
        let response = self.client.get(self.url.clone()).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::Status(status.as_u16()));
        }

        let rows: Vec<serde_json::Map<String, Value>> = response
            .json()
            .await
            .map_err(|e| SnapshotError::Decode(e.to_string()))?;
        let snapshot = self.parse_rows(rows);
        tracing::debug!(entities = snapshot.ids.len(), "Fetched snapshot.");
        Ok(snapshot)
    }
}
