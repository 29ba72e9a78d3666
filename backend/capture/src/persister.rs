//! Access record persistence and read-back.

use std::sync::Arc;
use std::time::Duration;

use doorcam_core::{AccessRecord, AccessRecordFields, AccessStatus, CaptureError, DocumentStore, ACCESS_RECORDS};
use tracing::{error, info, warn};

pub struct RecordPersister {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl RecordPersister {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Write a new access record and return the store-assigned id.
    ///
    /// Both URLs must already point at uploaded artifacts.
    pub async fn persist(
        &self,
        status: AccessStatus,
        video_url: &str,
        thumbnail_url: &str,
    ) -> Result<(String, AccessRecordFields), CaptureError> {
        if video_url.is_empty() || thumbnail_url.is_empty() {
            return Err(CaptureError::Persistence(
                "refusing to persist a record without both artifact URLs".into(),
            ));
        }

        let fields = AccessRecordFields::new(status, thumbnail_url, video_url);
        let body = serde_json::to_value(&fields).map_err(|e| CaptureError::Persistence(e.to_string()))?;

        let id = match tokio::time::timeout(self.timeout, self.store.create(ACCESS_RECORDS, body)).await {
            Ok(Ok(id)) if !id.is_empty() => id,
            Ok(Ok(_)) => return Err(self.failed("store returned an empty id".into())),
            Ok(Err(e)) => return Err(self.failed(format!("{e:#}"))),
            Err(_) => {
                return Err(self.failed(format!("create timed out after {}s", self.timeout.as_secs())))
            }
        };

        info!(id = %id, status = %status, backend = self.store.name(), "Access record persisted");
        Ok((id, fields))
    }

    /// Fetch one record. Documents that no longer parse are reported as errors.
    pub async fn load(&self, id: &str) -> Result<Option<AccessRecord>, CaptureError> {
        let doc = self
            .store
            .get(ACCESS_RECORDS, id)
            .await
            .map_err(|e| CaptureError::Persistence(format!("{e:#}")))?;

        doc.map(|value| {
            serde_json::from_value(value)
                .map(|fields| AccessRecord {
                    id: id.to_string(),
                    fields,
                })
                .map_err(|e| CaptureError::Persistence(format!("record {id} is malformed: {e}")))
        })
        .transpose()
    }

    /// Newest records first. Malformed documents are skipped with a warning.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AccessRecord>, CaptureError> {
        let docs = self
            .store
            .list_recent(ACCESS_RECORDS, limit)
            .await
            .map_err(|e| CaptureError::Persistence(format!("{e:#}")))?;

        Ok(docs
            .into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(fields) => Some(AccessRecord { id, fields }),
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping malformed access record");
                    None
                }
            })
            .collect())
    }

    fn failed(&self, message: String) -> CaptureError {
        error!(error = %message, backend = self.store.name(), "Access record persistence failed");
        CaptureError::Persistence(message)
    }
}
