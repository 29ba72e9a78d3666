use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::types::{BlobHandle, BlobStoreStatus};

/// Durable blob storage for captured artifacts.
///
/// Implementations never delete: this core only appends.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend name (e.g., "local", "http").
    fn name(&self) -> &str;

    /// Configuration summary; `configured == false` means writes cannot succeed.
    fn status(&self) -> BlobStoreStatus;

    /// Store `data` under `key`, tagged with `content_type`.
    async fn write(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<BlobHandle>;

    /// Resolve a durable, publicly retrievable URL for a written blob.
    async fn resolve_url(&self, handle: &BlobHandle) -> Result<String>;
}

/// Document storage for access records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert a new document and return its store-assigned identifier.
    async fn create(&self, collection: &str, fields: Value) -> Result<String>;

    /// Fetch a single document's fields.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Most recently created documents first.
    async fn list_recent(&self, collection: &str, limit: usize) -> Result<Vec<(String, Value)>>;
}
