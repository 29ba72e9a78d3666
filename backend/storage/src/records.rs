use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use doorcam_core::DocumentStore;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// Length of generated document identifiers.
pub const DOCUMENT_ID_LEN: usize = 20;

/// SQLite-backed document store. Documents are JSON bodies grouped by collection.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open or create the store at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!(path = %path, "Document store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.lock()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                created_at TEXT NOT NULL,
                body TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_documents_collection_created
                ON documents(collection, created_at);",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("document store connection lock poisoned"))
    }
}

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()[..DOCUMENT_ID_LEN].to_string()
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, collection: &str, fields: Value) -> Result<String> {
        let id = new_document_id();
        let body = serde_json::to_string(&fields)?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        self.lock()?.execute(
            "INSERT INTO documents (id, collection, created_at, body) VALUES (?1, ?2, ?3, ?4)",
            params![id, collection, created_at, body],
        )?;
        debug!(collection, id = %id, "Document created");
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .lock()?
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|b| serde_json::from_str(&b).context("Stored document is not valid JSON"))
            .transpose()
    }

    async fn list_recent(&self, collection: &str, limit: usize) -> Result<Vec<(String, Value)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, body FROM documents WHERE collection = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![collection, i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, body)| {
                let value = serde_json::from_str(&body)
                    .with_context(|| format!("Document {id} is not valid JSON"))?;
                Ok((id, value))
            })
            .collect()
    }
}
