use std::path::Path;
#[cfg(test)]
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::HistoryRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open history store: {0}")]
    Open(String),
    #[error("Failed to insert history record: {0}")]
    Insert(String),
}

/// Seam for the document store. Records are written once and never read back
/// by this service; each insert is keyed by a generated identifier.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, record: &HistoryRecord) -> Result<Uuid, StoreError>;
}

/// SQLite-backed document store. Each record is one row holding the full
/// record as a JSON document, keyed by a generated uuid; the table carries no
/// other schema so the document shape stays flexible.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Open(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id  TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::Open(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn insert(&self, record: &HistoryRecord) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let doc = serde_json::to_string(record).map_err(|e| StoreError::Insert(e.to_string()))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO history (id, doc) VALUES (?1, ?2)",
            params![id.to_string(), doc],
        )
        .map_err(|e| StoreError::Insert(e.to_string()))?;
        Ok(id)
    }
}

/// Simple in-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: Arc<RwLock<Vec<HistoryRecord>>>,
}

#[cfg(test)]
impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.read().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn insert(&self, record: &HistoryRecord) -> Result<Uuid, StoreError> {
        self.records.write().unwrap().push(record.clone());
        Ok(Uuid::new_v4())
    }
}
