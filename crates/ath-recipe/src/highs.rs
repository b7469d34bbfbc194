//! Persistent highs collection.
//!
//! One document per exchange, `{exchange, high, time?}`. The recipe reads the
//! whole collection once at startup and upserts by exchange afterwards. Writes
//! are issued fire-and-forget by the recipe; implementations report failures
//! through their `Result` and the recipe turns them into `db.ERROR` events.
//!
//! Fire-and-forget writes can land out of order, so an upsert only ever raises
//! a stored high. A record at or below the stored value is a no-op.

use std::path::PathBuf;

use async_trait::async_trait;
use ath_core::error::{AthError, Result};
use ath_core::types::HighRecord;
use tokio::sync::Mutex;
use tracing::debug;

/// Upsert-capable store of per-exchange highs.
#[async_trait]
pub trait HighsCollection: Send + Sync {
    /// Every stored document, in storage order.
    async fn find_all(&self) -> Result<Vec<HighRecord>>;

    /// Insert `record`, or replace the document with the same exchange when
    /// `record.high` is greater than the stored high.
    async fn upsert(&self, record: &HighRecord) -> Result<()>;
}

/// Apply `record` to `records`. Returns whether anything changed.
fn upsert_into(records: &mut Vec<HighRecord>, record: &HighRecord) -> bool {
    match records.iter_mut().find(|r| r.exchange == record.exchange) {
        Some(existing) if existing.high >= record.high => false,
        Some(existing) => {
            *existing = record.clone();
            true
        }
        None => {
            records.push(record.clone());
            true
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryHighs
// ---------------------------------------------------------------------------

/// Collection held in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryHighs {
    records: Mutex<Vec<HighRecord>>,
}

impl MemoryHighs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<HighRecord>) -> Self {
        Self { records: Mutex::new(records) }
    }
}

#[async_trait]
impl HighsCollection for MemoryHighs {
    async fn find_all(&self) -> Result<Vec<HighRecord>> {
        Ok(self.records.lock().await.clone())
    }

    async fn upsert(&self, record: &HighRecord) -> Result<()> {
        upsert_into(&mut *self.records.lock().await, record);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileHighs
// ---------------------------------------------------------------------------

/// Collection stored as a JSON array in a single file.
///
/// A missing file is an empty collection. Each upsert rewrites the file
/// through a sibling temp file and a rename, so a crash mid-write leaves the
/// previous contents intact. Upserts are serialized by an internal lock.
pub struct JsonFileHighs {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileHighs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    async fn read(&self) -> Result<Vec<HighRecord>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw).map_err(|e| {
            AthError::Storage(format!("{} is not a highs collection: {e}", self.path.display()))
        })
    }

    async fn write(&self, records: &[HighRecord]) -> Result<()> {
        let body = serde_json::to_vec_pretty(records)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl HighsCollection for JsonFileHighs {
    async fn find_all(&self) -> Result<Vec<HighRecord>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn upsert(&self, record: &HighRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.read().await?;
        if !upsert_into(&mut records, record) {
            debug!(
                "{}: kept {} high, {} is not above it",
                self.path.display(),
                record.exchange,
                record.high
            );
            return Ok(());
        }
        self.write(&records).await?;
        debug!("{}: upserted {} high={}", self.path.display(), record.exchange, record.high);
        Ok(())
    }
}
