//! Append-only audit trail written after increments.
//!
//! Sinks run on detached tasks; whatever they return never reaches counter state.

use anyhow::Result;
use async_trait::async_trait;
use storage::Storage;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub message: String,
}

impl AuditRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<()>;
}

pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _record: AuditRecord) -> Result<()> {
        Ok(())
    }
}

/// Writes audit records into the SQLite count log.
#[derive(Clone)]
pub struct StorageAuditSink {
    storage: Storage,
}

impl StorageAuditSink {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl AuditSink for StorageAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<()> {
        let log_id = self.storage.insert_count_log(&record.message).await?;

        let entries = self.storage.list_count_logs().await?;
        debug!(
            log_id = log_id.0,
            entries = entries.len(),
            latest = ?entries.last().map(|entry| entry.message.as_str()),
            "count log appended"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/audit_tests.rs"]
mod tests;
