//! In-memory audit sink for tests and embedded use.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use super::{AuditError, AuditRecord, AuditSink};

/// Collects records in memory.
///
/// `set_failing(true)` makes every subsequent write fail, which is how the
/// dispatcher's absorb-audit-faults behavior gets exercised.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    failing: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Toggle simulated persistence failure.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(AuditError::Unavailable("sink marked failing".to_string()));
        }
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditOutcome;
    use crate::domain::CallSource;
    use crate::safety::ActionTier;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn sample() -> AuditRecord {
        AuditRecord::finalize(
            Utc::now(),
            Uuid::new_v4(),
            CallSource::Api,
            "get_status",
            ActionTier::Auto,
            json!({}),
            AuditOutcome::Ok,
            1,
            None,
        )
    }

    #[tokio::test]
    async fn test_records_accumulate() {
        let sink = MemoryAuditSink::new();
        sink.record(&sample()).await.unwrap();
        sink.record(&sample()).await.unwrap();
        assert_eq!(sink.len().await, 2);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let sink = MemoryAuditSink::new();
        sink.set_failing(true);
        assert!(sink.record(&sample()).await.is_err());
        assert!(sink.is_empty().await);

        sink.set_failing(false);
        assert!(sink.record(&sample()).await.is_ok());
    }
}
