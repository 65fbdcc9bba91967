//! Audit records and sinks.
//!
//! Exactly one [`AuditRecord`] is created per dispatch attempt — success,
//! handler fault, or block — and handed to the configured [`AuditSink`].
//! Persistence is best-effort from the dispatcher's point of view: a sink
//! failure is logged and swallowed, never surfaced to the caller.

pub mod jsonl;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::CallSource;
use crate::safety::ActionTier;

pub use jsonl::JsonlAuditSink;
pub use memory::MemoryAuditSink;

/// How a dispatch attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The handler ran and returned a value.
    Ok,
    /// The handler ran and failed (error or panic).
    Error,
    /// The call was refused before the handler ran.
    Blocked,
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error => write!(f, "error"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// Immutable record of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub call_id: Uuid,
    pub source: CallSource,
    pub action: String,
    pub tier: ActionTier,
    /// Snapshot of the arguments after sanitization.
    pub args: Value,
    pub outcome: AuditOutcome,
    pub duration_ms: u64,
    /// Denial reason or fault message, when the outcome carries one.
    pub reason: Option<String>,
    /// SHA-256 over the record content for tamper evidence.
    pub content_digest: String,
}

impl AuditRecord {
    /// Build a finalized record, stamping the content digest.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        timestamp: DateTime<Utc>,
        call_id: Uuid,
        source: CallSource,
        action: impl Into<String>,
        tier: ActionTier,
        args: Value,
        outcome: AuditOutcome,
        duration_ms: u64,
        reason: Option<String>,
    ) -> Self {
        let mut record = Self {
            timestamp,
            call_id,
            source,
            action: action.into(),
            tier,
            args,
            outcome,
            duration_ms,
            reason,
            content_digest: String::new(),
        };
        record.content_digest = record.compute_digest();
        record
    }

    /// SHA-256 of the record content, excluding the digest field itself.
    fn compute_digest(&self) -> String {
        let payload = serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339(),
            "call_id": self.call_id,
            "source": self.source,
            "action": self.action,
            "tier": self.tier,
            "args": self.args,
            "outcome": self.outcome,
            "duration_ms": self.duration_ms,
            "reason": self.reason,
        });
        let bytes = serde_json::to_vec(&payload).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }

    /// Verify the record's integrity.
    pub fn verify_integrity(&self) -> bool {
        self.content_digest == self.compute_digest()
    }
}

/// Errors produced while persisting an audit record.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// A durable structured-event store for audit records.
///
/// Implementations must never panic; the dispatcher bounds every call with a
/// timeout and absorbs failures.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}
