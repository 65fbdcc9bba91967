//! Append-only JSONL audit sink.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{AuditError, AuditRecord, AuditSink};

/// File-backed audit sink writing one JSON record per line.
///
/// Append-only; records are never rewritten. `read_all` exists for reports
/// and the CLI tail command, not for the dispatch path.
pub struct JsonlAuditSink {
    log_path: PathBuf,
}

impl JsonlAuditSink {
    /// Create a sink at `path`, creating parent directories as needed.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let log_path = path.into();
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        info!(path = %log_path.display(), "audit sink initialized");
        Ok(Self { log_path })
    }

    /// Read every record in the log, skipping unparseable lines.
    pub async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }
        let content = tokio::fs::read_to_string(&self.log_path).await?;
        Ok(content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    /// The path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[async_trait::async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(record)? + "\n";

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;

        Ok(())
    }
}
