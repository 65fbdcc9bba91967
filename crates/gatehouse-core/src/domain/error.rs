//! Gateway error taxonomy.

/// Errors produced by the gateway layer.
///
/// Expected denials (unknown action, sanitization, policy) never surface as
/// `Err` from dispatch — they become blocked outcomes. This taxonomy covers
/// the edges where `Result` is the honest shape: registration, config
/// loading, and sink internals.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("duplicate action registration: {name}")]
    DuplicateAction { name: String },

    #[error("unknown action: {name}")]
    UnknownAction { name: String },

    #[error("schema violation for action '{action}': missing required argument '{field}'")]
    SchemaViolation { action: String, field: String },

    #[error("sanitization rejected argument '{field}': {reason}")]
    SanitizationRejected { field: String, reason: String },

    #[error("policy blocked: {reason}")]
    PolicyBlocked { reason: String },

    #[error("handler fault: {0}")]
    HandlerFault(String),

    #[error("audit write failed: {0}")]
    AuditWrite(String),

    #[error("invalid resource config: {0}")]
    InvalidResourceConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_action_display() {
        let err = GatewayError::DuplicateAction {
            name: "reboot_node".to_string(),
        };
        assert!(err.to_string().contains("duplicate action"));
        assert!(err.to_string().contains("reboot_node"));
    }

    #[test]
    fn test_schema_violation_display() {
        let err = GatewayError::SchemaViolation {
            action: "list_directory".to_string(),
            field: "path".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("list_directory"));
        assert!(msg.contains("path"));
    }

    #[test]
    fn test_sanitization_rejected_display() {
        let err = GatewayError::SanitizationRejected {
            field: "command".to_string(),
            reason: "shell metacharacter ';'".to_string(),
        };
        assert!(err.to_string().contains("command"));
        assert!(err.to_string().contains("metacharacter"));
    }
}
