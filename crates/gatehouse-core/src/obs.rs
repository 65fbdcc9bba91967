//! Structured observability hooks for the dispatch lifecycle.
//!
//! This module provides:
//! - Call-scoped tracing spans via the `DispatchSpan` RAII guard
//! - Emission functions for key lifecycle events: start, block, completion,
//!   slow-call flagging, audit write failure
//!
//! Events are emitted at `info!` level except slow calls and audit failures,
//! which warn.

use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::AuditOutcome;
use crate::domain::CallSource;
use crate::safety::ActionTier;

/// RAII guard that enters a call-scoped tracing span for one dispatch.
pub struct DispatchSpan {
    _span: tracing::span::EnteredSpan,
}

impl DispatchSpan {
    /// Create and enter a span tagged with the call id.
    pub fn enter(call_id: Uuid) -> Self {
        let span = tracing::info_span!("gatehouse.dispatch", call_id = %call_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a dispatch attempt began.
pub fn emit_dispatch_started(call_id: Uuid, action: &str, source: CallSource) {
    info!(event = "dispatch.started", call_id = %call_id, action = %action, source = %source);
}

/// Emit event: the safety chain refused the call.
pub fn emit_dispatch_blocked(call_id: Uuid, action: &str, tier: ActionTier, reason: &str) {
    info!(
        event = "dispatch.blocked",
        call_id = %call_id,
        action = %action,
        tier = %tier,
        reason = %reason,
    );
}

/// Emit event: a dispatch finished (any outcome).
pub fn emit_dispatch_completed(
    call_id: Uuid,
    action: &str,
    outcome: AuditOutcome,
    duration_ms: u64,
) {
    info!(
        event = "dispatch.completed",
        call_id = %call_id,
        action = %action,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

/// Emit event: a call ran past the slow-call threshold (warning level).
pub fn emit_slow_call(call_id: Uuid, action: &str, duration_ms: u64, threshold_ms: u64) {
    warn!(
        event = "dispatch.slow_call",
        call_id = %call_id,
        action = %action,
        duration_ms = duration_ms,
        threshold_ms = threshold_ms,
    );
}

/// Emit event: audit persistence failed (warning level).
pub fn emit_audit_write_failed(call_id: Uuid, error: &dyn std::fmt::Display) {
    warn!(event = "audit.write_failed", call_id = %call_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_span_create() {
        // Just ensure DispatchSpan::enter doesn't panic
        let _span = DispatchSpan::enter(Uuid::new_v4());
    }
}
