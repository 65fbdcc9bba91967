//! Gatehouse Core Library
//!
//! A tool-execution gateway standing between an LLM-driven automation agent
//! (and other callers: scheduled monitors, human operators, API clients) and
//! irreversible side effects on physical infrastructure. Every invocation
//! passes through one audited pipeline: declarative shape validation,
//! multi-layer input sanitization, tier classification, protected-resource
//! enforcement, and fault-isolated handler execution.

pub mod audit;
pub mod dispatch;
pub mod domain;
pub mod obs;
pub mod safety;
pub mod sanitize;
pub mod schema;
pub mod telemetry;

pub use audit::{
    AuditError, AuditOutcome, AuditRecord, AuditSink, JsonlAuditSink, MemoryAuditSink,
};

pub use dispatch::{
    ActionInfo, ActionRegistry, ActionSpec, CallContext, DispatchOutcome, DispatchResult,
    Dispatcher, DispatcherConfig, FnHandler, OverrideContext, ToolHandler,
};

pub use domain::{CallSource, GatewayError, Result};

pub use safety::{
    ActionTier, CallFlags, ProtectedResource, ProtectedResourceSet, ResourceKind, SafetyDecision,
    SafetyPolicy,
};

pub use sanitize::{
    check_command, check_path, check_url, is_secret_file, sanitize_text, PathCheck, Verdict,
};

pub use schema::{ArgField, ArgKind, ArgSchema};

pub use obs::DispatchSpan;
pub use telemetry::init_tracing;

/// Gatehouse version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
