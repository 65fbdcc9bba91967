//! The single dispatch entry point.
//!
//! Every tool invocation — agent, monitor, operator, or API — passes through
//! [`Dispatcher::execute`]. The pipeline is: lookup → shape validation →
//! sanitization → safety chain → fault-bounded handler invocation → audit.
//! Expected denials come back as [`DispatchOutcome::Blocked`], handler
//! failures as [`DispatchOutcome::Error`]; `execute` itself never fails.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::audit::{AuditOutcome, AuditRecord, AuditSink};
use crate::domain::CallSource;
use crate::obs;
use crate::safety::{ActionTier, CallFlags, ProtectedResourceSet, SafetyPolicy};
use crate::sanitize::{self, Verdict};
use crate::schema::{ArgKind, ArgSchema};

use super::handler::CallContext;
use super::override_ctx::OverrideContext;
use super::registry::{ActionInfo, ActionRegistry};

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Calls running longer than this are flagged for operational
    /// visibility, never aborted — cancellation is the handler's concern.
    pub slow_call_threshold: Duration,
    /// Upper bound on a single audit write; best-effort beyond it.
    pub audit_timeout: Duration,
    /// Character cap applied when sanitizing free-text arguments.
    pub max_text_len: usize,
    /// When set, every path argument must resolve inside this root.
    pub allowed_path_root: Option<PathBuf>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            slow_call_threshold: Duration::from_secs(10),
            audit_timeout: Duration::from_secs(2),
            max_text_len: 4096,
            allowed_path_root: None,
        }
    }
}

/// How a dispatch ended, as seen by the caller.
///
/// Three distinct narratives: the tool ran, the gateway refused, or the tool
/// itself failed. Callers never parse error text to tell these apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The handler ran and produced this value.
    Ok(Value),
    /// Refused before the handler ran: tier rule, protected resource,
    /// sanitization, shape violation, or unknown action.
    Blocked { tier: ActionTier, reason: String },
    /// The handler ran and failed.
    Error { message: String },
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// The result of one `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub call_id: Uuid,
    pub outcome: DispatchOutcome,
    /// The resolved tier of the action (most restrictive for unknown names).
    pub tier: ActionTier,
    pub duration_ms: u64,
}

/// The tool-execution gateway.
///
/// Immutable after construction; `execute` takes `&self`, so any number of
/// calls may be in flight concurrently without serialization.
pub struct Dispatcher {
    registry: ActionRegistry,
    policy: SafetyPolicy,
    sink: Arc<dyn AuditSink>,
    config: DispatcherConfig,
    audit_failures: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        registry: ActionRegistry,
        resources: ProtectedResourceSet,
        sink: Arc<dyn AuditSink>,
        config: DispatcherConfig,
    ) -> Self {
        let policy = SafetyPolicy::new(registry.tier_map(), registry.protected_ref_map(), resources);
        Self {
            registry,
            policy,
            sink,
            config,
            audit_failures: AtomicU64::new(0),
        }
    }

    /// `{name, tier}` pairs for every registered action.
    pub fn action_list(&self) -> Vec<ActionInfo> {
        self.registry.action_list()
    }

    /// The safety policy in force.
    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Number of audit writes that failed or timed out since startup.
    pub fn audit_failure_count(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }

    /// Dispatch one tool invocation.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        source: CallSource,
        flags: CallFlags,
    ) -> DispatchResult {
        let started = Instant::now();
        let call_id = Uuid::new_v4();
        obs::emit_dispatch_started(call_id, name, source);

        let Some(spec) = self.registry.get(name) else {
            let outcome = DispatchOutcome::Blocked {
                tier: ActionTier::Blocked,
                reason: format!("unknown action '{name}'"),
            };
            return self
                .finish(call_id, name, ActionTier::Blocked, source, args, outcome, started)
                .await;
        };
        let tier = spec.tier;

        if let Some(field) = spec.schema.missing_field(&args) {
            let outcome = DispatchOutcome::Blocked {
                tier,
                reason: format!("missing required argument '{field}'"),
            };
            return self
                .finish(call_id, name, tier, source, args, outcome, started)
                .await;
        }

        let sanitized = match sanitize_args(&self.config, &spec.schema, &args, flags.override_active)
        {
            Ok(value) => value,
            Err((field, reason)) => {
                let outcome = DispatchOutcome::Blocked {
                    tier,
                    reason: format!("argument '{field}' rejected: {reason}"),
                };
                return self
                    .finish(call_id, name, tier, source, args, outcome, started)
                    .await;
            }
        };

        let decision = self.policy.check(name, &sanitized, &flags);
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "blocked by safety policy".to_string());
            obs::emit_dispatch_blocked(call_id, name, decision.tier, &reason);
            let outcome = DispatchOutcome::Blocked {
                tier: decision.tier,
                reason,
            };
            return self
                .finish(call_id, name, decision.tier, source, sanitized, outcome, started)
                .await;
        }

        // The override signal lives inside this context and nowhere else; it
        // cannot leak into a concurrent call or survive past this dispatch.
        let ctx = CallContext::new(call_id, source, OverrideContext::new(flags.override_active));
        let handler = Arc::clone(&spec.handler);
        let span = tracing::info_span!("gatehouse.handler", call_id = %call_id, action = %name);

        let outcome = match std::panic::AssertUnwindSafe(
            handler.call(&sanitized, &ctx).instrument(span),
        )
        .catch_unwind()
        .await
        {
            Ok(Ok(value)) => DispatchOutcome::Ok(value),
            Ok(Err(message)) => DispatchOutcome::Error { message },
            Err(panic) => DispatchOutcome::Error {
                message: format!("handler panicked: {}", panic_message(panic.as_ref())),
            },
        };

        self.finish(call_id, name, tier, source, sanitized, outcome, started)
            .await
    }

    /// Single exit path: flag slow calls, emit exactly one audit record,
    /// return the structured result.
    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        call_id: Uuid,
        name: &str,
        tier: ActionTier,
        source: CallSource,
        args_snapshot: Value,
        outcome: DispatchOutcome,
        started: Instant,
    ) -> DispatchResult {
        let duration = started.elapsed();
        let duration_ms = duration.as_millis() as u64;
        if duration > self.config.slow_call_threshold {
            obs::emit_slow_call(
                call_id,
                name,
                duration_ms,
                self.config.slow_call_threshold.as_millis() as u64,
            );
        }

        let (audit_outcome, reason) = match &outcome {
            DispatchOutcome::Ok(_) => (AuditOutcome::Ok, None),
            DispatchOutcome::Blocked { reason, .. } => {
                (AuditOutcome::Blocked, Some(reason.clone()))
            }
            DispatchOutcome::Error { message } => (AuditOutcome::Error, Some(message.clone())),
        };
        let record = AuditRecord::finalize(
            Utc::now(),
            call_id,
            source,
            name,
            tier,
            args_snapshot,
            audit_outcome,
            duration_ms,
            reason,
        );
        self.write_audit(call_id, &record).await;
        obs::emit_dispatch_completed(call_id, name, audit_outcome, duration_ms);

        DispatchResult {
            call_id,
            outcome,
            tier,
            duration_ms,
        }
    }

    /// Best-effort, bounded audit write. Failure is logged and counted but
    /// never alters the caller-visible outcome.
    async fn write_audit(&self, call_id: Uuid, record: &AuditRecord) {
        match tokio::time::timeout(self.config.audit_timeout, self.sink.record(record)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.audit_failures.fetch_add(1, Ordering::Relaxed);
                obs::emit_audit_write_failed(call_id, &err);
            }
            Err(_elapsed) => {
                self.audit_failures.fetch_add(1, Ordering::Relaxed);
                obs::emit_audit_write_failed(call_id, &"audit write timed out");
            }
        }
    }
}

/// Sanitize a top-level argument object against the action's schema.
///
/// Declared fields get their kind-specific sanitizer; everything else is
/// treated as free text. The error carries `(field, reason)`.
fn sanitize_args(
    config: &DispatcherConfig,
    schema: &ArgSchema,
    args: &Value,
    override_active: bool,
) -> Result<Value, (String, String)> {
    match args {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                let kind = schema.kind_of(key);
                out.insert(
                    key.clone(),
                    sanitize_value(config, key, kind, value, override_active)?,
                );
            }
            Ok(Value::Object(out))
        }
        other => sanitize_value(config, "args", ArgKind::Text, other, override_active),
    }
}

fn sanitize_value(
    config: &DispatcherConfig,
    field: &str,
    kind: ArgKind,
    value: &Value,
    override_active: bool,
) -> Result<Value, (String, String)> {
    match value {
        Value::String(s) => match kind {
            ArgKind::Text => Ok(Value::String(sanitize::sanitize_text(
                s,
                config.max_text_len,
            ))),
            ArgKind::Command => match sanitize::check_command(s, override_active) {
                Verdict::Safe => Ok(Value::String(s.clone())),
                Verdict::Rejected { reason } => Err((field.to_string(), reason)),
            },
            ArgKind::Path => {
                let check = sanitize::check_path(s, config.allowed_path_root.as_deref());
                match (check.verdict, check.resolved) {
                    (Verdict::Safe, Some(resolved)) => {
                        let resolved = resolved.to_string_lossy().into_owned();
                        if sanitize::is_secret_file(&resolved) {
                            Err((
                                field.to_string(),
                                format!("secret file access denied: {resolved}"),
                            ))
                        } else {
                            Ok(Value::String(resolved))
                        }
                    }
                    (Verdict::Rejected { reason }, _) => Err((field.to_string(), reason)),
                    (Verdict::Safe, None) => {
                        Err((field.to_string(), "path check yielded no resolution".to_string()))
                    }
                }
            }
            ArgKind::Url => match sanitize::check_url(s) {
                Verdict::Safe => Ok(Value::String(s.clone())),
                Verdict::Rejected { reason } => Err((field.to_string(), reason)),
            },
        },
        Value::Array(items) => items
            .iter()
            .map(|item| sanitize_value(config, field, kind, item, override_active))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, nested) in map {
                out.insert(
                    key.clone(),
                    sanitize_value(config, key, ArgKind::Text, nested, override_active)?,
                );
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::dispatch::handler::FnHandler;
    use crate::dispatch::registry::ActionSpec;
    use serde_json::json;

    fn echo_handler() -> Arc<dyn crate::dispatch::ToolHandler> {
        Arc::new(FnHandler::new(|args: Value, _ctx| async move {
            Ok(json!({"echo": args}))
        }))
    }

    fn build_dispatcher(sink: Arc<MemoryAuditSink>) -> Dispatcher {
        let mut registry = ActionRegistry::new();
        registry
            .register(
                ActionSpec::new("get_status", ActionTier::Auto, echo_handler()).with_schema(
                    ArgSchema::empty().with_required("node", ArgKind::Text),
                ),
            )
            .unwrap();
        registry
            .register(
                ActionSpec::new("run_command", ActionTier::Confirm, echo_handler()).with_schema(
                    ArgSchema::empty().with_required("command", ArgKind::Command),
                ),
            )
            .unwrap();
        registry
            .register(ActionSpec::new(
                "failing_tool",
                ActionTier::Auto,
                Arc::new(FnHandler::new(|_args: Value, _ctx| async move {
                    Err("downstream unavailable".to_string())
                })),
            ))
            .unwrap();
        registry
            .register(ActionSpec::new(
                "panicking_tool",
                ActionTier::Auto,
                Arc::new(FnHandler::new(|args: Value, _ctx| async move {
                    assert!(args.get("defuse").is_some(), "handler bug");
                    Ok(json!(null))
                })),
            ))
            .unwrap();
        Dispatcher::new(
            registry,
            ProtectedResourceSet::standard(),
            sink,
            DispatcherConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_happy_path_annotates_tier() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());

        let result = dispatcher
            .execute(
                "get_status",
                json!({"node": "worker7"}),
                CallSource::Llm,
                CallFlags::default(),
            )
            .await;
        assert!(result.outcome.is_ok());
        assert_eq!(result.tier, ActionTier::Auto);
        assert_eq!(sink.len().await, 1);
        let record = &sink.records().await[0];
        assert_eq!(record.outcome, AuditOutcome::Ok);
        assert!(record.verify_integrity());
    }

    #[tokio::test]
    async fn test_unknown_action_blocked_without_handler() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());

        let result = dispatcher
            .execute("no_such", json!({}), CallSource::Api, CallFlags::default())
            .await;
        assert!(result.outcome.is_blocked());
        assert_eq!(result.tier, ActionTier::Blocked);
        assert_eq!(sink.len().await, 1);
        assert_eq!(sink.records().await[0].outcome, AuditOutcome::Blocked);
    }

    #[tokio::test]
    async fn test_missing_required_argument_blocked() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());

        let result = dispatcher
            .execute("get_status", json!({}), CallSource::User, CallFlags::default())
            .await;
        match &result.outcome {
            DispatchOutcome::Blocked { reason, .. } => assert!(reason.contains("node")),
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_command_injection_blocked_before_handler() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());

        let result = dispatcher
            .execute(
                "run_command",
                json!({"command": "df -h; rm -rf /tmp/x"}),
                CallSource::Llm,
                CallFlags {
                    confirmed: true,
                    ..CallFlags::default()
                },
            )
            .await;
        assert!(result.outcome.is_blocked());
        assert_eq!(sink.records().await[0].outcome, AuditOutcome::Blocked);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_structured_result() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());

        let result = dispatcher
            .execute("failing_tool", json!({}), CallSource::Monitor, CallFlags::default())
            .await;
        match &result.outcome {
            DispatchOutcome::Error { message } => assert!(message.contains("downstream")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert_eq!(sink.records().await[0].outcome, AuditOutcome::Error);
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());

        let result = dispatcher
            .execute("panicking_tool", json!({}), CallSource::Llm, CallFlags::default())
            .await;
        match &result.outcome {
            DispatchOutcome::Error { message } => {
                assert!(message.contains("panicked"));
                assert!(message.contains("handler bug"));
            }
            other => panic!("expected Error, got {other:?}"),
        }
        // The dispatcher survives and keeps serving.
        let again = dispatcher
            .execute(
                "get_status",
                json!({"node": "worker7"}),
                CallSource::Llm,
                CallFlags::default(),
            )
            .await;
        assert!(again.outcome.is_ok());
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_outcome() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());
        sink.set_failing(true);

        let result = dispatcher
            .execute(
                "get_status",
                json!({"node": "worker7"}),
                CallSource::User,
                CallFlags::default(),
            )
            .await;
        assert!(result.outcome.is_ok());
        assert_eq!(dispatcher.audit_failure_count(), 1);
        assert!(sink.is_empty().await);
    }

    #[tokio::test]
    async fn test_text_args_are_stripped_and_passed_through() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink.clone());

        let result = dispatcher
            .execute(
                "get_status",
                json!({"node": "worker\u{0007}7"}),
                CallSource::Llm,
                CallFlags::default(),
            )
            .await;
        match &result.outcome {
            DispatchOutcome::Ok(value) => assert_eq!(value["echo"]["node"], "worker7"),
            other => panic!("expected Ok, got {other:?}"),
        }
        // The audit snapshot holds the sanitized form.
        assert_eq!(sink.records().await[0].args["node"], "worker7");
    }

    #[tokio::test]
    async fn test_action_list_exposed_for_introspection() {
        let sink = Arc::new(MemoryAuditSink::new());
        let dispatcher = build_dispatcher(sink);
        let names: Vec<_> = dispatcher
            .action_list()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(
            names,
            vec!["failing_tool", "get_status", "panicking_tool", "run_command"]
        );
    }

    #[tokio::test]
    async fn test_outcome_serde_distinguishes_narratives() {
        let ok = DispatchOutcome::Ok(json!({"x": 1}));
        let blocked = DispatchOutcome::Blocked {
            tier: ActionTier::Confirm,
            reason: "requires confirmation".to_string(),
        };
        let err = DispatchOutcome::Error {
            message: "boom".to_string(),
        };
        for outcome in [ok, blocked, err] {
            let json = serde_json::to_string(&outcome).unwrap();
            let back: DispatchOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(outcome, back);
        }
    }
}
