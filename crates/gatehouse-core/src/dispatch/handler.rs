//! Handler contract and call context.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::domain::CallSource;

use super::override_ctx::OverrideContext;

/// Per-call context handed to a handler.
///
/// Carries the call id for log correlation, the caller identity, and the
/// call-scoped override signal. Cloned freely; it holds no live resources.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_id: Uuid,
    pub source: CallSource,
    override_ctx: OverrideContext,
}

impl CallContext {
    pub(crate) fn new(call_id: Uuid, source: CallSource, override_ctx: OverrideContext) -> Self {
        Self {
            call_id,
            source,
            override_ctx,
        }
    }

    /// Whether the operator override is active for this call.
    pub fn override_active(&self) -> bool {
        self.override_ctx.is_active()
    }
}

/// Contract for the code that actually performs a tool's work.
///
/// Handlers return `Err(message)` for operational failures; the dispatcher
/// converts both errors and panics into structured error results, so a
/// misbehaving handler cannot take the dispatcher down.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    async fn call(&self, args: &Value, ctx: &CallContext) -> Result<Value, String>;
}

/// Adapter wrapping an async closure as a [`ToolHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait::async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    async fn call(&self, args: &Value, ctx: &CallContext) -> Result<Value, String> {
        (self.f)(args.clone(), ctx.clone()).await
    }
}
