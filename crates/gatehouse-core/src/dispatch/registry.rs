//! Name-indexed action registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{GatewayError, Result};
use crate::safety::ActionTier;
use crate::schema::ArgSchema;

use super::handler::ToolHandler;

/// A registered action: name, tier, declared argument shape, and handler.
#[derive(Clone)]
pub struct ActionSpec {
    pub name: String,
    pub tier: ActionTier,
    pub schema: ArgSchema,
    /// Identifiers of protected resources this action is known to target
    /// regardless of its arguments (e.g. a tool hardwired to one host).
    pub protected_refs: Vec<String>,
    pub handler: Arc<dyn ToolHandler>,
}

impl ActionSpec {
    pub fn new(
        name: impl Into<String>,
        tier: ActionTier,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            tier,
            schema: ArgSchema::empty(),
            protected_refs: Vec::new(),
            handler,
        }
    }

    /// Attach an argument schema (builder pattern).
    pub fn with_schema(mut self, schema: ArgSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Declare static protected-resource targets (builder pattern).
    pub fn with_protected_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_refs = refs.into_iter().map(Into::into).collect();
        self
    }
}

impl std::fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSpec")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// A `{name, tier}` pair for introspection (capability lists, prompts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    pub name: String,
    pub tier: ActionTier,
}

/// The startup-time action table.
///
/// Registration happens once while wiring the system; the registry is then
/// moved into the dispatcher and never mutated again.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionSpec>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Duplicate names fail fast — a collision at
    /// startup is a wiring bug, not a runtime condition.
    pub fn register(&mut self, spec: ActionSpec) -> Result<()> {
        if self.actions.contains_key(&spec.name) {
            return Err(GatewayError::DuplicateAction { name: spec.name });
        }
        self.actions.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    /// All registered actions as `{name, tier}` pairs, sorted by name.
    pub fn action_list(&self) -> Vec<ActionInfo> {
        let mut list: Vec<ActionInfo> = self
            .actions
            .values()
            .map(|spec| ActionInfo {
                name: spec.name.clone(),
                tier: spec.tier,
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// The name → tier table, for building the safety policy.
    pub fn tier_map(&self) -> HashMap<String, ActionTier> {
        self.actions
            .iter()
            .map(|(name, spec)| (name.clone(), spec.tier))
            .collect()
    }

    /// The name → static protected-resource refs table, for actions that
    /// declared targets up front.
    pub fn protected_ref_map(&self) -> HashMap<String, Vec<String>> {
        self.actions
            .iter()
            .filter(|(_, spec)| !spec.protected_refs.is_empty())
            .map(|(name, spec)| (name.clone(), spec.protected_refs.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::FnHandler;
    use serde_json::{json, Value};

    fn noop_handler() -> Arc<dyn ToolHandler> {
        Arc::new(FnHandler::new(|_args: Value, _ctx| async move {
            Ok(json!(null))
        }))
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ActionRegistry::new();
        registry
            .register(ActionSpec::new("get_status", ActionTier::Auto, noop_handler()))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("get_status").unwrap().tier, ActionTier::Auto);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_registration_fails_fast() {
        let mut registry = ActionRegistry::new();
        registry
            .register(ActionSpec::new("reboot_node", ActionTier::Confirm, noop_handler()))
            .unwrap();
        let err = registry
            .register(ActionSpec::new("reboot_node", ActionTier::Blocked, noop_handler()))
            .unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateAction { name } if name == "reboot_node"));
    }

    #[test]
    fn test_action_list_sorted() {
        let mut registry = ActionRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(ActionSpec::new(name, ActionTier::Auto, noop_handler()))
                .unwrap();
        }
        let names: Vec<_> = registry.action_list().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_tier_map_matches_registrations() {
        let mut registry = ActionRegistry::new();
        registry
            .register(ActionSpec::new("a", ActionTier::Auto, noop_handler()))
            .unwrap();
        registry
            .register(ActionSpec::new("b", ActionTier::Blocked, noop_handler()))
            .unwrap();
        let map = registry.tier_map();
        assert_eq!(map["a"], ActionTier::Auto);
        assert_eq!(map["b"], ActionTier::Blocked);
    }
}
