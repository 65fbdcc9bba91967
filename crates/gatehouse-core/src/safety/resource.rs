//! Protected-resource catalogue.
//!
//! A protected resource is an identifier whose disruption could break the
//! automation system itself — the node the agent runs on, its VM/container
//! ids, the daemons it depends on, its state directories. Actions whose
//! arguments target one are refused independent of tier, and before any tier
//! rule is consulted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// What kind of identifier a protected resource carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A cluster node / hypervisor host name. Matched case-insensitively.
    Node,
    /// A VM or container id. Matched as an exact numeric string.
    Vmid,
    /// A system daemon / service name. Matched case-insensitively, with or
    /// without a `.service` suffix.
    Daemon,
    /// A filesystem location. Matched by path prefix.
    Path,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Vmid => write!(f, "vmid"),
            Self::Daemon => write!(f, "daemon"),
            Self::Path => write!(f, "path"),
        }
    }
}

/// A single protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResource {
    /// The identifier actions are matched against.
    pub identifier: String,
    pub kind: ResourceKind,
    /// What stops working if this resource is disrupted. Surfaced in the
    /// denial reason.
    #[serde(default)]
    pub dependents: Vec<String>,
}

impl ProtectedResource {
    pub fn new(identifier: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            dependents: Vec::new(),
        }
    }

    /// Attach dependents (builder pattern).
    pub fn with_dependents<I, S>(mut self, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependents = dependents.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if an argument value targets this resource.
    pub fn matches_value(&self, value: &str) -> bool {
        match self.kind {
            ResourceKind::Node => value.eq_ignore_ascii_case(&self.identifier),
            ResourceKind::Vmid => value == self.identifier,
            ResourceKind::Daemon => {
                let stripped = value.strip_suffix(".service").unwrap_or(value);
                stripped.eq_ignore_ascii_case(
                    self.identifier
                        .strip_suffix(".service")
                        .unwrap_or(&self.identifier),
                )
            }
            ResourceKind::Path => {
                let candidate = Path::new(value);
                let own = Path::new(&self.identifier);
                candidate == own || candidate.starts_with(own)
            }
        }
    }

    /// Human-readable denial reason naming this resource and its dependents.
    pub fn denial_reason(&self) -> String {
        if self.dependents.is_empty() {
            format!("targets protected {} '{}'", self.kind, self.identifier)
        } else {
            format!(
                "targets protected {} '{}' (required by: {})",
                self.kind,
                self.identifier,
                self.dependents.join(", ")
            )
        }
    }
}

/// The static set of protected resources, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResourceSet {
    pub resources: Vec<ProtectedResource>,
}

impl ProtectedResourceSet {
    /// An empty set (nothing protected).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a resource (builder pattern).
    pub fn with_resource(mut self, resource: ProtectedResource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Append every resource from `other`.
    pub fn extend(&mut self, other: ProtectedResourceSet) {
        self.resources.extend(other.resources);
    }

    /// The built-in catalogue protecting the automation stack itself.
    ///
    /// | Identifier            | Kind   | Dependents               |
    /// |-----------------------|--------|--------------------------|
    /// | agent1                | node   | gatehouse, audit-log     |
    /// | 100                   | vmid   | gatehouse                |
    /// | gatehouse             | daemon | tool dispatch            |
    /// | sshd                  | daemon | remote recovery          |
    /// | /var/lib/gatehouse    | path   | audit-log, action state  |
    pub fn standard() -> Self {
        Self::empty()
            .with_resource(
                ProtectedResource::new("agent1", ResourceKind::Node)
                    .with_dependents(["gatehouse", "audit-log"]),
            )
            .with_resource(
                ProtectedResource::new("100", ResourceKind::Vmid).with_dependents(["gatehouse"]),
            )
            .with_resource(
                ProtectedResource::new("gatehouse", ResourceKind::Daemon)
                    .with_dependents(["tool dispatch"]),
            )
            .with_resource(
                ProtectedResource::new("sshd", ResourceKind::Daemon)
                    .with_dependents(["remote recovery"]),
            )
            .with_resource(
                ProtectedResource::new("/var/lib/gatehouse", ResourceKind::Path)
                    .with_dependents(["audit-log", "action state"]),
            )
    }

    /// Scan argument values for the first protected-resource match.
    ///
    /// Every string value in `args` is checked, recursively through arrays
    /// and nested objects; numbers are checked against vmid identifiers.
    pub fn find_match(&self, args: &Value) -> Option<&ProtectedResource> {
        let mut candidates = Vec::new();
        collect_values(args, &mut candidates);
        for value in &candidates {
            if let Some(hit) = self.resources.iter().find(|r| r.matches_value(value)) {
                return Some(hit);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn collect_values(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                collect_values(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_values(item, out);
            }
        }
        _ => {}
    }
}
