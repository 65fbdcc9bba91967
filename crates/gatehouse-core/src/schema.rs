//! Declarative per-action argument schemas.
//!
//! Each action declares its argument shape once at registration; the
//! dispatcher validates shape before sanitization, so tool handlers never
//! carry ad hoc validation code. The field kind also tells the dispatcher
//! which sanitizer to run on the value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a string argument semantically is — and therefore which sanitizer
/// vets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    /// Free text; control bytes stripped, length capped.
    #[default]
    Text,
    /// A shell command; allow/deny lists and metacharacter rules apply.
    Command,
    /// A filesystem path; canonicalized, confined, secret-file checked.
    Path,
    /// A URL; scheme and private-address rules apply.
    Url,
}

/// One declared argument field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgField {
    pub name: String,
    pub kind: ArgKind,
    pub required: bool,
}

/// The declared argument shape for an action.
///
/// Arguments not named here are still accepted and sanitized as free text;
/// the schema binds the fields with stronger semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSchema {
    pub fields: Vec<ArgField>,
}

impl ArgSchema {
    /// A schema with no declared fields.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declare a required field (builder pattern).
    pub fn with_required(mut self, name: impl Into<String>, kind: ArgKind) -> Self {
        self.fields.push(ArgField {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Declare an optional field (builder pattern).
    pub fn with_optional(mut self, name: impl Into<String>, kind: ArgKind) -> Self {
        self.fields.push(ArgField {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// The first required field missing from `args`, if any.
    pub fn missing_field(&self, args: &Value) -> Option<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .find(|f| args.get(&f.name).is_none())
            .map(|f| f.name.as_str())
    }

    /// The declared kind for a field name, defaulting to free text.
    pub fn kind_of(&self, name: &str) -> ArgKind {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.kind)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_field_detected() {
        let schema = ArgSchema::empty()
            .with_required("path", ArgKind::Path)
            .with_optional("limit", ArgKind::Text);
        assert_eq!(schema.missing_field(&json!({})), Some("path"));
        // Optional fields never trip the check.
        assert_eq!(schema.missing_field(&json!({"path": "/tmp"})), None);
        assert_eq!(
            schema.missing_field(&json!({"path": "/tmp", "limit": "10"})),
            None
        );
    }

    #[test]
    fn test_kind_of_declared_and_undeclared() {
        let schema = ArgSchema::empty().with_required("command", ArgKind::Command);
        assert_eq!(schema.kind_of("command"), ArgKind::Command);
        assert_eq!(schema.kind_of("anything_else"), ArgKind::Text);
    }

    #[test]
    fn test_empty_schema_requires_nothing() {
        assert_eq!(ArgSchema::empty().missing_field(&json!({})), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let schema = ArgSchema::empty()
            .with_required("url", ArgKind::Url)
            .with_optional("note", ArgKind::Text);
        let json = serde_json::to_string(&schema).unwrap();
        let back: ArgSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
