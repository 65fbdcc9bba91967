//! Caller identity for dispatch attempts.

use serde::{Deserialize, Serialize};

/// Who initiated a tool invocation.
///
/// Descriptive only — the safety chain treats every source identically. The
/// value is carried into audit records so operators can separate agent
/// activity from scheduled monitors and direct human commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    /// The conversational LLM agent loop.
    Llm,
    /// A scheduled monitor or watchdog.
    Monitor,
    /// A human operator at a terminal or dashboard.
    User,
    /// A direct API client.
    Api,
}

impl std::fmt::Display for CallSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallSource::Llm => write!(f, "llm"),
            CallSource::Monitor => write!(f, "monitor"),
            CallSource::User => write!(f, "user"),
            CallSource::Api => write!(f, "api"),
        }
    }
}

impl std::str::FromStr for CallSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "llm" => Ok(CallSource::Llm),
            "monitor" => Ok(CallSource::Monitor),
            "user" => Ok(CallSource::User),
            "api" => Ok(CallSource::Api),
            other => Err(format!("unknown call source: {other}")),
        }
    }
}
