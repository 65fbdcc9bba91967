//! Action risk tiers.

use serde::{Deserialize, Serialize};

/// Risk tier assigned to a registered action.
///
/// Ordered by increasing restriction. The tier decides which elevation
/// signals an invocation needs; `Blocked` actions never run under any
/// combination of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTier {
    /// Executes without any confirmation.
    Auto,
    /// Requires the caller to have confirmed the action.
    Confirm,
    /// Requires a second, distinct confirmation round upstream. This layer
    /// receives the collapsed `confirmed` flag; the caller owns running both
    /// rounds before setting it.
    DoubleConfirm,
    /// Requires the out-of-band keyword-approval signal; plain confirmation
    /// is not sufficient.
    KeywordElevated,
    /// Never executes, regardless of confirmation, override, or approval.
    Blocked,
}

impl ActionTier {
    /// Whether this tier needs the `confirmed` flag.
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::Confirm | Self::DoubleConfirm)
    }

    /// Whether this tier needs the distinct keyword-approval flag.
    pub fn requires_keyword_approval(self) -> bool {
        matches!(self, Self::KeywordElevated)
    }

    /// Whether this tier refuses to run unconditionally.
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

impl std::fmt::Display for ActionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Confirm => write!(f, "confirm"),
            Self::DoubleConfirm => write!(f, "double_confirm"),
            Self::KeywordElevated => write!(f, "keyword_elevated"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}
