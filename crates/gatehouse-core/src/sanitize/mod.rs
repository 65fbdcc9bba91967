//! Input sanitization for tool arguments.
//!
//! Pure validation functions for the argument kinds that cross the gateway:
//!
//! - [`text`]    — `sanitize_text()` (control-byte strip + truncate)
//! - [`command`] — `check_command()` (allow/deny lists, chaining metacharacters)
//! - [`path`]    — `check_path()` (lexical canonicalization, root confinement)
//! - [`secret`]  — `is_secret_file()` (secret filename/extension conventions)
//! - [`url`]     — `check_url()` (scheme + private-address rejection)
//!
//! Every checker returns a [`Verdict`] rather than raising. A rejection is
//! terminal: callers must not retry with relaxed checks.

pub mod command;
pub mod path;
pub mod secret;
pub mod text;
pub mod url;

use serde::{Deserialize, Serialize};

pub use command::check_command;
pub use path::{check_path, PathCheck};
pub use secret::is_secret_file;
pub use text::sanitize_text;
pub use url::check_url;

/// Outcome of a sanitization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The input passed every check.
    Safe,
    /// The input was rejected with a reason.
    Rejected { reason: String },
}

impl Verdict {
    /// Construct a rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Verdict::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns `true` when the verdict is `Safe`.
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Safe => None,
            Verdict::Rejected { reason } => Some(reason),
        }
    }
}
