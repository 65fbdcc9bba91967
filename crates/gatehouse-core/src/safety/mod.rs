//! Safety policy: tier classification and protected-resource enforcement.
//!
//! - [`tier`]       — the ordered [`ActionTier`] ladder
//! - [`resource`]   — [`ProtectedResource`] catalogue + kind-aware matching
//! - [`config`]     — TOML loading for the resource catalogue
//! - [`classifier`] — [`SafetyPolicy::check`], the short-circuiting rule chain

pub mod classifier;
pub mod config;
pub mod resource;
pub mod tier;

pub use classifier::{CallFlags, SafetyDecision, SafetyPolicy};
pub use resource::{ProtectedResource, ProtectedResourceSet, ResourceKind};
pub use tier::ActionTier;
