//! Safety classification — the ordered rule chain deciding whether an
//! invocation may proceed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::ProtectedResourceSet;
use super::tier::ActionTier;

/// Elevation signals accompanying one invocation.
///
/// All default to `false`; each is computed upstream (confirmation UI,
/// operator override grant, keyword-approval phrase detection) and passed in
/// as plain booleans — this layer never parses the signals itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFlags {
    /// The caller has confirmed the action. For `DoubleConfirm` actions the
    /// caller layer must have completed a second, distinct round before
    /// setting this.
    pub confirmed: bool,
    /// An operator-granted, call-scoped override is active.
    pub override_active: bool,
    /// The out-of-band keyword approval was given. Distinct from
    /// `confirmed`; required for `KeywordElevated` actions.
    pub keyword_approved: bool,
}

/// Outcome of the safety chain for one invocation.
///
/// Computed per call and never persisted, except as text inside an audit
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyDecision {
    pub allowed: bool,
    pub tier: ActionTier,
    pub reason: Option<String>,
}

impl SafetyDecision {
    fn allowed(tier: ActionTier) -> Self {
        Self {
            allowed: true,
            tier,
            reason: None,
        }
    }

    fn blocked(tier: ActionTier, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            tier,
            reason: Some(reason.into()),
        }
    }
}

/// The safety policy: the action-tier table plus the protected-resource set.
///
/// Pure and synchronous — evaluation imposes no serialization between
/// concurrent dispatches.
#[derive(Debug, Clone, Default)]
pub struct SafetyPolicy {
    tiers: HashMap<String, ActionTier>,
    /// Static protected-resource identifiers per action, for actions whose
    /// target is fixed at registration rather than argument-supplied.
    protected_refs: HashMap<String, Vec<String>>,
    resources: ProtectedResourceSet,
}

impl SafetyPolicy {
    pub fn new(
        tiers: HashMap<String, ActionTier>,
        protected_refs: HashMap<String, Vec<String>>,
        resources: ProtectedResourceSet,
    ) -> Self {
        Self {
            tiers,
            protected_refs,
            resources,
        }
    }

    /// The tier for `name`. Unknown actions resolve to the most restrictive
    /// tier.
    pub fn tier_of(&self, name: &str) -> ActionTier {
        self.tiers.get(name).copied().unwrap_or(ActionTier::Blocked)
    }

    /// The protected-resource set this policy enforces.
    pub fn resources(&self) -> &ProtectedResourceSet {
        &self.resources
    }

    /// Evaluate the ordered, short-circuiting safety chain.
    ///
    /// 1. Unknown action — blocked.
    /// 2. Tier `Blocked` — blocked unconditionally; no flag combination
    ///    bypasses this.
    /// 3. Protected-resource match — blocked, before any tier rule, so even
    ///    `Auto` actions cannot touch the resources the system stands on.
    /// 4. Tier `Auto` — allowed.
    /// 5. Tier `Confirm` / `DoubleConfirm` — allowed only when confirmed.
    /// 6. Tier `KeywordElevated` — allowed only with keyword approval,
    ///    independent of confirmation and override.
    pub fn check(&self, name: &str, args: &Value, flags: &CallFlags) -> SafetyDecision {
        let Some(tier) = self.tiers.get(name).copied() else {
            return SafetyDecision::blocked(
                ActionTier::Blocked,
                format!("unknown action '{name}'"),
            );
        };

        if tier.is_blocked() {
            return SafetyDecision::blocked(tier, format!("action '{name}' is always blocked"));
        }

        if let Some(refs) = self.protected_refs.get(name) {
            for resource in &self.resources.resources {
                if refs.iter().any(|r| resource.matches_value(r)) {
                    return SafetyDecision::blocked(tier, resource.denial_reason());
                }
            }
        }
        if let Some(resource) = self.resources.find_match(args) {
            return SafetyDecision::blocked(tier, resource.denial_reason());
        }

        match tier {
            ActionTier::Auto => SafetyDecision::allowed(tier),
            ActionTier::Confirm | ActionTier::DoubleConfirm => {
                if flags.confirmed {
                    SafetyDecision::allowed(tier)
                } else {
                    SafetyDecision::blocked(tier, format!("action '{name}' requires confirmation"))
                }
            }
            ActionTier::KeywordElevated => {
                if flags.keyword_approved {
                    SafetyDecision::allowed(tier)
                } else {
                    SafetyDecision::blocked(
                        tier,
                        format!("action '{name}' requires keyword approval"),
                    )
                }
            }
            ActionTier::Blocked => unreachable!("handled above"),
        }
    }
}
