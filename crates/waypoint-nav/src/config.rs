#![forbid(unsafe_code)]

//! Coordinator configuration.
//!
//! Defaults suit production use. [`NavigationConfig::from_env`] lets a host
//! flip diagnostics on without recompiling:
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `WAYPOINT_LOG_REJECTIONS` | `1/true/on`, `0/false/off` | on |
//! | `WAYPOINT_TRACE_TRANSITIONS` | `1/true/on`, `0/false/off` | off |
//! | `WAYPOINT_PENDING_POLICY` | `reject`, `allow` | `reject` |
//!
//! Unrecognised values fall back to the default for that field.

use std::str::FromStr;

/// What a coordinator does with a programmatic operation requested while an
/// interactive (gesture-driven) transition is still unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingInteractivePolicy {
    /// Refuse with [`StackRejection::TransitionInFlight`](crate::StackRejection::TransitionInFlight).
    #[default]
    Reject,
    /// Apply the operation. The presenter abandons the pending gesture first,
    /// so it settles as rolled back and never commits.
    Allow,
}

impl FromStr for PendingInteractivePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "allow" => Ok(Self::Allow),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationConfig {
    /// Log every rejected operation at `warn` level.
    pub log_rejections: bool,
    /// Log each interactive transition step at `trace` level.
    pub trace_transitions: bool,
    pub pending_policy: PendingInteractivePolicy,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            log_rejections: true,
            trace_transitions: false,
            pending_policy: PendingInteractivePolicy::Reject,
        }
    }
}

impl NavigationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_log_rejections(mut self, on: bool) -> Self {
        self.log_rejections = on;
        self
    }

    #[must_use]
    pub const fn with_trace_transitions(mut self, on: bool) -> Self {
        self.trace_transitions = on;
        self
    }

    #[must_use]
    pub const fn with_pending_policy(mut self, policy: PendingInteractivePolicy) -> Self {
        self.pending_policy = policy;
        self
    }

    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, which maps a variable name to its value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_rejections: lookup("WAYPOINT_LOG_REJECTIONS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.log_rejections),
            trace_transitions: lookup("WAYPOINT_TRACE_TRANSITIONS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.trace_transitions),
            pending_policy: lookup("WAYPOINT_PENDING_POLICY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pending_policy),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
