#![forbid(unsafe_code)]

//! Navigation rejections.
//!
//! A rejected operation leaves the stack and the presenter untouched. These
//! values are ordinary outcomes to branch on, not failures to propagate.

use thiserror::Error;
use waypoint_core::FlowId;

/// Why a navigation request was turned down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackRejection {
    #[error("navigation stack cannot be set to an empty sequence")]
    EmptyStack,

    #[error("flow {0} is already on the navigation stack")]
    AlreadyOnStack(FlowId),

    #[error("source flow {0} is not on the navigation stack")]
    SourceNotFound(FlowId),

    #[error("target flow {0} is not on the navigation stack")]
    TargetNotFound(FlowId),

    #[error("popping from flow {0} would leave the navigation stack empty")]
    WouldEmptyStack(FlowId),

    #[error("flow {0} is already on top of the navigation stack")]
    AlreadyOnTop(FlowId),

    #[error("an interactive transition revealing flow {0} is still in flight")]
    TransitionInFlight(FlowId),

    #[error("navigator is detached from its stack coordinator")]
    Detached,
}

impl StackRejection {
    /// Whether this is a reconciliation guard of the stack itself, as opposed
    /// to a coordinator-level refusal.
    #[must_use]
    pub fn is_guard(&self) -> bool {
        !matches!(self, Self::TransitionInFlight(_) | Self::Detached)
    }

    /// Stable short name used as the `reason` field in logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyStack => "empty_stack",
            Self::AlreadyOnStack(_) => "already_on_stack",
            Self::SourceNotFound(_) => "source_not_found",
            Self::TargetNotFound(_) => "target_not_found",
            Self::WouldEmptyStack(_) => "would_empty_stack",
            Self::AlreadyOnTop(_) => "already_on_top",
            Self::TransitionInFlight(_) => "transition_in_flight",
            Self::Detached => "detached",
        }
    }
}
