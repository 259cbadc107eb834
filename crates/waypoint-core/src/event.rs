#![forbid(unsafe_code)]

//! Flow events and dispatch results.
//!
//! Events are application-defined tagged values. Each event reports a
//! compile-time-known [`FlowEvent::Kind`] discriminant; listener tables are
//! keyed by that discriminant so lookup is a hash probe rather than a type
//! test.
//!
//! ```
//! use waypoint_core::FlowEvent;
//!
//! #[derive(Debug, Clone)]
//! enum AppEvent {
//!     Logout,
//!     Open { path: String },
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum AppEventKind {
//!     Logout,
//!     Open,
//! }
//!
//! impl FlowEvent for AppEvent {
//!     type Kind = AppEventKind;
//!
//!     fn kind(&self) -> AppEventKind {
//!         match self {
//!             AppEvent::Logout => AppEventKind::Logout,
//!             AppEvent::Open { .. } => AppEventKind::Open,
//!         }
//!     }
//! }
//!
//! assert_eq!(AppEvent::Open { path: "/".into() }.kind(), AppEventKind::Open);
//! ```

use std::fmt;
use std::hash::Hash;

use crate::FlowId;

/// An event that can travel up the flow tree.
pub trait FlowEvent: 'static {
    /// Stable per-kind discriminant used as the dispatch table key.
    type Kind: Copy + Eq + Hash + fmt::Debug + 'static;

    /// Discriminant of this event value.
    fn kind(&self) -> Self::Kind;
}

/// Where a dispatched event ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler on the named node consumed the event.
    Handled(FlowId),
    /// The event reached the root (or a released node) without a handler.
    Unhandled,
}

impl DispatchOutcome {
    /// Whether a handler consumed the event.
    #[inline]
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }

    /// Identity of the handling node, if any.
    #[must_use]
    pub fn handled_by(&self) -> Option<&FlowId> {
        match self {
            Self::Handled(id) => Some(id),
            Self::Unhandled => None,
        }
    }
}
