#![forbid(unsafe_code)]

//! The presentation boundary.
//!
//! A [`Presenter`] owns the platform container that actually shows views and
//! animates between them. The coordinator never renders; it hands over a
//! [`NavigationDescriptor`] and a [`Direction`] and lets the presenter report
//! lifecycle events back through the descriptor's callbacks.
//!
//! # Contract
//!
//! - By the time the completion fires, the shown view list matches the
//!   descriptor's order. The completion fires at most once.
//! - Each entry's `will_appear` / `did_appear` fire at the matching point.
//! - A back-button press calls `should_dismiss` on the top entry and does
//!   not pop by itself; the coordinator performs the pop.
//! - A back gesture may begin only if the descriptor has more than one entry
//!   and the top entry's `should_start_interactive` returns `true`.
//! - Interactive start/change/complete are reported to the revealed entry
//!   with a [`TransitionContext`](crate::TransitionContext).
//!
//! Calls arrive on the context that owns the flow tree and may re-enter the
//! presenter (a lifecycle hook can navigate), so implementations must not
//! hold interior borrows while invoking descriptor callbacks.

use std::fmt;

use crate::descriptor::NavigationDescriptor;

/// Callback run once the presentation has settled.
pub type Completion = Box<dyn FnOnce()>;

/// Animation direction hint for a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    None,
}

impl Direction {
    /// `Forward`, or `None` when not animated.
    #[inline]
    #[must_use]
    pub const fn forward(animated: bool) -> Self {
        if animated { Self::Forward } else { Self::None }
    }

    /// `Backward`, or `None` when not animated.
    #[inline]
    #[must_use]
    pub const fn backward(animated: bool) -> Self {
        if animated { Self::Backward } else { Self::None }
    }

    #[inline]
    #[must_use]
    pub const fn is_animated(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Renders descriptors and reports lifecycle events back.
pub trait Presenter<V> {
    /// Show `descriptor`, animating in `direction`, then run `completion`.
    fn present(
        &self,
        descriptor: NavigationDescriptor<V>,
        direction: Direction,
        completion: Option<Completion>,
    );

    /// The container view that hosts the presented views. This is the view
    /// of the coordinator's own flow node.
    fn container_view(&self) -> V;
}

/// Per-call presentation options.
#[must_use]
pub struct PresentOptions {
    pub animated: bool,
    pub completion: Option<Completion>,
}

impl Default for PresentOptions {
    fn default() -> Self {
        Self {
            animated: true,
            completion: None,
        }
    }
}

impl PresentOptions {
    /// Animated, no completion.
    pub fn animated() -> Self {
        Self::default()
    }

    /// Not animated, no completion.
    pub fn immediate() -> Self {
        Self {
            animated: false,
            completion: None,
        }
    }

    pub fn with_completion(mut self, completion: impl FnOnce() + 'static) -> Self {
        self.completion = Some(Box::new(completion));
        self
    }
}

impl fmt::Debug for PresentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentOptions")
            .field("animated", &self.animated)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_respects_animation_flag() {
        assert_eq!(Direction::forward(true), Direction::Forward);
        assert_eq!(Direction::forward(false), Direction::None);
        assert_eq!(Direction::backward(true), Direction::Backward);
        assert!(!Direction::backward(false).is_animated());
    }

    #[test]
    fn options_defaults() {
        let opts = PresentOptions::default();
        assert!(opts.animated);
        assert!(opts.completion.is_none());
        let opts = PresentOptions::immediate().with_completion(|| {});
        assert!(!opts.animated);
        assert!(opts.completion.is_some());
    }
}
