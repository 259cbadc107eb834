#![forbid(unsafe_code)]

//! Interactive transition tracking.
//!
//! One [`InteractiveTransitionTracker`] exists per back-gesture attempt. It
//! follows the lifecycle reported by the platform and decides whether the
//! speculative descriptor edit made at the start becomes permanent.
//!
//! # State transitions
//!
//! ```text
//!  ┌──────┐  start  ┌─────────┐  change  ┌─────────┐  complete  ┌───────────┐
//!  │ Idle ├────────▶│ Started ├─────────▶│ Changed ├───────────▶│ Completed │
//!  └──────┘         └─────────┘          └─────────┘            └───────────┘
//! ```
//!
//! # Invariants
//!
//! 1. The state only ever advances one step along the diagram; any other
//!    call is ignored and reported as not accepted.
//! 2. The settle callback runs exactly once, either when `complete` is
//!    accepted or when the tracker is abandoned.
//! 3. Interactive callbacks on the revealed entry fire only when the
//!    transition was interactive at `start`.
//! 4. The tracker never touches the authoritative stack; committing is the
//!    job of the revealed entry's `complete_interactive` binding.

use std::fmt;
use std::rc::Rc;
use std::cell::RefCell;

use bitflags::bitflags;
use tracing::trace;
use waypoint_core::FlowId;
use web_time::Instant;

use crate::descriptor::{ItemDescriptor, NavigationDescriptor};
use crate::once::OnceToken;

bitflags! {
    /// Flags reported by the platform for an in-flight transition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransitionContext: u8 {
        const INTERRUPTIBLE = 0b0001;
        const INTERACTIVE   = 0b0010;
        const CANCELLED     = 0b0100;
        const ANIMATED      = 0b1000;
    }
}

impl TransitionContext {
    #[inline]
    #[must_use]
    pub const fn is_interruptible(self) -> bool {
        self.contains(Self::INTERRUPTIBLE)
    }

    #[inline]
    #[must_use]
    pub const fn is_interactive(self) -> bool {
        self.contains(Self::INTERACTIVE)
    }

    #[inline]
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        self.contains(Self::CANCELLED)
    }

    #[inline]
    #[must_use]
    pub const fn is_animated(self) -> bool {
        self.contains(Self::ANIMATED)
    }

    /// Context of a finger-driven back swipe.
    #[must_use]
    pub const fn gesture() -> Self {
        Self::INTERACTIVE
            .union(Self::ANIMATED)
            .union(Self::INTERRUPTIBLE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransitionState {
    Idle,
    Started,
    Changed,
    Completed,
}

impl TransitionState {
    const fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Started),
            Self::Started => Some(Self::Changed),
            Self::Changed => Some(Self::Completed),
            Self::Completed => None,
        }
    }
}

/// Final disposition of a tracked transition.
#[derive(Clone)]
pub enum TransitionOutcome<V> {
    /// Interactive and not cancelled: the speculative descriptor stands.
    Committed(NavigationDescriptor<V>),
    /// Interactive but cancelled or abandoned: the presented descriptor is
    /// restored.
    RolledBack(NavigationDescriptor<V>),
    /// Not interactive; nothing speculative happened.
    NonInteractive,
}

impl<V> TransitionOutcome<V> {
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Committed(_) => Disposition::Committed,
            Self::RolledBack(_) => Disposition::RolledBack,
            Self::NonInteractive => Disposition::NonInteractive,
        }
    }
}

impl<V> fmt::Debug for TransitionOutcome<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed(d) => f.debug_tuple("Committed").field(&d.ids()).finish(),
            Self::RolledBack(d) => f.debug_tuple("RolledBack").field(&d.ids()).finish(),
            Self::NonInteractive => f.write_str("NonInteractive"),
        }
    }
}

/// Data-free summary of a [`TransitionOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Committed,
    RolledBack,
    NonInteractive,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// State machine for one gesture-driven back transition.
pub struct InteractiveTransitionTracker<V> {
    state: TransitionState,
    context: TransitionContext,
    presented: NavigationDescriptor<V>,
    speculative: Option<NavigationDescriptor<V>>,
    revealed: FlowId,
    item: Option<ItemDescriptor<V>>,
    started_at: Option<Instant>,
    trace: bool,
    outcome: Rc<RefCell<Option<TransitionOutcome<V>>>>,
    settle: OnceToken,
}

impl<V: Clone + 'static> InteractiveTransitionTracker<V> {
    /// Track a transition over `presented` that reveals the entry `revealed`.
    ///
    /// `on_settle` receives the final outcome exactly once.
    pub fn new(
        presented: NavigationDescriptor<V>,
        revealed: FlowId,
        on_settle: impl FnOnce(TransitionOutcome<V>) + 'static,
    ) -> Self {
        let outcome: Rc<RefCell<Option<TransitionOutcome<V>>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&outcome);
        let settle = OnceToken::new(move || {
            let decided = slot.borrow_mut().take();
            if let Some(decided) = decided {
                on_settle(decided);
            }
        });
        let item = presented.item(&revealed).cloned();
        Self {
            state: TransitionState::Idle,
            context: TransitionContext::empty(),
            presented,
            speculative: None,
            revealed,
            item,
            started_at: None,
            trace: false,
            outcome,
            settle,
        }
    }

    /// Log each accepted step at `trace` level.
    #[must_use]
    pub fn with_trace(mut self, on: bool) -> Self {
        self.trace = on;
        self
    }

    /// Capture all flags and, if interactive, notify the revealed entry and
    /// drop the top from the speculative descriptor.
    pub fn start(&mut self, context: TransitionContext) -> bool {
        if !self.advance(TransitionState::Started) {
            return false;
        }
        self.context = context;
        self.started_at = Some(Instant::now());
        if self.context.is_interactive() {
            self.speculative = Some(self.presented.drop_last());
            if let Some(item) = &self.item {
                item.start_interactive(self.context);
            }
        }
        self.log("start");
        true
    }

    /// Refresh the flags (interactivity is fixed at `start`).
    pub fn change(&mut self, context: TransitionContext) -> bool {
        if !self.advance(TransitionState::Changed) {
            return false;
        }
        self.refresh(context);
        if self.context.is_interactive()
            && let Some(item) = &self.item
        {
            item.change_interactive(self.context);
        }
        self.log("change");
        true
    }

    /// Refresh the flags, notify the revealed entry, then settle.
    pub fn complete(&mut self, context: TransitionContext) -> bool {
        if !self.advance(TransitionState::Completed) {
            return false;
        }
        self.refresh(context);
        if self.context.is_interactive()
            && let Some(item) = &self.item
        {
            item.complete_interactive(self.context);
        }
        self.log("complete");
        self.settle();
        true
    }

    /// Give up on the transition.
    ///
    /// An interactive transition that started but never completed is
    /// completed as cancelled so the revealed entry sees a balanced
    /// start/complete pair. Settles if that has not happened yet.
    pub fn abandon(&mut self) {
        if matches!(self.state, TransitionState::Started | TransitionState::Changed) {
            self.state = TransitionState::Completed;
            self.context.insert(TransitionContext::CANCELLED);
            if self.context.is_interactive()
                && let Some(item) = &self.item
            {
                item.complete_interactive(self.context);
            }
            self.log("abandon");
        }
        self.settle();
    }

    fn settle(&mut self) {
        if !self.settle.is_armed() {
            return;
        }
        let decided = self.decide();
        *self.outcome.borrow_mut() = Some(decided);
        self.settle.fire();
    }

    fn decide(&self) -> TransitionOutcome<V> {
        if !self.context.is_interactive() {
            return TransitionOutcome::NonInteractive;
        }
        if self.state == TransitionState::Completed && !self.context.is_cancelled() {
            let committed = self
                .speculative
                .clone()
                .unwrap_or_else(|| self.presented.drop_last());
            TransitionOutcome::Committed(committed)
        } else {
            TransitionOutcome::RolledBack(self.presented.clone())
        }
    }
}

impl<V> InteractiveTransitionTracker<V> {
    #[inline]
    #[must_use]
    pub fn state(&self) -> TransitionState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> TransitionContext {
        self.context
    }

    /// Identity of the entry the transition reveals.
    #[must_use]
    pub fn revealed(&self) -> &FlowId {
        &self.revealed
    }

    /// Descriptor reflecting the optimistic end state, if one was computed.
    #[must_use]
    pub fn speculative(&self) -> Option<&NavigationDescriptor<V>> {
        self.speculative.as_ref()
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.settle.is_armed()
    }

    fn advance(&mut self, next: TransitionState) -> bool {
        if self.state.successor() != Some(next) {
            if self.trace {
                trace!(
                    message = "nav.transition.ignored",
                    revealed = %self.revealed,
                    state = ?self.state,
                    requested = ?next,
                );
            }
            return false;
        }
        self.state = next;
        true
    }

    fn refresh(&mut self, context: TransitionContext) {
        let interactive = self.context & TransitionContext::INTERACTIVE;
        self.context = (context - TransitionContext::INTERACTIVE) | interactive;
    }

    fn log(&self, phase: &'static str) {
        if !self.trace {
            return;
        }
        let elapsed_us = self
            .started_at
            .map(|t| u64::try_from(t.elapsed().as_micros()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        trace!(
            message = "nav.transition",
            phase,
            revealed = %self.revealed,
            interruptible = self.context.is_interruptible(),
            interactive = self.context.is_interactive(),
            cancelled = self.context.is_cancelled(),
            animated = self.context.is_animated(),
            elapsed_us,
        );
    }
}

impl<V> fmt::Debug for InteractiveTransitionTracker<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveTransitionTracker")
            .field("state", &self.state)
            .field("context", &self.context)
            .field("revealed", &self.revealed)
            .field("settled", &self.is_settled())
            .finish()
    }
}
