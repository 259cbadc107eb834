#![forbid(unsafe_code)]

//! Headless reference presenter.
//!
//! [`HeadlessPresenter`] models a native navigation container without
//! drawing anything. It keeps the presented descriptor, fires appearance
//! callbacks when the top entry changes, forwards back-button presses and
//! back gestures to the descriptor callbacks, and records everything it did
//! so tests can assert on it.
//!
//! # Invariants
//!
//! 1. Each `present` completion fires exactly once. A completion still
//!    pending when a newer `present` arrives (a lifecycle hook navigating
//!    synchronously) is fired before the newer descriptor is installed.
//! 2. No interior borrow is held while descriptor callbacks run.
//! 3. At most one back gesture is in flight; a `present` arriving during a
//!    gesture abandons it (rolled back) before applying. The shown
//!    descriptor only changes on `present` or on a committed gesture that no
//!    `present` overtook.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;
use waypoint_core::FlowId;
use waypoint_nav::{
    Completion, Direction, Disposition, InteractiveTransitionTracker, ItemDescriptor,
    NavigationDescriptor, OnceToken, Presenter, TransitionContext, TransitionOutcome,
    TransitionState,
};

/// One recorded `present` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub ids: Vec<FlowId>,
    pub direction: Direction,
    pub with_completion: bool,
}

impl Presentation {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Something the presenter did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    WillAppear { id: FlowId, animated: bool },
    DidAppear { id: FlowId, animated: bool },
    Completed,
    BackPressed(FlowId),
    GestureRefused(FlowId),
    GestureBegan { revealed: FlowId },
    GestureSettled(Disposition),
}

struct HeadlessState<V> {
    container: V,
    descriptor: RefCell<NavigationDescriptor<V>>,
    generation: Cell<u64>,
    completion: RefCell<Option<OnceToken>>,
    gesture: RefCell<Option<InteractiveTransitionTracker<V>>>,
    gesture_generation: Cell<u64>,
    settlement: Cell<Option<Disposition>>,
    history: RefCell<Vec<Presentation>>,
    events: RefCell<Vec<PresenterEvent>>,
    trace_transitions: Cell<bool>,
}

impl<V> HeadlessState<V> {
    fn record(&self, event: PresenterEvent) {
        self.events.borrow_mut().push(event);
    }

    fn bump(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }

    /// Swap in `next`, dropping the old descriptor outside the borrow.
    fn install(&self, next: NavigationDescriptor<V>) {
        let previous = std::mem::replace(&mut *self.descriptor.borrow_mut(), next);
        drop(previous);
    }

    fn flush_completion(&self) {
        let pending = self.completion.borrow_mut().take();
        if let Some(token) = pending
            && token.is_armed()
        {
            self.record(PresenterEvent::Completed);
            token.fire();
        }
    }

    fn appear(&self, item: &ItemDescriptor<V>, animated: bool) {
        let id = item.id().clone();
        let generation = self.generation.get();
        self.record(PresenterEvent::WillAppear {
            id: id.clone(),
            animated,
        });
        item.will_appear(animated);
        if self.generation.get() != generation {
            debug!(message = "headless.superseded", flow = %id);
            return;
        }
        self.record(PresenterEvent::DidAppear { id, animated });
        item.did_appear(animated);
    }
}

impl<V: Clone + 'static> HeadlessState<V> {
    fn abandon_gesture(&self) {
        let tracker = self.gesture.borrow_mut().take();
        if let Some(mut tracker) = tracker {
            debug!(message = "headless.gesture.abandon", revealed = %tracker.revealed());
            tracker.abandon();
        }
    }

    fn settle(&self, outcome: TransitionOutcome<V>) {
        let disposition = outcome.disposition();
        self.settlement.set(Some(disposition));
        self.record(PresenterEvent::GestureSettled(disposition));
        match outcome {
            TransitionOutcome::Committed(descriptor) => {
                if self.generation.get() != self.gesture_generation.get() {
                    // Something presented mid-gesture; that descriptor wins.
                    debug!(message = "headless.gesture.stale");
                    return;
                }
                let top = descriptor.last().cloned();
                self.install(descriptor);
                self.bump();
                if let Some(top) = top {
                    self.record(PresenterEvent::DidAppear {
                        id: top.id().clone(),
                        animated: true,
                    });
                    top.did_appear(true);
                }
            }
            TransitionOutcome::RolledBack(_) | TransitionOutcome::NonInteractive => {}
        }
    }
}

// ---------------------------------------------------------------------------
// HeadlessPresenter
// ---------------------------------------------------------------------------

/// Presenter that records instead of rendering.
///
/// Wrap it in an `Rc` and hand a clone to the coordinator; keep the other
/// handle to drive back presses and gestures.
pub struct HeadlessPresenter<V> {
    state: Rc<HeadlessState<V>>,
}

impl<V> HeadlessPresenter<V> {
    /// `container` is returned as the coordinator node's view.
    pub fn new(container: V) -> Self {
        Self {
            state: Rc::new(HeadlessState {
                container,
                descriptor: RefCell::new(NavigationDescriptor::default()),
                generation: Cell::new(0),
                completion: RefCell::new(None),
                gesture: RefCell::new(None),
                gesture_generation: Cell::new(0),
                settlement: Cell::new(None),
                history: RefCell::new(Vec::new()),
                events: RefCell::new(Vec::new()),
                trace_transitions: Cell::new(false),
            }),
        }
    }

    /// Trace every gesture step (see `NavigationConfig::trace_transitions`).
    #[must_use]
    pub fn with_trace_transitions(self, on: bool) -> Self {
        self.state.trace_transitions.set(on);
        self
    }

    /// Identities currently shown, bottom first.
    #[must_use]
    pub fn ids(&self) -> Vec<FlowId> {
        self.state.descriptor.borrow().ids()
    }

    #[must_use]
    pub fn top(&self) -> Option<FlowId> {
        self.state.descriptor.borrow().last().map(|item| item.id().clone())
    }

    #[must_use]
    pub fn history(&self) -> Vec<Presentation> {
        self.state.history.borrow().clone()
    }

    #[must_use]
    pub fn last_presentation(&self) -> Option<Presentation> {
        self.state.history.borrow().last().cloned()
    }

    #[must_use]
    pub fn events(&self) -> Vec<PresenterEvent> {
        self.state.events.borrow().clone()
    }

    /// Drain the recorded events.
    pub fn take_events(&self) -> Vec<PresenterEvent> {
        std::mem::take(&mut *self.state.events.borrow_mut())
    }

    #[must_use]
    pub fn is_gesture_active(&self) -> bool {
        self.state.gesture.borrow().is_some()
    }

    /// State of the in-flight gesture, if any.
    #[must_use]
    pub fn gesture_state(&self) -> Option<TransitionState> {
        self.state.gesture.borrow().as_ref().map(|t| t.state())
    }
}

impl<V: Clone> HeadlessPresenter<V> {
    /// Simulate the navigation bar's back button.
    ///
    /// Asks the top entry to dismiss itself; the presenter never pops on its
    /// own. Returns `false` when nothing is shown.
    pub fn press_back(&self) -> bool {
        let top = self.state.descriptor.borrow().last().cloned();
        let Some(top) = top else {
            return false;
        };
        self.state.record(PresenterEvent::BackPressed(top.id().clone()));
        top.should_dismiss();
        true
    }

    #[must_use]
    pub fn descriptor(&self) -> NavigationDescriptor<V> {
        self.state.descriptor.borrow().clone()
    }

    #[must_use]
    pub fn views(&self) -> Vec<V> {
        self.state.descriptor.borrow().views()
    }
}

impl<V: Clone + 'static> HeadlessPresenter<V> {
    /// Begin a back swipe.
    ///
    /// Refused when a gesture is already active, when fewer than two entries
    /// are shown, or when the top entry declines. On success the revealed
    /// entry gets `will_appear` and the tracker is started as interactive.
    pub fn begin_back_gesture(&self) -> bool {
        if self.is_gesture_active() {
            return false;
        }
        let descriptor = self.descriptor();
        let (Some(top), Some(revealed)) = (descriptor.last().cloned(), descriptor.revealed().cloned())
        else {
            return false;
        };
        if !top.should_start_interactive() {
            self.state
                .record(PresenterEvent::GestureRefused(top.id().clone()));
            return false;
        }

        let weak = Rc::downgrade(&self.state);
        let mut tracker =
            InteractiveTransitionTracker::new(descriptor, revealed.id().clone(), move |outcome| {
                if let Some(state) = weak.upgrade() {
                    state.settle(outcome);
                }
            })
            .with_trace(self.state.trace_transitions.get());

        let generation = self.state.generation.get();
        self.state.gesture_generation.set(generation);
        self.state.record(PresenterEvent::GestureBegan {
            revealed: revealed.id().clone(),
        });
        self.state.record(PresenterEvent::WillAppear {
            id: revealed.id().clone(),
            animated: true,
        });
        revealed.will_appear(true);
        tracker.start(TransitionContext::gesture());

        if self.state.generation.get() != generation {
            // A hook presented while the gesture was starting.
            tracker.abandon();
            return false;
        }
        *self.state.gesture.borrow_mut() = Some(tracker);
        true
    }

    /// Report that the finger lifted, cancelling or not.
    pub fn update_back_gesture(&self, cancelled: bool) -> bool {
        let taken = self.state.gesture.borrow_mut().take();
        let Some(mut tracker) = taken else {
            return false;
        };
        let accepted = tracker.change(gesture_context(cancelled));
        if self.state.generation.get() != self.state.gesture_generation.get() {
            tracker.abandon();
            return false;
        }
        *self.state.gesture.borrow_mut() = Some(tracker);
        accepted
    }

    /// Finish the back swipe and return how it settled.
    ///
    /// Reports the lift first if [`update_back_gesture`](Self::update_back_gesture)
    /// was not called.
    pub fn finish_back_gesture(&self, cancelled: bool) -> Option<Disposition> {
        let mut tracker = self.state.gesture.borrow_mut().take()?;
        let context = gesture_context(cancelled);
        if tracker.state() == TransitionState::Started {
            tracker.change(context);
        }
        self.state.settlement.set(None);
        tracker.complete(context);
        drop(tracker);
        self.state.settlement.take()
    }
}

fn gesture_context(cancelled: bool) -> TransitionContext {
    if cancelled {
        TransitionContext::gesture() | TransitionContext::CANCELLED
    } else {
        TransitionContext::gesture()
    }
}

impl<V: Clone + 'static> Presenter<V> for HeadlessPresenter<V> {
    fn present(
        &self,
        descriptor: NavigationDescriptor<V>,
        direction: Direction,
        completion: Option<Completion>,
    ) {
        let state = &self.state;
        state.abandon_gesture();
        state.flush_completion();

        let previous_top = state.descriptor.borrow().last().map(|item| item.id().clone());
        let next_top = descriptor.last().cloned();
        state.history.borrow_mut().push(Presentation {
            ids: descriptor.ids(),
            direction,
            with_completion: completion.is_some(),
        });
        debug!(
            message = "headless.present",
            len = descriptor.len(),
            direction = ?direction,
        );
        state.install(descriptor);
        *state.completion.borrow_mut() = completion.map(OnceToken::new);
        state.bump();

        if let Some(top) = next_top
            && previous_top.as_ref() != Some(top.id())
        {
            state.appear(&top, direction.is_animated());
        }
        state.flush_completion();
    }

    fn container_view(&self) -> V {
        self.state.container.clone()
    }
}

impl<V> fmt::Debug for HeadlessPresenter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessPresenter")
            .field("ids", &self.ids())
            .field("presentations", &self.state.history.borrow().len())
            .field("gesture", &self.is_gesture_active())
            .finish()
    }
}
