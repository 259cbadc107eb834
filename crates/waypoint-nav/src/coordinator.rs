#![forbid(unsafe_code)]

//! Stack coordinator.
//!
//! # Design
//!
//! A [`StackCoordinator`] owns the authoritative [`NavigationStack`] and is
//! the only thing that mutates it. Each operation runs in four steps:
//!
//! 1. validate and apply the mutation on the stack (all or nothing),
//! 2. drop the evicted entries, which releases their ownership and parent
//!    links,
//! 3. chain parents for the newly inserted nodes,
//! 4. build a [`NavigationDescriptor`] and hand it to the [`Presenter`].
//!
//! No borrow of the stack is held across steps 2-4: dropping entries, building
//! views, and presenting all run user code that may navigate again.
//!
//! Descriptor callbacks hold the coordinator, the node, and its hooks weakly,
//! so a presenter that outlives them reaches nothing.
//!
//! # Invariants
//!
//! 1. Every node on the stack is owned by the coordinator's own node.
//! 2. A rejected operation leaves the stack, parent links, and presenter
//!    untouched; its completion is dropped without running.
//! 3. While an interactive transition is pending, programmatic operations
//!    obey [`PendingInteractivePolicy`]; the gesture's own commit is never
//!    blocked.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};
use waypoint_core::{FlowEvent, FlowId, FlowNode, FlowTree, WeakFlowNode};

use crate::config::{NavigationConfig, PendingInteractivePolicy};
use crate::descriptor::{ItemDescriptor, LifecycleCallbacks, NavigationDescriptor};
use crate::error::StackRejection;
use crate::flow::{NavigationFlow, NavigationItem, NavigationNode, WeakHooks, with_hooks};
use crate::navigator::Navigator;
use crate::presenter::{Completion, Direction, PresentOptions, Presenter};
use crate::stack::{Evicted, NavigationStack, StackResult};
use crate::transition::TransitionContext;

type Stack<E, V> = NavigationStack<NavigationItem<E, V>>;

struct CoordinatorShared<E: FlowEvent, V> {
    stack: RefCell<Stack<E, V>>,
    node: FlowNode<E, V>,
    presenter: Rc<dyn Presenter<V>>,
    pending: RefCell<Option<FlowId>>,
    config: NavigationConfig,
}

/// Drives one navigation stack and its presenter.
///
/// Cloning shares the same coordinator.
pub struct StackCoordinator<E: FlowEvent, V> {
    shared: Rc<CoordinatorShared<E, V>>,
}

impl<E: FlowEvent, V> Clone for StackCoordinator<E, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<E: FlowEvent, V> fmt::Debug for StackCoordinator<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackCoordinator")
            .field("node", self.shared.node.id())
            .field("stack", &self.shared.stack.borrow().ids())
            .field("pending", &*self.shared.pending.borrow())
            .finish()
    }
}

/// Non-owning handle to a [`StackCoordinator`].
pub struct WeakStackCoordinator<E: FlowEvent, V> {
    shared: Weak<CoordinatorShared<E, V>>,
}

impl<E: FlowEvent, V> Clone for WeakStackCoordinator<E, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<E: FlowEvent, V> WeakStackCoordinator<E, V> {
    #[must_use]
    pub fn upgrade(&self) -> Option<StackCoordinator<E, V>> {
        self.shared.upgrade().map(|shared| StackCoordinator { shared })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl<E: FlowEvent, V> fmt::Debug for WeakStackCoordinator<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStackCoordinator")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Construction and reads
// ---------------------------------------------------------------------------

impl<E: FlowEvent, V: Clone + 'static> StackCoordinator<E, V> {
    /// Create a coordinator whose own node lives in `tree` and shows the
    /// presenter's container view.
    pub fn new(tree: &FlowTree<E, V>, presenter: Rc<dyn Presenter<V>>) -> Self {
        Self::with_config(tree, presenter, NavigationConfig::default())
    }

    pub fn with_config(
        tree: &FlowTree<E, V>,
        presenter: Rc<dyn Presenter<V>>,
        config: NavigationConfig,
    ) -> Self {
        let node = tree
            .node()
            .label("navigation-stack")
            .plain(presenter.container_view())
            .build();
        debug!(message = "nav.coordinator.new", node = %node.id(), ?config);
        Self {
            shared: Rc::new(CoordinatorShared {
                stack: RefCell::new(NavigationStack::new()),
                node,
                presenter,
                pending: RefCell::new(None),
                config,
            }),
        }
    }
}

impl<E: FlowEvent, V> StackCoordinator<E, V> {
    /// The coordinator's own flow node. Its view is the presenter's
    /// container; attach it under a parent to nest this stack.
    #[inline]
    #[must_use]
    pub fn node(&self) -> &FlowNode<E, V> {
        &self.shared.node
    }

    #[must_use]
    pub fn config(&self) -> &NavigationConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn presenter(&self) -> &Rc<dyn Presenter<V>> {
        &self.shared.presenter
    }

    /// Stack identities, bottom first.
    #[must_use]
    pub fn ids(&self) -> Vec<FlowId> {
        self.shared.stack.borrow().ids()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.stack.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.stack.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &FlowId) -> bool {
        self.shared.stack.borrow().contains(id)
    }

    /// Node on top of the stack.
    #[must_use]
    pub fn top(&self) -> Option<FlowNode<E, V>> {
        self.shared.top()
    }

    /// Node on the stack with identity `id`.
    #[must_use]
    pub fn get(&self, id: &FlowId) -> Option<FlowNode<E, V>> {
        self.shared
            .stack
            .borrow()
            .get(id)
            .map(|item| item.nav().node().clone())
    }

    /// Whether a back gesture has started but not completed.
    #[must_use]
    pub fn is_transition_pending(&self) -> bool {
        self.shared.pending.borrow().is_some()
    }

    /// Identity of the entry a pending back gesture would reveal.
    #[must_use]
    pub fn pending_transition(&self) -> Option<FlowId> {
        self.shared.pending.borrow().clone()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakStackCoordinator<E, V> {
        WeakStackCoordinator {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Navigator bound to `node` on this coordinator.
    #[must_use]
    pub fn navigator(&self, node: &FlowNode<E, V>) -> Navigator<E, V> {
        Navigator::new(self.downgrade(), node.downgrade())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl<E: FlowEvent, V: Clone + 'static> StackCoordinator<E, V> {
    /// Replace the whole stack with `nodes`, chained bottom-up under the
    /// coordinator.
    pub fn set<I, N>(&self, nodes: I, options: PresentOptions) -> Result<(), StackRejection>
    where
        I: IntoIterator<Item = N>,
        N: Into<NavigationNode<E, V>>,
    {
        let shared = &self.shared;
        let navs: Vec<NavigationNode<E, V>> = nodes.into_iter().map(Into::into).collect();
        shared.check_pending("set")?;
        let items: Vec<NavigationItem<E, V>> = navs.iter().map(|nav| shared.item(nav)).collect();
        let evicted = shared.apply("set", |stack| stack.set(items))?;
        for nav in &navs {
            shared.claim(nav);
        }
        drop(evicted);

        let mut parent = shared.node.clone();
        for nav in &navs {
            nav.node().attach_parent(&parent);
            parent = nav.node().clone();
        }
        debug!(message = "nav.set", len = navs.len(), top = %parent.id());
        shared.present(Direction::forward(options.animated), options.completion);
        Ok(())
    }

    /// Push `node` on top; its parent is the previous top (or the
    /// coordinator when the stack was empty).
    pub fn push(
        &self,
        node: impl Into<NavigationNode<E, V>>,
        options: PresentOptions,
    ) -> Result<(), StackRejection> {
        let shared = &self.shared;
        let nav = node.into();
        shared.check_pending("push")?;
        let parent = shared.top().unwrap_or_else(|| shared.node.clone());
        let item = shared.item(&nav);
        let evicted = shared.apply("push", |stack| stack.push(item))?;
        shared.claim(&nav);
        drop(evicted);

        nav.node().attach_parent(&parent);
        debug!(message = "nav.push", flow = %nav.id(), from = %parent.id(), len = self.len());
        shared.present(Direction::forward(options.animated), options.completion);
        Ok(())
    }

    /// Push `node` directly above `source`, discarding everything that was
    /// above `source`.
    pub fn push_from(
        &self,
        node: impl Into<NavigationNode<E, V>>,
        source: &FlowId,
        options: PresentOptions,
    ) -> Result<(), StackRejection> {
        let shared = &self.shared;
        let nav = node.into();
        shared.check_pending("push_from")?;
        let parent = self.get(source);
        let item = shared.item(&nav);
        let evicted = shared.apply("push_from", |stack| stack.push_from(item, source))?;
        shared.claim(&nav);
        let discarded = evicted.len();
        drop(evicted);

        let parent = parent.unwrap_or_else(|| shared.node.clone());
        nav.node().attach_parent(&parent);
        debug!(
            message = "nav.push_from",
            flow = %nav.id(),
            from = %source,
            discarded,
            len = self.len(),
        );
        shared.present(Direction::forward(options.animated), options.completion);
        Ok(())
    }

    /// Pop `target` and everything above it.
    pub fn pop_from(&self, target: &FlowId, options: PresentOptions) -> Result<(), StackRejection> {
        let shared = &self.shared;
        shared.check_pending("pop_from")?;
        let evicted = shared.apply("pop_from", |stack| stack.pop_from(target))?;
        let popped = evicted.len();
        drop(evicted);

        debug!(message = "nav.pop_from", flow = %target, popped, len = self.len());
        shared.present(Direction::backward(options.animated), options.completion);
        Ok(())
    }

    /// Pop everything above `target`.
    pub fn pop_to(&self, target: &FlowId, options: PresentOptions) -> Result<(), StackRejection> {
        let shared = &self.shared;
        shared.check_pending("pop_to")?;
        let evicted = shared.apply("pop_to", |stack| stack.pop_to(target))?;
        let popped = evicted.len();
        drop(evicted);

        debug!(message = "nav.pop_to", flow = %target, popped, len = self.len());
        shared.present(Direction::backward(options.animated), options.completion);
        Ok(())
    }

    /// Replace `old` and everything above it with `new`, animating forward.
    pub fn replace_forward(
        &self,
        old: &FlowId,
        new: impl Into<NavigationNode<E, V>>,
        options: PresentOptions,
    ) -> Result<(), StackRejection> {
        self.replace("replace_forward", old, new.into(), options, Direction::forward)
    }

    /// Replace `old` and everything above it with `new`, animating backward.
    pub fn replace_backward(
        &self,
        old: &FlowId,
        new: impl Into<NavigationNode<E, V>>,
        options: PresentOptions,
    ) -> Result<(), StackRejection> {
        self.replace("replace_backward", old, new.into(), options, Direction::backward)
    }

    fn replace(
        &self,
        op: &'static str,
        old: &FlowId,
        nav: NavigationNode<E, V>,
        options: PresentOptions,
        direction: fn(bool) -> Direction,
    ) -> Result<(), StackRejection> {
        let shared = &self.shared;
        shared.check_pending(op)?;
        // The old node loses its parent once evicted; take it first.
        let parent = self.get(old).and_then(|node| node.parent());
        let item = shared.item(&nav);
        let evicted = shared.apply(op, |stack| stack.replace(old, item))?;
        shared.claim(&nav);
        drop(evicted);

        let parent = parent.unwrap_or_else(|| shared.node.clone());
        nav.node().attach_parent(&parent);
        debug!(message = "nav.replace", op, old = %old, new = %nav.id(), len = self.len());
        shared.present(direction(options.animated), options.completion);
        Ok(())
    }

    /// Snapshot of the current stack as a descriptor.
    ///
    /// # Panics
    ///
    /// Panics if a node on the stack was built without a view factory.
    #[must_use]
    pub fn descriptor(&self) -> NavigationDescriptor<V> {
        self.shared.descriptor()
    }
}

// ---------------------------------------------------------------------------
// Shared internals
// ---------------------------------------------------------------------------

impl<E: FlowEvent, V> CoordinatorShared<E, V> {
    fn top(&self) -> Option<FlowNode<E, V>> {
        self.stack.borrow().top().map(|item| item.nav().node().clone())
    }

    /// Unclaimed entry for `nav`; see [`claim`](Self::claim).
    fn item(&self, nav: &NavigationNode<E, V>) -> NavigationItem<E, V> {
        NavigationItem::new(nav.clone(), &self.node)
    }

    /// Take ownership of `nav` after its entry was accepted onto the stack.
    /// Runs before any evicted entry is dropped.
    fn claim(&self, nav: &NavigationNode<E, V>) {
        if !nav.node().claim_owner(&self.node) {
            return;
        }
        let marked = self.stack.borrow().get(nav.id()).map(NavigationItem::mark_claimed);
        if marked.is_none() {
            nav.node().release_owner(&self.node);
        }
    }

    fn reject(&self, op: &'static str, rejection: StackRejection) -> StackRejection {
        if self.config.log_rejections {
            warn!(
                message = "nav.rejected",
                op,
                reason = rejection.reason(),
                guard = rejection.is_guard(),
                detail = %rejection,
            );
        }
        rejection
    }

    fn check_pending(&self, op: &'static str) -> Result<(), StackRejection> {
        if self.config.pending_policy == PendingInteractivePolicy::Allow {
            return Ok(());
        }
        match self.pending.borrow().clone() {
            Some(revealed) => Err(self.reject(op, StackRejection::TransitionInFlight(revealed))),
            None => Ok(()),
        }
    }

    /// Run `op` against the stack. A rejected entry is dropped while the
    /// stack is still borrowed; it holds no claim, and callers keep their own
    /// handle to the node, so that drop changes nothing.
    fn apply(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Stack<E, V>) -> StackResult<NavigationItem<E, V>>,
    ) -> Result<Evicted<NavigationItem<E, V>>, StackRejection> {
        let result = f(&mut self.stack.borrow_mut());
        result.map_err(|rejection| self.reject(op, rejection))
    }

    fn begin_interactive(&self, revealed: &FlowId) {
        debug!(message = "nav.interactive.begin", revealed = %revealed);
        *self.pending.borrow_mut() = Some(revealed.clone());
    }

    /// Clear the pending flag and, unless cancelled, pop down to `revealed`
    /// without presenting: the presenter already shows that state.
    fn end_interactive(&self, revealed: &FlowId, cancelled: bool) {
        self.pending.borrow_mut().take();
        if cancelled {
            debug!(message = "nav.interactive.cancelled", revealed = %revealed);
            return;
        }
        if let Ok(evicted) = self.apply("interactive_commit", |stack| stack.pop_to(revealed)) {
            let popped = evicted.len();
            drop(evicted);
            debug!(
                message = "nav.interactive.commit",
                revealed = %revealed,
                popped,
                len = self.stack.borrow().len(),
            );
        }
    }
}

impl<E: FlowEvent, V: Clone + 'static> CoordinatorShared<E, V> {
    fn present(self: &Rc<Self>, direction: Direction, completion: Option<Completion>) {
        let descriptor = self.descriptor();
        self.presenter.present(descriptor, direction, completion);
    }

    fn descriptor(self: &Rc<Self>) -> NavigationDescriptor<V> {
        let navs: Vec<NavigationNode<E, V>> = self
            .stack
            .borrow()
            .items()
            .iter()
            .map(|item| item.nav().clone())
            .collect();
        navs.iter()
            .map(|nav| {
                let view = nav.node().view();
                ItemDescriptor::new(nav.id().clone(), view, self.callbacks(nav))
            })
            .collect()
    }

    fn callbacks(self: &Rc<Self>, nav: &NavigationNode<E, V>) -> LifecycleCallbacks {
        let binding = Binding {
            coordinator: Rc::downgrade(self),
            node: nav.node().downgrade(),
            hooks: nav.weak_hooks(),
        };

        let will_appear = binding.clone();
        let did_appear = binding.clone();
        let should_dismiss = binding.clone();
        let should_start = binding.clone();
        let start = binding.clone();
        let change = binding.clone();
        let complete = binding;

        LifecycleCallbacks::new()
            .on_will_appear(move |animated| {
                will_appear.call((), |hooks, nav| hooks.will_present(nav, animated));
            })
            .on_did_appear(move |animated| {
                did_appear.call((), |hooks, nav| hooks.did_present(nav, animated));
            })
            .on_should_dismiss(move || {
                if !should_dismiss.node.is_alive() {
                    return;
                }
                let allowed =
                    should_dismiss.call(true, |hooks, nav| hooks.should_allow_dismiss(nav, false));
                if allowed {
                    // Rejections are already logged by the coordinator.
                    let _ = should_dismiss
                        .navigator()
                        .pop_to_previous(PresentOptions::animated());
                }
            })
            .on_should_start_interactive(move || {
                should_start.node.is_alive()
                    && should_start.call(true, |hooks, nav| hooks.should_allow_dismiss(nav, true))
            })
            .on_start_interactive(move |_context: TransitionContext| {
                if let Some(shared) = start.coordinator.upgrade() {
                    shared.begin_interactive(start.node.id());
                }
                start.call((), |hooks, nav| hooks.did_start_interactive_transition(nav));
            })
            .on_change_interactive(move |context: TransitionContext| {
                change.call((), |hooks, nav| {
                    hooks.did_change_interactive_transition(nav, context.is_cancelled());
                });
            })
            .on_complete_interactive(move |context: TransitionContext| {
                let cancelled = context.is_cancelled();
                if complete.node.is_alive()
                    && let Some(shared) = complete.coordinator.upgrade()
                {
                    shared.end_interactive(complete.node.id(), cancelled);
                }
                complete.call((), |hooks, nav| {
                    hooks.did_complete_interactive_transition(nav, cancelled);
                });
            })
    }
}

/// What one descriptor entry's callbacks close over.
struct Binding<E: FlowEvent, V> {
    coordinator: Weak<CoordinatorShared<E, V>>,
    node: WeakFlowNode<E, V>,
    hooks: Option<WeakHooks<E, V>>,
}

impl<E: FlowEvent, V> Clone for Binding<E, V> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Weak::clone(&self.coordinator),
            node: self.node.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<E: FlowEvent, V> Binding<E, V> {
    fn navigator(&self) -> Navigator<E, V> {
        Navigator::new(
            WeakStackCoordinator {
                shared: Weak::clone(&self.coordinator),
            },
            self.node.clone(),
        )
    }

    /// Invoke a hook if the node is still alive; otherwise return `default`.
    fn call<R>(
        &self,
        default: R,
        f: impl FnOnce(&mut dyn NavigationFlow<E, V>, &Navigator<E, V>) -> R,
    ) -> R {
        if !self.node.is_alive() {
            return default;
        }
        with_hooks(self.hooks.as_ref(), &self.navigator(), default, f)
    }
}
