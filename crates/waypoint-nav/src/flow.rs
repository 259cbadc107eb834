#![forbid(unsafe_code)]

//! Stack participation for flow nodes.
//!
//! Any [`FlowNode`] can sit on a navigation stack. A node that wants to react
//! to presentation and dismissal supplies a [`NavigationFlow`] implementation;
//! a node without one behaves as if every hook kept its default.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;
use waypoint_core::{FlowEvent, FlowId, FlowNode};

use crate::navigator::Navigator;
use crate::stack::StackEntry;

/// Navigation hooks for one flow node. Every method has a default.
///
/// Hooks receive a [`Navigator`] bound to their node so they can navigate in
/// response (push a follow-up, pop themselves). A hook that triggers another
/// hook on the *same* node synchronously will find the second call skipped:
/// the node's hooks are already borrowed, and the default result is used.
pub trait NavigationFlow<E: FlowEvent, V> {
    /// The node is about to become the top entry. Not necessarily balanced
    /// by [`did_present`](Self::did_present): a cancelled back gesture calls
    /// this on the revealed node only.
    fn will_present(&mut self, _navigator: &Navigator<E, V>, _animated: bool) {}

    fn did_present(&mut self, _navigator: &Navigator<E, V>, _animated: bool) {}

    /// Whether the node may be dismissed. For a non-interactive request (back
    /// button) an allowed dismissal pops the node; for an interactive one the
    /// answer gates the gesture.
    fn should_allow_dismiss(&mut self, _navigator: &Navigator<E, V>, _interactive: bool) -> bool {
        true
    }

    fn did_start_interactive_transition(&mut self, _navigator: &Navigator<E, V>) {}

    fn did_change_interactive_transition(&mut self, _navigator: &Navigator<E, V>, _cancelled: bool) {}

    fn did_complete_interactive_transition(
        &mut self,
        _navigator: &Navigator<E, V>,
        _cancelled: bool,
    ) {
    }
}

/// Hooks shared between a [`NavigationNode`] and whoever else drives them.
pub type SharedHooks<E, V> = Rc<RefCell<dyn NavigationFlow<E, V>>>;
pub(crate) type WeakHooks<E, V> = Weak<RefCell<dyn NavigationFlow<E, V>>>;

// ---------------------------------------------------------------------------
// NavigationNode
// ---------------------------------------------------------------------------

/// A flow node plus its optional navigation hooks.
pub struct NavigationNode<E: FlowEvent, V> {
    node: FlowNode<E, V>,
    hooks: Option<SharedHooks<E, V>>,
}

impl<E: FlowEvent, V> Clone for NavigationNode<E, V> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<E: FlowEvent, V> From<FlowNode<E, V>> for NavigationNode<E, V> {
    fn from(node: FlowNode<E, V>) -> Self {
        Self::plain(node)
    }
}

impl<E: FlowEvent, V> From<&FlowNode<E, V>> for NavigationNode<E, V> {
    fn from(node: &FlowNode<E, V>) -> Self {
        Self::plain(node.clone())
    }
}

impl<E: FlowEvent, V> NavigationNode<E, V> {
    /// A node with default hooks.
    pub fn plain(node: FlowNode<E, V>) -> Self {
        Self { node, hooks: None }
    }

    pub fn with_hooks(node: FlowNode<E, V>, hooks: impl NavigationFlow<E, V> + 'static) -> Self {
        Self {
            node,
            hooks: Some(Rc::new(RefCell::new(hooks))),
        }
    }

    /// Share a hooks object the caller keeps a handle to.
    pub fn with_shared_hooks(node: FlowNode<E, V>, hooks: SharedHooks<E, V>) -> Self {
        Self {
            node,
            hooks: Some(hooks),
        }
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> &FlowNode<E, V> {
        &self.node
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &FlowId {
        self.node.id()
    }

    #[must_use]
    pub fn has_hooks(&self) -> bool {
        self.hooks.is_some()
    }

    pub(crate) fn weak_hooks(&self) -> Option<WeakHooks<E, V>> {
        self.hooks.as_ref().map(Rc::downgrade)
    }
}

impl<E: FlowEvent, V> fmt::Debug for NavigationNode<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationNode")
            .field("id", self.node.id())
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Run `f` against the hooks behind `hooks`, or return `default` when there
/// are none, they were released, or they are already running.
pub(crate) fn with_hooks<E: FlowEvent, V, R>(
    hooks: Option<&WeakHooks<E, V>>,
    navigator: &Navigator<E, V>,
    default: R,
    f: impl FnOnce(&mut dyn NavigationFlow<E, V>, &Navigator<E, V>) -> R,
) -> R {
    let Some(hooks) = hooks.and_then(Weak::upgrade) else {
        return default;
    };
    let Ok(mut guard) = hooks.try_borrow_mut() else {
        debug!(message = "nav.hook.reentrant", flow = %navigator.id());
        return default;
    };
    f(&mut *guard, navigator)
}

// ---------------------------------------------------------------------------
// NavigationItem
// ---------------------------------------------------------------------------

/// A node as held by one coordinator's stack.
///
/// A new item holds no claim, so dropping a rejected item touches nothing.
/// Once the item is on the stack the coordinator claims the node for `owner`
/// (unless another live owner already holds it). Dropping an item that made
/// the claim gives it back, which also clears the node's parent link.
pub(crate) struct NavigationItem<E: FlowEvent, V> {
    nav: NavigationNode<E, V>,
    owner: FlowNode<E, V>,
    claimed: Cell<bool>,
}

impl<E: FlowEvent, V> NavigationItem<E, V> {
    pub(crate) fn new(nav: NavigationNode<E, V>, owner: &FlowNode<E, V>) -> Self {
        Self {
            nav,
            owner: owner.clone(),
            claimed: Cell::new(false),
        }
    }

    /// Record that the node was claimed for this item's owner.
    pub(crate) fn mark_claimed(&self) {
        self.claimed.set(true);
    }

    #[cfg(test)]
    fn claim(&self) -> bool {
        let claimed = self.nav.node.claim_owner(&self.owner);
        if claimed {
            self.mark_claimed();
        }
        claimed
    }

    pub(crate) fn nav(&self) -> &NavigationNode<E, V> {
        &self.nav
    }
}

impl<E: FlowEvent, V> StackEntry for NavigationItem<E, V> {
    fn flow_id(&self) -> &FlowId {
        self.nav.id()
    }
}

impl<E: FlowEvent, V> Drop for NavigationItem<E, V> {
    fn drop(&mut self) {
        if self.claimed.get() {
            self.nav.node.release_owner(&self.owner);
        }
    }
}

impl<E: FlowEvent, V> fmt::Debug for NavigationItem<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationItem")
            .field("id", self.nav.id())
            .field("claimed", &self.claimed.get())
            .finish()
    }
}
