#![forbid(unsafe_code)]

//! Flow node handles.
//!
//! A [`FlowNode`] is a reference-counted handle to one arena entry. Clones
//! share the count; when the last clone drops, the entry is removed from the
//! tree. [`WeakFlowNode`] and [`Dispatcher`] observe a node without keeping it
//! alive, which is what descriptor callbacks and view closures should hold.

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::FlowId;
use crate::error::{FlowError, Result};
use crate::event::{DispatchOutcome, FlowEvent};
use crate::tree::{FlowTree, NodeKey, TreeShared};

pub(crate) struct NodeHandle<E: FlowEvent, V> {
    pub(crate) key: NodeKey,
    pub(crate) id: FlowId,
    pub(crate) tree: Rc<TreeShared<E, V>>,
}

impl<E: FlowEvent, V> Drop for NodeHandle<E, V> {
    fn drop(&mut self) {
        self.tree.release(self.key);
    }
}

// ---------------------------------------------------------------------------
// FlowNode
// ---------------------------------------------------------------------------

/// Strong handle to a node of a [`FlowTree`].
pub struct FlowNode<E: FlowEvent, V> {
    handle: Rc<NodeHandle<E, V>>,
}

impl<E: FlowEvent, V> Clone for FlowNode<E, V> {
    fn clone(&self) -> Self {
        Self {
            handle: Rc::clone(&self.handle),
        }
    }
}

impl<E: FlowEvent, V> PartialEq for FlowNode<E, V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }
}

impl<E: FlowEvent, V> Eq for FlowNode<E, V> {}

impl<E: FlowEvent, V> fmt::Debug for FlowNode<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowNode")
            .field("id", &self.handle.id)
            .field("label", &self.label())
            .finish()
    }
}

impl<E: FlowEvent, V> FlowNode<E, V> {
    pub(crate) fn from_handle(handle: Rc<NodeHandle<E, V>>) -> Self {
        Self { handle }
    }

    /// Identity of this node.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FlowId {
        &self.handle.id
    }

    /// Arena address of this node.
    #[inline]
    #[must_use]
    pub fn key(&self) -> NodeKey {
        self.handle.key
    }

    /// Debug label, if one was given at construction.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.handle.tree.label_of(self.handle.key)
    }

    /// The tree this node lives in.
    #[must_use]
    pub fn tree(&self) -> FlowTree<E, V> {
        FlowTree::from_shared(Rc::clone(&self.handle.tree))
    }

    /// Non-owning handle to this node.
    #[must_use]
    pub fn downgrade(&self) -> WeakFlowNode<E, V> {
        WeakFlowNode {
            handle: Rc::downgrade(&self.handle),
            id: self.handle.id.clone(),
        }
    }

    /// Current parent, if attached and still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let tree = &self.handle.tree;
        tree.parent_of(self.handle.key)
            .and_then(|key| tree.handle_of(key))
    }

    /// Attach this node under `parent`.
    ///
    /// # Panics
    ///
    /// Attaching a node that already has a live parent, attaching across
    /// trees, or attaching under a descendant is a programming error.
    #[track_caller]
    pub fn attach_parent(&self, parent: &Self) {
        if let Err(err) = self.try_attach_parent(parent) {
            panic!("unable to attach flow node: {err}");
        }
    }

    /// Fallible form of [`attach_parent`](Self::attach_parent).
    pub fn try_attach_parent(&self, parent: &Self) -> Result<()> {
        if !Rc::ptr_eq(&self.handle.tree, &parent.handle.tree) {
            return Err(FlowError::ForeignTree(self.handle.id.clone()));
        }
        self.handle
            .tree
            .attach(self.handle.key, &self.handle.id, parent.handle.key)
    }

    /// Clear the parent link unconditionally.
    pub fn detach_parent(&self) {
        self.handle.tree.detach(self.handle.key);
    }

    /// The node (usually a stack coordinator) that currently owns this one.
    #[must_use]
    pub fn owner(&self) -> Option<Self> {
        let tree = &self.handle.tree;
        tree.owner_of(self.handle.key)
            .and_then(|key| tree.handle_of(key))
    }

    /// Whether `owner` currently owns this node.
    #[must_use]
    pub fn is_owned_by(&self, owner: &Self) -> bool {
        self.handle.tree.owner_of(self.handle.key) == Some(owner.handle.key)
    }

    /// Record `owner` as the owner if no live owner is set.
    ///
    /// Returns `true` when this call established the ownership.
    pub fn claim_owner(&self, owner: &Self) -> bool {
        self.handle.tree.claim_owner(self.handle.key, owner.handle.key)
    }

    /// Drop ownership held by `owner`, detaching the parent link as well.
    ///
    /// Returns `false` (and changes nothing) when `owner` is not the owner.
    pub fn release_owner(&self, owner: &Self) -> bool {
        self.handle
            .tree
            .release_owner(self.handle.key, owner.handle.key)
    }

    /// Register a non-terminating listener for `kind`.
    pub fn observe(&self, kind: E::Kind, observer: impl Fn(&E) + 'static) {
        self.handle
            .tree
            .set_observer(self.handle.key, kind, Rc::new(observer));
    }

    /// Register the terminating listener for `kind`.
    pub fn handle(&self, kind: E::Kind, handler: impl Fn(&E) + 'static) {
        self.handle
            .tree
            .set_handler(self.handle.key, kind, Rc::new(handler));
    }

    /// Dispatch `event` starting at this node.
    ///
    /// # Panics
    ///
    /// Panics when called off the context that created the tree.
    #[track_caller]
    pub fn dispatch(&self, event: E) -> DispatchOutcome {
        self.handle.tree.dispatch(self.handle.key, &event)
    }

    /// Weak dispatch entry point bound to this node.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher<E, V> {
        Dispatcher {
            node: self.downgrade(),
        }
    }

    /// Whether the lazy view has been built.
    #[must_use]
    pub fn is_view_loaded(&self) -> bool {
        self.handle.tree.is_view_loaded(self.handle.key)
    }

    /// Identities from this node up to the root.
    #[must_use]
    pub fn chain(&self) -> Vec<FlowId> {
        self.handle.tree.chain(self.handle.key)
    }

    /// Render the parent chain for diagnostics and log it at debug level.
    pub fn dump_chain(&self) -> String {
        let dump = self.handle.tree.dump_chain(self.handle.key);
        debug!(message = "flow.chain", node = %self.handle.id, chain = %dump);
        dump
    }
}

impl<E: FlowEvent, V: Clone> FlowNode<E, V> {
    /// The node's view, built on first access and cached afterwards.
    ///
    /// # Panics
    ///
    /// Panics when the node was built without a view factory, or when the
    /// view is requested again from inside its own factory.
    #[track_caller]
    pub fn view(&self) -> V {
        match self.try_view() {
            Ok(view) => view,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`view`](Self::view).
    pub fn try_view(&self) -> Result<V> {
        self.handle.tree.view(self)
    }
}

// ---------------------------------------------------------------------------
// WeakFlowNode
// ---------------------------------------------------------------------------

/// Non-owning handle to a flow node.
pub struct WeakFlowNode<E: FlowEvent, V> {
    handle: Weak<NodeHandle<E, V>>,
    id: FlowId,
}

impl<E: FlowEvent, V> Clone for WeakFlowNode<E, V> {
    fn clone(&self) -> Self {
        Self {
            handle: Weak::clone(&self.handle),
            id: self.id.clone(),
        }
    }
}

impl<E: FlowEvent, V> fmt::Debug for WeakFlowNode<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakFlowNode")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<E: FlowEvent, V> WeakFlowNode<E, V> {
    /// Identity of the node, available even after release.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FlowId {
        &self.id
    }

    /// Upgrade to a strong handle if the node is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<FlowNode<E, V>> {
        self.handle.upgrade().map(FlowNode::from_handle)
    }

    /// Whether the node is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.handle.strong_count() > 0
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Cloneable event entry point bound weakly to one node.
///
/// Hand this to views so they can raise flow events without owning the
/// node. Once the node is released, dispatch is a silent no-op.
pub struct Dispatcher<E: FlowEvent, V> {
    node: WeakFlowNode<E, V>,
}

impl<E: FlowEvent, V> Clone for Dispatcher<E, V> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<E: FlowEvent, V> fmt::Debug for Dispatcher<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("node", &self.node).finish()
    }
}

impl<E: FlowEvent, V> Dispatcher<E, V> {
    /// Dispatch `event` from the bound node.
    #[track_caller]
    pub fn dispatch(&self, event: E) -> DispatchOutcome {
        match self.node.upgrade() {
            Some(node) => node.dispatch(event),
            None => DispatchOutcome::Unhandled,
        }
    }

    /// Identity of the bound node.
    #[must_use]
    pub fn target(&self) -> &FlowId {
        self.node.id()
    }
}

// ---------------------------------------------------------------------------
// FlowContext
// ---------------------------------------------------------------------------

/// Context handed to a view factory.
pub struct FlowContext<E: FlowEvent, V> {
    node: WeakFlowNode<E, V>,
    tree: FlowTree<E, V>,
}

impl<E: FlowEvent, V> FlowContext<E, V> {
    pub(crate) fn new(node: &FlowNode<E, V>) -> Self {
        Self {
            node: node.downgrade(),
            tree: node.tree(),
        }
    }

    /// Identity of the node whose view is being built.
    #[must_use]
    pub fn id(&self) -> &FlowId {
        self.node.id()
    }

    /// The node whose view is being built.
    #[must_use]
    pub fn node(&self) -> Option<FlowNode<E, V>> {
        self.node.upgrade()
    }

    /// Dispatcher bound to the node, for wiring view actions to flow events.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher<E, V> {
        Dispatcher {
            node: self.node.clone(),
        }
    }

    /// The owning tree.
    #[must_use]
    pub fn tree(&self) -> &FlowTree<E, V> {
        &self.tree
    }
}
