#![forbid(unsafe_code)]

//! Flow tree: an arena of flow nodes with upward event bubbling.
//!
//! # Design
//!
//! Nodes live in a generational arena owned by the tree. A node's parent and
//! owner are stored as [`NodeKey`]s, never as references, so the ownership
//! graph cannot form reference cycles. Public access goes through
//! [`FlowNode`] handles: the arena entry exists exactly as long as at least
//! one handle does, and dropping the last handle frees the slot. Keys that
//! point at a freed slot fail the generation check and read as "no parent".
//!
//! All state sits behind `Rc<RefCell<..>>`, so handles are `!Send` and every
//! call happens on the context that created the tree. Listener closures and
//! view factories are never invoked while the arena is borrowed, which lets
//! them call back into the tree freely.
//!
//! # Invariants
//!
//! 1. A node's parent, once set, stays until explicitly detached or the
//!    parent is released.
//! 2. A view is built at most once per node.
//! 3. Observers never stop propagation; the first handler found on the way
//!    to the root consumes the event.
//! 4. At most one observer and one handler per event kind per node; the
//!    latest registration wins.
//!
//! # Failure Modes
//!
//! - **Handle dropped while the arena is borrowed**: the release is parked in
//!   a graveyard and completed at the start of the next tree operation.
//! - **View factory panics**: the cell stays in the building state and later
//!   requests report [`FlowError::ViewUnderConstruction`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::thread::{self, ThreadId};

use ahash::AHashMap;
use tracing::{debug, trace};

use crate::FlowId;
use crate::error::{FlowError, Result};
use crate::event::{DispatchOutcome, FlowEvent};
use crate::node::{FlowContext, FlowNode, NodeHandle};

// ---------------------------------------------------------------------------
// Keys and entries
// ---------------------------------------------------------------------------

/// Stable arena address of a flow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    index: u32,
    generation: u32,
}

impl NodeKey {
    /// Slot index inside the arena.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this key was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

pub(crate) type Listener<E> = Rc<dyn Fn(&E)>;
pub(crate) type ViewFactory<E, V> = Box<dyn FnOnce(&FlowContext<E, V>) -> V>;

/// One-shot view storage.
pub(crate) enum ViewCell<E: FlowEvent, V> {
    /// No factory was supplied.
    Absent,
    /// Factory waiting for the first `view()` call.
    Pending(ViewFactory<E, V>),
    /// Factory is running.
    Building,
    /// Built and cached.
    Ready(V),
}

pub(crate) struct NodeEntry<E: FlowEvent, V> {
    id: FlowId,
    label: Option<String>,
    parent: Option<NodeKey>,
    owner: Option<NodeKey>,
    view: ViewCell<E, V>,
    observers: AHashMap<E::Kind, Listener<E>>,
    handlers: AHashMap<E::Kind, Listener<E>>,
    handle: Weak<NodeHandle<E, V>>,
}

impl<E: FlowEvent, V> NodeEntry<E, V> {
    fn describe(&self) -> String {
        match &self.label {
            Some(label) => format!("{label} [{}]", self.id),
            None => self.id.to_string(),
        }
    }
}

struct Slot<E: FlowEvent, V> {
    generation: u32,
    entry: Option<NodeEntry<E, V>>,
}

struct Arena<E: FlowEvent, V> {
    slots: Vec<Slot<E, V>>,
    free: Vec<u32>,
    live: usize,
}

impl<E: FlowEvent, V> Arena<E, V> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    fn insert(&mut self, entry: NodeEntry<E, V>) -> NodeKey {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return NodeKey {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NodeKey {
            index,
            generation: 0,
        }
    }

    fn remove(&mut self, key: NodeKey) -> Option<NodeEntry<E, V>> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live -= 1;
        Some(entry)
    }

    fn get(&self, key: NodeKey) -> Option<&NodeEntry<E, V>> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn get_mut(&mut self, key: NodeKey) -> Option<&mut NodeEntry<E, V>> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    fn live_parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key)?.parent.filter(|p| self.get(*p).is_some())
    }

    fn live_owner(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key)?.owner.filter(|o| self.get(*o).is_some())
    }

    fn iter(&self) -> impl Iterator<Item = (NodeKey, &NodeEntry<E, V>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                (
                    NodeKey {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    entry,
                )
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Shared tree state
// ---------------------------------------------------------------------------

pub(crate) struct TreeShared<E: FlowEvent, V> {
    arena: RefCell<Arena<E, V>>,
    graveyard: RefCell<Vec<NodeKey>>,
    context: ThreadId,
}

impl<E: FlowEvent, V> TreeShared<E, V> {
    #[track_caller]
    fn assert_context(&self) {
        assert!(
            thread::current().id() == self.context,
            "flow events must be dispatched on the context that created the flow tree"
        );
    }

    fn insert(
        self: &Rc<Self>,
        id: FlowId,
        label: Option<String>,
        view: ViewCell<E, V>,
    ) -> FlowNode<E, V> {
        self.reap();
        let key = self.arena.borrow_mut().insert(NodeEntry {
            id: id.clone(),
            label,
            parent: None,
            owner: None,
            view,
            observers: AHashMap::new(),
            handlers: AHashMap::new(),
            handle: Weak::new(),
        });
        let handle = Rc::new(NodeHandle {
            key,
            id,
            tree: Rc::clone(self),
        });
        if let Some(entry) = self.arena.borrow_mut().get_mut(key) {
            entry.handle = Rc::downgrade(&handle);
        }
        FlowNode::from_handle(handle)
    }

    /// Free the slot behind `key`. Called when the last handle drops.
    pub(crate) fn release(&self, key: NodeKey) {
        let entry = match self.arena.try_borrow_mut() {
            Ok(mut arena) => arena.remove(key),
            Err(_) => {
                self.graveyard.borrow_mut().push(key);
                return;
            }
        };
        if let Some(entry) = &entry {
            trace!(message = "flow.release", node = %entry.id);
        }
        // Listener closures may own further handles; drop them unborrowed.
        drop(entry);
    }

    fn reap(&self) {
        loop {
            let pending = std::mem::take(&mut *self.graveyard.borrow_mut());
            if pending.is_empty() {
                return;
            }
            for key in pending {
                self.release(key);
            }
        }
    }

    pub(crate) fn label_of(&self, key: NodeKey) -> Option<String> {
        self.arena.borrow().get(key).and_then(|e| e.label.clone())
    }

    pub(crate) fn handle_of(&self, key: NodeKey) -> Option<FlowNode<E, V>> {
        let arena = self.arena.borrow();
        let weak = arena.get(key)?.handle.clone();
        drop(arena);
        weak.upgrade().map(FlowNode::from_handle)
    }

    pub(crate) fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.reap();
        self.arena.borrow().live_parent(key)
    }

    pub(crate) fn attach(&self, key: NodeKey, node_id: &FlowId, parent: NodeKey) -> Result<()> {
        self.reap();
        let mut arena = self.arena.borrow_mut();
        let parent_id = match arena.get(parent) {
            Some(entry) => entry.id.clone(),
            None => return Err(FlowError::Released(node_id.clone())),
        };
        if let Some(existing) = arena.live_parent(key) {
            let existing_id = arena
                .get(existing)
                .map_or_else(|| parent_id.clone(), |e| e.id.clone());
            return Err(FlowError::AlreadyAttached {
                node: node_id.clone(),
                parent: existing_id,
            });
        }
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == key {
                return Err(FlowError::WouldCycle {
                    node: node_id.clone(),
                    parent: parent_id,
                });
            }
            cursor = arena.live_parent(ancestor);
        }
        if let Some(entry) = arena.get_mut(key) {
            entry.parent = Some(parent);
        }
        trace!(message = "flow.attach", node = %node_id, parent = %parent_id);
        Ok(())
    }

    pub(crate) fn detach(&self, key: NodeKey) {
        self.reap();
        if let Some(entry) = self.arena.borrow_mut().get_mut(key) {
            entry.parent = None;
        }
    }

    pub(crate) fn owner_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.reap();
        self.arena.borrow().live_owner(key)
    }

    pub(crate) fn claim_owner(&self, key: NodeKey, owner: NodeKey) -> bool {
        self.reap();
        let mut arena = self.arena.borrow_mut();
        if arena.live_owner(key).is_some() {
            return false;
        }
        match arena.get_mut(key) {
            Some(entry) => {
                entry.owner = Some(owner);
                true
            }
            None => false,
        }
    }

    /// Clear `owner` from `key`. Losing the owner also clears the parent link.
    pub(crate) fn release_owner(&self, key: NodeKey, owner: NodeKey) -> bool {
        self.reap();
        let mut arena = self.arena.borrow_mut();
        match arena.get_mut(key) {
            Some(entry) if entry.owner == Some(owner) => {
                entry.owner = None;
                entry.parent = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_observer(&self, key: NodeKey, kind: E::Kind, listener: Listener<E>) {
        self.reap();
        let previous = self
            .arena
            .borrow_mut()
            .get_mut(key)
            .and_then(|entry| entry.observers.insert(kind, listener));
        drop(previous);
    }

    pub(crate) fn set_handler(&self, key: NodeKey, kind: E::Kind, listener: Listener<E>) {
        self.reap();
        let previous = self
            .arena
            .borrow_mut()
            .get_mut(key)
            .and_then(|entry| entry.handlers.insert(kind, listener));
        drop(previous);
    }

    /// Run the observe → handle → bubble algorithm starting at `start`.
    #[track_caller]
    pub(crate) fn dispatch(&self, start: NodeKey, event: &E) -> DispatchOutcome {
        self.assert_context();
        self.reap();
        let kind = event.kind();
        let mut cursor = Some(start);
        while let Some(key) = cursor {
            let (id, observer, handler) = {
                let arena = self.arena.borrow();
                let Some(entry) = arena.get(key) else {
                    break;
                };
                (
                    entry.id.clone(),
                    entry.observers.get(&kind).cloned(),
                    entry.handlers.get(&kind).cloned(),
                )
            };
            if let Some(observer) = observer {
                observer(event);
            }
            if let Some(handler) = handler {
                handler(event);
                trace!(message = "flow.dispatch", kind = ?kind, handled_by = %id);
                return DispatchOutcome::Handled(id);
            }
            cursor = self.arena.borrow().live_parent(key);
        }
        trace!(message = "flow.dispatch", kind = ?kind, handled_by = "none");
        DispatchOutcome::Unhandled
    }

    pub(crate) fn is_view_loaded(&self, key: NodeKey) -> bool {
        matches!(
            self.arena.borrow().get(key).map(|e| &e.view),
            Some(ViewCell::Ready(_))
        )
    }

    fn chain_keys(&self, key: NodeKey) -> Vec<NodeKey> {
        self.reap();
        let arena = self.arena.borrow();
        let mut chain = Vec::new();
        let mut cursor = arena.get(key).map(|_| key);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = arena.live_parent(current);
        }
        chain
    }

    pub(crate) fn chain(&self, key: NodeKey) -> Vec<FlowId> {
        let keys = self.chain_keys(key);
        let arena = self.arena.borrow();
        keys.into_iter()
            .filter_map(|link| arena.get(link).map(|entry| entry.id.clone()))
            .collect()
    }

    pub(crate) fn dump_chain(&self, key: NodeKey) -> String {
        let keys = self.chain_keys(key);
        let arena = self.arena.borrow();
        let mut out = String::from("Chaining starting from:");
        for link in keys {
            if let Some(entry) = arena.get(link) {
                out.push_str("\n-> ");
                out.push_str(&entry.describe());
            }
        }
        out
    }
}

impl<E: FlowEvent, V: Clone> TreeShared<E, V> {
    pub(crate) fn view(&self, node: &FlowNode<E, V>) -> Result<V> {
        self.reap();
        let key = node.key();
        let factory = {
            let mut arena = self.arena.borrow_mut();
            let Some(entry) = arena.get_mut(key) else {
                return Err(FlowError::Released(node.id().clone()));
            };
            match std::mem::replace(&mut entry.view, ViewCell::Building) {
                ViewCell::Ready(view) => {
                    let out = view.clone();
                    entry.view = ViewCell::Ready(view);
                    return Ok(out);
                }
                ViewCell::Pending(factory) => factory,
                ViewCell::Building => {
                    return Err(FlowError::ViewUnderConstruction(node.id().clone()));
                }
                ViewCell::Absent => {
                    entry.view = ViewCell::Absent;
                    return Err(FlowError::NoViewFactory(node.id().clone()));
                }
            }
        };

        let view = factory(&FlowContext::new(node));

        if let Some(entry) = self.arena.borrow_mut().get_mut(key) {
            entry.view = ViewCell::Ready(view.clone());
        }
        debug!(message = "flow.view_loaded", node = %node.id());
        Ok(view)
    }
}

// ---------------------------------------------------------------------------
// FlowTree
// ---------------------------------------------------------------------------

/// Handle to a flow tree. Cloning shares the same arena.
pub struct FlowTree<E: FlowEvent, V> {
    shared: Rc<TreeShared<E, V>>,
}

impl<E: FlowEvent, V> Clone for FlowTree<E, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<E: FlowEvent, V> fmt::Debug for FlowTree<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowTree").field("len", &self.len()).finish()
    }
}

impl<E: FlowEvent, V> Default for FlowTree<E, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FlowEvent, V> FlowTree<E, V> {
    /// Create an empty tree bound to the current thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(TreeShared {
                arena: RefCell::new(Arena::new()),
                graveyard: RefCell::new(Vec::new()),
                context: thread::current().id(),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<TreeShared<E, V>>) -> Self {
        Self { shared }
    }

    /// Start building a node.
    #[must_use]
    pub fn node(&self) -> NodeBuilder<'_, E, V> {
        NodeBuilder {
            tree: self,
            id: None,
            label: None,
            view: ViewCell::Absent,
        }
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.reap();
        self.shared.arena.borrow().live
    }

    /// Whether the tree has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a live node by identity (linear scan; diagnostics only).
    #[must_use]
    pub fn find(&self, id: &FlowId) -> Option<FlowNode<E, V>> {
        self.shared.reap();
        let key = self
            .shared
            .arena
            .borrow()
            .iter()
            .find(|(_, entry)| &entry.id == id)
            .map(|(key, _)| key)?;
        self.shared.handle_of(key)
    }

    /// Identities of all live nodes in slot order.
    #[must_use]
    pub fn ids(&self) -> Vec<FlowId> {
        self.shared.reap();
        self.shared
            .arena
            .borrow()
            .iter()
            .map(|(_, entry)| entry.id.clone())
            .collect()
    }

    /// Whether two handles refer to the same tree.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

// ---------------------------------------------------------------------------
// NodeBuilder
// ---------------------------------------------------------------------------

/// Builder returned by [`FlowTree::node`].
#[must_use]
pub struct NodeBuilder<'a, E: FlowEvent, V> {
    tree: &'a FlowTree<E, V>,
    id: Option<FlowId>,
    label: Option<String>,
    view: ViewCell<E, V>,
}

impl<'a, E: FlowEvent, V> NodeBuilder<'a, E, V> {
    /// Use an explicit identity instead of a generated one.
    pub fn id(mut self, id: impl Into<FlowId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Human-readable label for chain dumps and logs.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Build the view lazily on first access.
    pub fn view_with(mut self, factory: impl FnOnce(&FlowContext<E, V>) -> V + 'static) -> Self {
        self.view = ViewCell::Pending(Box::new(factory));
        self
    }

    /// Wrap an already constructed view.
    pub fn plain(mut self, view: V) -> Self {
        self.view = ViewCell::Ready(view);
        self
    }

    /// Insert the node into the tree.
    pub fn build(self) -> FlowNode<E, V> {
        let id = self.id.unwrap_or_default();
        self.tree.shared.insert(id, self.label, self.view)
    }
}
