#![forbid(unsafe_code)]

//! Presentation descriptors.
//!
//! A [`NavigationDescriptor`] is an immutable snapshot of the stack taken at
//! the moment of presentation: one [`ItemDescriptor`] per entry, bottom
//! first, each carrying the entry's view and its lifecycle callbacks. It is
//! decoupled from the stack so a presenter can compute speculative edits
//! (dropping the top during a back gesture) without touching the stack.

use std::fmt;
use std::rc::Rc;

use waypoint_core::FlowId;

use crate::transition::TransitionContext;

type Flag = Rc<dyn Fn(bool)>;
type Probe = Rc<dyn Fn() -> bool>;
type Signal = Rc<dyn Fn()>;
type Step = Rc<dyn Fn(TransitionContext)>;

/// Lifecycle bindings for one presented entry.
///
/// Every binding defaults to a no-op; `should_start_interactive` defaults to
/// refusing the gesture.
#[derive(Clone)]
pub struct LifecycleCallbacks {
    will_appear: Flag,
    did_appear: Flag,
    should_dismiss: Signal,
    should_start_interactive: Probe,
    start_interactive: Step,
    change_interactive: Step,
    complete_interactive: Step,
}

impl Default for LifecycleCallbacks {
    fn default() -> Self {
        Self {
            will_appear: Rc::new(|_| {}),
            did_appear: Rc::new(|_| {}),
            should_dismiss: Rc::new(|| {}),
            should_start_interactive: Rc::new(|| false),
            start_interactive: Rc::new(|_| {}),
            change_interactive: Rc::new(|_| {}),
            complete_interactive: Rc::new(|_| {}),
        }
    }
}

impl LifecycleCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_will_appear(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.will_appear = Rc::new(f);
        self
    }

    #[must_use]
    pub fn on_did_appear(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.did_appear = Rc::new(f);
        self
    }

    /// Called for a user-initiated, non-interactive dismissal (a back
    /// button). The presenter must not dismiss on its own.
    #[must_use]
    pub fn on_should_dismiss(mut self, f: impl Fn() + 'static) -> Self {
        self.should_dismiss = Rc::new(f);
        self
    }

    /// Asked before a back gesture may begin.
    #[must_use]
    pub fn on_should_start_interactive(mut self, f: impl Fn() -> bool + 'static) -> Self {
        self.should_start_interactive = Rc::new(f);
        self
    }

    #[must_use]
    pub fn on_start_interactive(mut self, f: impl Fn(TransitionContext) + 'static) -> Self {
        self.start_interactive = Rc::new(f);
        self
    }

    #[must_use]
    pub fn on_change_interactive(mut self, f: impl Fn(TransitionContext) + 'static) -> Self {
        self.change_interactive = Rc::new(f);
        self
    }

    #[must_use]
    pub fn on_complete_interactive(mut self, f: impl Fn(TransitionContext) + 'static) -> Self {
        self.complete_interactive = Rc::new(f);
        self
    }
}

impl fmt::Debug for LifecycleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LifecycleCallbacks { .. }")
    }
}

// ---------------------------------------------------------------------------
// ItemDescriptor
// ---------------------------------------------------------------------------

/// One presented entry: identity, view, and lifecycle bindings.
#[derive(Clone)]
pub struct ItemDescriptor<V> {
    id: FlowId,
    view: V,
    callbacks: LifecycleCallbacks,
}

impl<V> ItemDescriptor<V> {
    pub fn new(id: FlowId, view: V, callbacks: LifecycleCallbacks) -> Self {
        Self {
            id,
            view,
            callbacks,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &FlowId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn will_appear(&self, animated: bool) {
        (self.callbacks.will_appear)(animated);
    }

    pub fn did_appear(&self, animated: bool) {
        (self.callbacks.did_appear)(animated);
    }

    pub fn should_dismiss(&self) {
        (self.callbacks.should_dismiss)();
    }

    #[must_use]
    pub fn should_start_interactive(&self) -> bool {
        (self.callbacks.should_start_interactive)()
    }

    pub fn start_interactive(&self, context: TransitionContext) {
        (self.callbacks.start_interactive)(context);
    }

    pub fn change_interactive(&self, context: TransitionContext) {
        (self.callbacks.change_interactive)(context);
    }

    pub fn complete_interactive(&self, context: TransitionContext) {
        (self.callbacks.complete_interactive)(context);
    }
}

impl<V: fmt::Debug> fmt::Debug for ItemDescriptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemDescriptor")
            .field("id", &self.id)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// NavigationDescriptor
// ---------------------------------------------------------------------------

/// Ordered snapshot handed to a [`Presenter`](crate::Presenter), bottom first.
#[derive(Clone)]
pub struct NavigationDescriptor<V> {
    items: Vec<ItemDescriptor<V>>,
}

impl<V> Default for NavigationDescriptor<V> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<V> FromIterator<ItemDescriptor<V>> for NavigationDescriptor<V> {
    fn from_iter<I: IntoIterator<Item = ItemDescriptor<V>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<V> NavigationDescriptor<V> {
    pub fn new(items: Vec<ItemDescriptor<V>>) -> Self {
        Self { items }
    }

    #[inline]
    #[must_use]
    pub fn items(&self) -> &[ItemDescriptor<V>] {
        &self.items
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<FlowId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Topmost entry.
    #[must_use]
    pub fn last(&self) -> Option<&ItemDescriptor<V>> {
        self.items.last()
    }

    /// Topmost entry with identity `id`.
    #[must_use]
    pub fn item(&self, id: &FlowId) -> Option<&ItemDescriptor<V>> {
        self.items.iter().rev().find(|item| &item.id == id)
    }

    /// Entry directly below the top, which a back navigation would reveal.
    #[must_use]
    pub fn revealed(&self) -> Option<&ItemDescriptor<V>> {
        self.items.len().checked_sub(2).map(|index| &self.items[index])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemDescriptor<V>> {
        self.items.iter()
    }
}

impl<V: Clone> NavigationDescriptor<V> {
    #[must_use]
    pub fn views(&self) -> Vec<V> {
        self.items.iter().map(|item| item.view.clone()).collect()
    }

    /// Copy without the top entry. A single-entry descriptor is returned
    /// unchanged, so the result is never empty unless the input was.
    #[must_use]
    pub fn drop_last(&self) -> Self {
        if self.items.len() > 1 {
            Self {
                items: self.items[..self.items.len() - 1].to_vec(),
            }
        } else {
            self.clone()
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for NavigationDescriptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a NavigationDescriptor<V> {
    type Item = &'a ItemDescriptor<V>;
    type IntoIter = std::slice::Iter<'a, ItemDescriptor<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
