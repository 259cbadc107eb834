#![forbid(unsafe_code)]

//! Ordered, duplicate-free navigation stack with guarded mutation.
//!
//! # Design
//!
//! Every operation computes the whole proposed sequence from the current one
//! and either installs it or leaves the stack exactly as it was. Successful
//! operations hand back the entries they evicted so the caller decides when
//! those are dropped (dropping an entry may run arbitrary release code, which
//! must not happen while the caller holds a borrow of the stack).
//!
//! # Invariants
//!
//! 1. No [`FlowId`] appears twice.
//! 2. A stack that was successfully `set` is never empty afterwards; no
//!    operation can remove the bottom entry.
//! 3. A rejected operation changes nothing.

use waypoint_core::FlowId;

use crate::error::StackRejection;

/// Something that can sit on a [`NavigationStack`].
pub trait StackEntry {
    /// Identity used for duplicate and lookup checks.
    fn flow_id(&self) -> &FlowId;
}

impl StackEntry for FlowId {
    fn flow_id(&self) -> &FlowId {
        self
    }
}

/// Entries removed by a successful operation, bottom to top.
pub type Evicted<T> = Vec<T>;

/// Outcome of a stack operation.
pub type StackResult<T> = Result<Evicted<T>, StackRejection>;

/// Ordered navigation stack, bottom first.
#[derive(Debug, Clone)]
pub struct NavigationStack<T> {
    items: Vec<T>,
}

impl<T> Default for NavigationStack<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: StackEntry> NavigationStack<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn items(&self) -> &[T] {
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
    pub fn top(&self) -> Option<&T> {
        self.items.last()
    }

    #[must_use]
    pub fn position(&self, id: &FlowId) -> Option<usize> {
        self.items.iter().position(|item| item.flow_id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &FlowId) -> bool {
        self.position(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: &FlowId) -> Option<&T> {
        self.position(id).map(|index| &self.items[index])
    }

    #[must_use]
    pub fn ids(&self) -> Vec<FlowId> {
        self.items.iter().map(|item| item.flow_id().clone()).collect()
    }

    /// Replace the whole sequence.
    ///
    /// Rejected when `items` is empty, when any proposed identity is already
    /// on the stack, or when the proposal repeats an identity.
    pub fn set(&mut self, items: Vec<T>) -> StackResult<T> {
        if items.is_empty() {
            return Err(StackRejection::EmptyStack);
        }
        for (index, item) in items.iter().enumerate() {
            let id = item.flow_id();
            if self.contains(id) || items[..index].iter().any(|seen| seen.flow_id() == id) {
                return Err(StackRejection::AlreadyOnStack(id.clone()));
            }
        }
        Ok(std::mem::replace(&mut self.items, items))
    }

    /// Append `item` on top.
    pub fn push(&mut self, item: T) -> StackResult<T> {
        if self.contains(item.flow_id()) {
            return Err(StackRejection::AlreadyOnStack(item.flow_id().clone()));
        }
        self.items.push(item);
        Ok(Vec::new())
    }

    /// Truncate to and including `source`, then append `item`.
    pub fn push_from(&mut self, item: T, source: &FlowId) -> StackResult<T> {
        if self.contains(item.flow_id()) {
            return Err(StackRejection::AlreadyOnStack(item.flow_id().clone()));
        }
        let index = self
            .position(source)
            .ok_or_else(|| StackRejection::SourceNotFound(source.clone()))?;
        let evicted = self.items.split_off(index + 1);
        self.items.push(item);
        Ok(evicted)
    }

    /// Truncate strictly before `target`.
    pub fn pop_from(&mut self, target: &FlowId) -> StackResult<T> {
        let index = self
            .position(target)
            .ok_or_else(|| StackRejection::TargetNotFound(target.clone()))?;
        if index == 0 {
            return Err(StackRejection::WouldEmptyStack(target.clone()));
        }
        Ok(self.items.split_off(index))
    }

    /// Truncate to and including `target`.
    pub fn pop_to(&mut self, target: &FlowId) -> StackResult<T> {
        let index = self
            .position(target)
            .ok_or_else(|| StackRejection::TargetNotFound(target.clone()))?;
        if index + 1 == self.items.len() {
            return Err(StackRejection::AlreadyOnTop(target.clone()));
        }
        Ok(self.items.split_off(index + 1))
    }

    /// Truncate strictly before `old`, then append `new`.
    pub fn replace(&mut self, old: &FlowId, new: T) -> StackResult<T> {
        if self.contains(new.flow_id()) {
            return Err(StackRejection::AlreadyOnStack(new.flow_id().clone()));
        }
        let index = self
            .position(old)
            .ok_or_else(|| StackRejection::SourceNotFound(old.clone()))?;
        let evicted = self.items.split_off(index);
        self.items.push(new);
        Ok(evicted)
    }
}
