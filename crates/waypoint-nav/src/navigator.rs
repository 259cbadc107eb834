#![forbid(unsafe_code)]

//! Node-initiated navigation.
//!
//! A [`Navigator`] binds one flow node to the coordinator whose stack holds
//! it. Hooks receive one; application code can get one from
//! [`StackCoordinator::navigator`]. It holds both sides weakly and reports
//! [`StackRejection::Detached`] once either is gone or the node has left the
//! coordinator's stack.

use std::fmt;

use waypoint_core::{FlowEvent, FlowId, FlowNode, WeakFlowNode};

use crate::coordinator::{StackCoordinator, WeakStackCoordinator};
use crate::error::StackRejection;
use crate::flow::NavigationNode;
use crate::presenter::{Completion, PresentOptions};

/// How [`Navigator::replace`] animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceAnimation {
    /// Animate as a forward push.
    #[default]
    Push,
    /// Animate as a backward pop.
    Pop,
    /// No animation.
    None,
}

pub struct Navigator<E: FlowEvent, V> {
    coordinator: WeakStackCoordinator<E, V>,
    node: WeakFlowNode<E, V>,
}

impl<E: FlowEvent, V> Clone for Navigator<E, V> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            node: self.node.clone(),
        }
    }
}

impl<E: FlowEvent, V> fmt::Debug for Navigator<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("node", self.node.id())
            .field("coordinator_alive", &self.coordinator.is_alive())
            .finish()
    }
}

impl<E: FlowEvent, V> Navigator<E, V> {
    pub(crate) fn new(coordinator: WeakStackCoordinator<E, V>, node: WeakFlowNode<E, V>) -> Self {
        Self { coordinator, node }
    }

    /// Identity of the bound node.
    #[must_use]
    pub fn id(&self) -> &FlowId {
        self.node.id()
    }

    #[must_use]
    pub fn node(&self) -> Option<FlowNode<E, V>> {
        self.node.upgrade()
    }
}

impl<E: FlowEvent, V: Clone + 'static> Navigator<E, V> {
    #[must_use]
    pub fn coordinator(&self) -> Option<StackCoordinator<E, V>> {
        self.coordinator.upgrade()
    }

    /// Whether the node is still on its coordinator's stack.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.resolve().is_ok()
    }

    fn resolve(&self) -> Result<StackCoordinator<E, V>, StackRejection> {
        let coordinator = self.coordinator.upgrade().ok_or(StackRejection::Detached)?;
        let node = self.node.upgrade().ok_or(StackRejection::Detached)?;
        if !node.is_owned_by(coordinator.node()) {
            return Err(StackRejection::Detached);
        }
        Ok(coordinator)
    }

    /// Push `next` on top of this node, discarding anything above it.
    pub fn push(
        &self,
        next: impl Into<NavigationNode<E, V>>,
        options: PresentOptions,
    ) -> Result<(), StackRejection> {
        self.resolve()?.push_from(next, self.node.id(), options)
    }

    /// Pop this node and everything above it.
    pub fn pop_to_previous(&self, options: PresentOptions) -> Result<(), StackRejection> {
        self.resolve()?.pop_from(self.node.id(), options)
    }

    /// Pop everything above this node.
    pub fn pop_to_current(&self, options: PresentOptions) -> Result<(), StackRejection> {
        self.resolve()?.pop_to(self.node.id(), options)
    }

    /// Replace this node (and everything above it) with `with`.
    pub fn replace(
        &self,
        with: impl Into<NavigationNode<E, V>>,
        animation: ReplaceAnimation,
        completion: Option<Completion>,
    ) -> Result<(), StackRejection> {
        let coordinator = self.resolve()?;
        let id = self.node.id();
        match animation {
            ReplaceAnimation::Push => coordinator.replace_forward(
                id,
                with,
                PresentOptions {
                    animated: true,
                    completion,
                },
            ),
            ReplaceAnimation::Pop => coordinator.replace_backward(
                id,
                with,
                PresentOptions {
                    animated: true,
                    completion,
                },
            ),
            ReplaceAnimation::None => coordinator.replace_forward(
                id,
                with,
                PresentOptions {
                    animated: false,
                    completion,
                },
            ),
        }
    }
}
