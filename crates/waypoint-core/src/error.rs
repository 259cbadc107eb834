#![forbid(unsafe_code)]

//! Errors for flow tree operations.
//!
//! These are the fallible twins of operations whose misuse is a programming
//! error. The panicking entry points (`attach_parent`, `view`) format the same
//! messages.

use thiserror::Error;

use crate::FlowId;

pub type Result<T> = std::result::Result<T, FlowError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("flow node {node} is already attached to parent {parent}")]
    AlreadyAttached { node: FlowId, parent: FlowId },

    #[error("attaching flow node {node} under {parent} would create a cycle")]
    WouldCycle { node: FlowId, parent: FlowId },

    #[error("flow node {0} belongs to a different flow tree")]
    ForeignTree(FlowId),

    #[error("flow node {0} has no view factory; supply one when building the node")]
    NoViewFactory(FlowId),

    #[error("view of flow node {0} requested while it is being built")]
    ViewUnderConstruction(FlowId),

    #[error("flow node {0} has been released")]
    Released(FlowId),
}
