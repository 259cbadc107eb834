#![forbid(unsafe_code)]

//! Core: flow identities, the flow node arena, and upward event bubbling.
//!
//! A flow node decides *what* is shown; its view (built lazily, exactly once)
//! decides *how*. Nodes form a forest through parent links and raise
//! [`FlowEvent`]s that are observed and handled on the way to the root.

pub mod error;
pub mod event;
pub mod id;
pub mod node;
pub mod tree;

pub use error::FlowError;
pub use event::{DispatchOutcome, FlowEvent};
pub use id::FlowId;
pub use node::{Dispatcher, FlowContext, FlowNode, WeakFlowNode};
pub use tree::{FlowTree, NodeBuilder, NodeKey};
