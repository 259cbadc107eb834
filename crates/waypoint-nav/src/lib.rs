#![forbid(unsafe_code)]

//! Navigation: stack reconciliation, the stack coordinator, and interactive
//! transitions.
//!
//! # Role in Waypoint
//! `waypoint-nav` decides *which* flow nodes are on screen and in what order.
//! It never renders; a [`Presenter`] receives [`NavigationDescriptor`]
//! snapshots and reports lifecycle events back.
//!
//! # Primary responsibilities
//! - **NavigationStack**: duplicate-free ordered stack whose operations either
//!   fully apply or return a typed [`StackRejection`].
//! - **StackCoordinator**: applies operations, chains parent links so events
//!   bubble from a screen to the screen that pushed it, and presents.
//! - **InteractiveTransitionTracker**: one back gesture's state machine,
//!   committing or rolling back the speculative pop.
//!
//! # How it fits
//! Nodes come from `waypoint-core`. A headless reference presenter lives in
//! `waypoint-harness`.

pub mod config;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod flow;
pub mod navigator;
pub mod once;
pub mod presenter;
pub mod stack;
pub mod transition;

pub use config::{NavigationConfig, PendingInteractivePolicy};
pub use coordinator::{StackCoordinator, WeakStackCoordinator};
pub use descriptor::{ItemDescriptor, LifecycleCallbacks, NavigationDescriptor};
pub use error::StackRejection;
pub use flow::{NavigationFlow, NavigationNode, SharedHooks};
pub use navigator::{Navigator, ReplaceAnimation};
pub use once::OnceToken;
pub use presenter::{Completion, Direction, PresentOptions, Presenter};
pub use stack::{Evicted, NavigationStack, StackEntry, StackResult};
pub use transition::{
    Disposition, InteractiveTransitionTracker, TransitionContext, TransitionOutcome,
    TransitionState,
};
