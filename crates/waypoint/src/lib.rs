#![forbid(unsafe_code)]

//! Waypoint public facade crate.
//!
//! Re-exports the flow tree, the navigation layer, and (with the default
//! `harness` feature) the headless presenter under one name.

pub use waypoint_core as core;
#[cfg(feature = "harness")]
pub use waypoint_harness as harness;
pub use waypoint_nav as nav;

pub mod prelude {
    pub use waypoint_core::{
        DispatchOutcome, Dispatcher, FlowContext, FlowError, FlowEvent, FlowId, FlowNode,
        FlowTree,
    };
    #[cfg(feature = "harness")]
    pub use waypoint_harness::{HeadlessPresenter, init_test_logging};
    pub use waypoint_nav::{
        Direction, NavigationConfig, NavigationDescriptor, NavigationFlow, NavigationNode,
        Navigator, PresentOptions, Presenter, ReplaceAnimation, StackCoordinator, StackRejection,
    };
}
