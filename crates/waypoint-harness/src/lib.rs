#![forbid(unsafe_code)]

//! Headless presenter, fixtures, and logging bootstrap for Waypoint tests.
//!
//! # Role in Waypoint
//! The coordinator in `waypoint-nav` only talks to a [`Presenter`]. This
//! crate supplies one that renders nothing and records everything, so stack
//! behavior, lifecycle hooks, and back gestures can be driven
//! deterministically from tests and demos.
//!
//! # Quick start
//!
//! ```
//! use waypoint_harness::{StackRig, init_test_logging};
//! use waypoint_nav::PresentOptions;
//!
//! init_test_logging();
//! let rig: StackRig = StackRig::new();
//! let root = rig.screen("root");
//! let detail = rig.screen("detail");
//! rig.coordinator.push(&root, PresentOptions::animated()).unwrap();
//! rig.coordinator.push(&detail, PresentOptions::animated()).unwrap();
//! assert_eq!(rig.shown(), vec!["root", "detail"]);
//!
//! assert!(rig.presenter.begin_back_gesture());
//! rig.presenter.finish_back_gesture(false);
//! assert_eq!(rig.stack(), vec!["root"]);
//! ```
//!
//! [`Presenter`]: waypoint_nav::Presenter

pub mod fixtures;
pub mod headless;
pub mod logging;

pub use fixtures::{HookCall, HookLog, RecordingFlow, ScreenEvent, ScreenEventKind, StackRig};
pub use headless::{HeadlessPresenter, Presentation, PresenterEvent};
pub use logging::{LOG_ENV, env_filter, init_test_logging};
