#![forbid(unsafe_code)]

//! Ready-made pieces for navigation tests.
//!
//! [`StackRig`] wires a tree, a [`HeadlessPresenter`] and a
//! [`StackCoordinator`] together with `String` views. [`RecordingFlow`]
//! logs every hook call into a shared [`HookLog`] and lets a test gate
//! dismissal at runtime.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use waypoint_core::{FlowEvent, FlowId, FlowNode, FlowTree};
use waypoint_nav::{NavigationConfig, NavigationFlow, NavigationNode, Navigator, StackCoordinator};

use crate::headless::HeadlessPresenter;

/// Event type for tests that do not care about payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    Tap(String),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenEventKind {
    Tap,
    Close,
}

impl FlowEvent for ScreenEvent {
    type Kind = ScreenEventKind;

    fn kind(&self) -> ScreenEventKind {
        match self {
            Self::Tap(_) => ScreenEventKind::Tap,
            Self::Close => ScreenEventKind::Close,
        }
    }
}

// ---------------------------------------------------------------------------
// Hook recording
// ---------------------------------------------------------------------------

/// One hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    WillPresent { flow: FlowId, animated: bool },
    DidPresent { flow: FlowId, animated: bool },
    ShouldAllowDismiss { flow: FlowId, interactive: bool },
    DidStartInteractive(FlowId),
    DidChangeInteractive { flow: FlowId, cancelled: bool },
    DidCompleteInteractive { flow: FlowId, cancelled: bool },
}

impl HookCall {
    #[must_use]
    pub fn flow(&self) -> &FlowId {
        match self {
            Self::WillPresent { flow, .. }
            | Self::DidPresent { flow, .. }
            | Self::ShouldAllowDismiss { flow, .. }
            | Self::DidChangeInteractive { flow, .. }
            | Self::DidCompleteInteractive { flow, .. } => flow,
            Self::DidStartInteractive(flow) => flow,
        }
    }
}

/// Shared, ordered log of hook calls.
#[derive(Clone, Default)]
pub struct HookLog(Rc<RefCell<Vec<HookCall>>>);

impl HookLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: HookCall) {
        self.0.borrow_mut().push(call);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<HookCall> {
        self.0.borrow().clone()
    }

    /// Calls made on behalf of `flow`.
    #[must_use]
    pub fn calls_for(&self, flow: &FlowId) -> Vec<HookCall> {
        self.0
            .borrow()
            .iter()
            .filter(|call| call.flow() == flow)
            .cloned()
            .collect()
    }

    pub fn take(&self) -> Vec<HookCall> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl fmt::Debug for HookLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().iter()).finish()
    }
}

/// Hooks that record every call and answer dismissal from a shared gate.
#[derive(Debug)]
pub struct RecordingFlow {
    log: HookLog,
    allow_dismiss: Rc<Cell<bool>>,
}

impl RecordingFlow {
    /// Dismissal is allowed until the gate is closed.
    #[must_use]
    pub fn new(log: &HookLog) -> Self {
        Self {
            log: log.clone(),
            allow_dismiss: Rc::new(Cell::new(true)),
        }
    }

    /// Handle to flip dismissal on and off after the hooks were handed over.
    #[must_use]
    pub fn dismiss_gate(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.allow_dismiss)
    }
}

impl<E: FlowEvent, V> NavigationFlow<E, V> for RecordingFlow {
    fn will_present(&mut self, navigator: &Navigator<E, V>, animated: bool) {
        self.log.push(HookCall::WillPresent {
            flow: navigator.id().clone(),
            animated,
        });
    }

    fn did_present(&mut self, navigator: &Navigator<E, V>, animated: bool) {
        self.log.push(HookCall::DidPresent {
            flow: navigator.id().clone(),
            animated,
        });
    }

    fn should_allow_dismiss(&mut self, navigator: &Navigator<E, V>, interactive: bool) -> bool {
        self.log.push(HookCall::ShouldAllowDismiss {
            flow: navigator.id().clone(),
            interactive,
        });
        self.allow_dismiss.get()
    }

    fn did_start_interactive_transition(&mut self, navigator: &Navigator<E, V>) {
        self.log
            .push(HookCall::DidStartInteractive(navigator.id().clone()));
    }

    fn did_change_interactive_transition(&mut self, navigator: &Navigator<E, V>, cancelled: bool) {
        self.log.push(HookCall::DidChangeInteractive {
            flow: navigator.id().clone(),
            cancelled,
        });
    }

    fn did_complete_interactive_transition(&mut self, navigator: &Navigator<E, V>, cancelled: bool) {
        self.log.push(HookCall::DidCompleteInteractive {
            flow: navigator.id().clone(),
            cancelled,
        });
    }
}

// ---------------------------------------------------------------------------
// StackRig
// ---------------------------------------------------------------------------

/// A coordinator driving a headless presenter, with `String` views.
pub struct StackRig<E: FlowEvent = ScreenEvent> {
    pub tree: FlowTree<E, String>,
    pub presenter: Rc<HeadlessPresenter<String>>,
    pub coordinator: StackCoordinator<E, String>,
    pub log: HookLog,
}

impl<E: FlowEvent> StackRig<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(NavigationConfig::default())
    }

    #[must_use]
    pub fn with_config(config: NavigationConfig) -> Self {
        let tree = FlowTree::new();
        let presenter = Rc::new(
            HeadlessPresenter::new("container".to_string())
                .with_trace_transitions(config.trace_transitions),
        );
        let coordinator = StackCoordinator::with_config(&tree, presenter.clone(), config);
        Self {
            tree,
            presenter,
            coordinator,
            log: HookLog::new(),
        }
    }

    /// A node named `name` whose view is its name.
    #[must_use]
    pub fn screen(&self, name: &str) -> FlowNode<E, String> {
        self.tree
            .node()
            .id(name)
            .label(name)
            .plain(name.to_string())
            .build()
    }

    /// A screen plus recording hooks writing to the rig's log.
    ///
    /// Returns the node handle (keep it alive), the navigation node to hand
    /// to the coordinator, and the hooks' dismissal gate.
    #[must_use]
    pub fn recorded(
        &self,
        name: &str,
    ) -> (FlowNode<E, String>, NavigationNode<E, String>, Rc<Cell<bool>>) {
        let node = self.screen(name);
        let hooks = RecordingFlow::new(&self.log);
        let gate = hooks.dismiss_gate();
        let nav = NavigationNode::with_hooks(node.clone(), hooks);
        (node, nav, gate)
    }

    /// Coordinator stack identities as strings, bottom first.
    #[must_use]
    pub fn stack(&self) -> Vec<String> {
        self.coordinator
            .ids()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    /// Presented identities as strings, bottom first.
    #[must_use]
    pub fn shown(&self) -> Vec<String> {
        self.presenter
            .ids()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }
}

impl<E: FlowEvent> Default for StackRig<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FlowEvent> fmt::Debug for StackRig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackRig")
            .field("stack", &self.stack())
            .field("shown", &self.shown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_nav::PresentOptions;

    #[test]
    fn rig_push_shows_screen() {
        let rig: StackRig = StackRig::new();
        let a = rig.screen("a");
        rig.coordinator.push(&a, PresentOptions::animated()).unwrap();
        assert_eq!(rig.stack(), vec!["a"]);
        assert_eq!(rig.shown(), vec!["a"]);
    }

    #[test]
    fn recording_flow_logs_presentation() {
        let rig: StackRig = StackRig::new();
        let (a, nav, _gate) = rig.recorded("a");
        rig.coordinator.push(nav, PresentOptions::animated()).unwrap();
        assert_eq!(
            rig.log.calls_for(a.id()),
            vec![
                HookCall::WillPresent {
                    flow: a.id().clone(),
                    animated: true
                },
                HookCall::DidPresent {
                    flow: a.id().clone(),
                    animated: true
                },
            ]
        );
    }
}
