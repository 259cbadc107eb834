#![forbid(unsafe_code)]

//! End-to-end navigation scenarios driven through the headless presenter.

use std::cell::Cell;
use std::rc::Rc;

use waypoint_core::{DispatchOutcome, FlowId, FlowNode};
use waypoint_harness::{
    HeadlessPresenter, HookCall, PresenterEvent, ScreenEvent, ScreenEventKind, StackRig,
    init_test_logging,
};
use waypoint_nav::{
    Direction, Disposition, NavigationConfig, NavigationFlow, NavigationNode, Navigator,
    PendingInteractivePolicy, PresentOptions, ReplaceAnimation, StackCoordinator, StackRejection,
};

type Rig = StackRig<ScreenEvent>;

fn rig() -> Rig {
    init_test_logging();
    StackRig::new()
}

fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
    let hits = Rc::new(Cell::new(0));
    let inner = Rc::clone(&hits);
    (hits, move || inner.set(inner.get() + 1))
}

// ---------------------------------------------------------------------------
// Stack operations
// ---------------------------------------------------------------------------

#[test]
fn push_from_then_pop_from_restores_root() {
    let rig = rig();
    let r = rig.screen("r");
    let a = rig.screen("a");
    rig.coordinator.set([&r], PresentOptions::animated()).unwrap();

    rig.coordinator
        .push_from(&a, r.id(), PresentOptions::animated())
        .unwrap();
    assert_eq!(rig.stack(), vec!["r", "a"]);
    let shown = rig.presenter.last_presentation().unwrap();
    assert_eq!(shown.direction, Direction::Forward);
    assert_eq!(shown.len(), 2);
    assert_eq!(a.parent(), Some(r.clone()));

    rig.coordinator
        .pop_from(a.id(), PresentOptions::animated())
        .unwrap();
    assert_eq!(rig.stack(), vec!["r"]);
    let shown = rig.presenter.last_presentation().unwrap();
    assert_eq!(shown.direction, Direction::Backward);
    assert_eq!(shown.len(), 1);
    assert_eq!(a.parent(), None);
}

#[test]
fn push_from_discards_entries_above_source() {
    let rig = rig();
    let [r, a, b, c] = ["r", "a", "b", "c"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a, &b], PresentOptions::immediate())
        .unwrap();

    rig.coordinator
        .push_from(&c, a.id(), PresentOptions::animated())
        .unwrap();
    assert_eq!(rig.stack(), vec!["r", "a", "c"]);
    assert_eq!(c.parent(), Some(a.clone()));
    assert_eq!(b.parent(), None);
    assert!(b.owner().is_none());
}

#[test]
fn set_chains_parents_under_coordinator() {
    let rig = rig();
    let [r, a, b] = ["r", "a", "b"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a, &b], PresentOptions::immediate())
        .unwrap();

    assert_eq!(r.parent().as_ref(), Some(rig.coordinator.node()));
    assert_eq!(a.parent(), Some(r.clone()));
    assert_eq!(b.parent(), Some(a.clone()));
    assert!(b.is_owned_by(rig.coordinator.node()));
    assert_eq!(
        rig.presenter.last_presentation().unwrap().direction,
        Direction::None
    );
}

#[test]
fn set_replacing_stack_releases_old_entries() {
    let rig = rig();
    let [r, a, x] = ["r", "a", "x"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();
    rig.coordinator
        .set([&x], PresentOptions::immediate())
        .unwrap();

    assert_eq!(rig.stack(), vec!["x"]);
    assert_eq!(a.parent(), None);
    assert_eq!(r.parent(), None);
    assert!(r.owner().is_none());
}

#[test]
fn rejected_set_leaves_everything_untouched() {
    let rig = rig();
    let [r, a] = ["r", "a"].map(|n| rig.screen(n));
    rig.coordinator.set([&r], PresentOptions::immediate()).unwrap();
    let presentations = rig.presenter.history().len();

    let empty: [&FlowNode<ScreenEvent, String>; 0] = [];
    assert_eq!(
        rig.coordinator.set(empty, PresentOptions::immediate()),
        Err(StackRejection::EmptyStack)
    );
    assert!(matches!(
        rig.coordinator.set([&a, &a], PresentOptions::immediate()),
        Err(StackRejection::AlreadyOnStack(_))
    ));
    assert_eq!(rig.stack(), vec!["r"]);
    assert_eq!(rig.presenter.history().len(), presentations);
    assert_eq!(a.parent(), None);
    assert!(a.owner().is_none());
}

#[test]
fn duplicate_push_is_rejected_and_completion_dropped() {
    let rig = rig();
    let a = rig.screen("a");
    let (first, done) = counter();
    rig.coordinator
        .push(&a, PresentOptions::animated().with_completion(done))
        .unwrap();
    assert_eq!(first.get(), 1);

    let (second, done) = counter();
    assert_eq!(
        rig.coordinator
            .push(&a, PresentOptions::animated().with_completion(done)),
        Err(StackRejection::AlreadyOnStack(a.id().clone()))
    );
    assert_eq!(second.get(), 0);
    assert_eq!(rig.stack(), vec!["a"]);
    assert!(a.is_owned_by(rig.coordinator.node()));
}

#[test]
fn pop_guards_report_why() {
    let rig = rig();
    let [r, a] = ["r", "a"].map(|n| rig.screen(n));
    let stranger = rig.screen("stranger");
    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();

    assert_eq!(
        rig.coordinator.pop_from(r.id(), PresentOptions::animated()),
        Err(StackRejection::WouldEmptyStack(r.id().clone()))
    );
    assert_eq!(
        rig.coordinator.pop_to(a.id(), PresentOptions::animated()),
        Err(StackRejection::AlreadyOnTop(a.id().clone()))
    );
    assert_eq!(
        rig.coordinator
            .pop_from(stranger.id(), PresentOptions::animated()),
        Err(StackRejection::TargetNotFound(stranger.id().clone()))
    );
    assert_eq!(rig.stack(), vec!["r", "a"]);
}

#[test]
fn pop_to_keeps_target_on_top() {
    let rig = rig();
    let [r, a, b] = ["r", "a", "b"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a, &b], PresentOptions::immediate())
        .unwrap();
    rig.coordinator
        .pop_to(r.id(), PresentOptions::animated())
        .unwrap();
    assert_eq!(rig.stack(), vec!["r"]);
    assert_eq!(rig.shown(), vec!["r"]);
    assert_eq!(a.parent(), None);
}

#[test]
fn replace_inherits_old_parent() {
    let rig = rig();
    let [r, a, b, c] = ["r", "a", "b", "c"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a, &b], PresentOptions::immediate())
        .unwrap();

    rig.coordinator
        .replace_forward(a.id(), &c, PresentOptions::animated())
        .unwrap();
    assert_eq!(rig.stack(), vec!["r", "c"]);
    assert_eq!(c.parent(), Some(r.clone()));
    assert_eq!(
        rig.presenter.last_presentation().unwrap().direction,
        Direction::Forward
    );

    let d = rig.screen("d");
    rig.coordinator
        .replace_backward(r.id(), &d, PresentOptions::animated())
        .unwrap();
    assert_eq!(rig.stack(), vec!["d"]);
    assert_eq!(d.parent().as_ref(), Some(rig.coordinator.node()));
    assert_eq!(
        rig.presenter.last_presentation().unwrap().direction,
        Direction::Backward
    );
}

#[test]
fn replace_rejects_present_or_missing_entries() {
    let rig = rig();
    let [r, a, b] = ["r", "a", "b"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();
    assert_eq!(
        rig.coordinator
            .replace_forward(r.id(), &a, PresentOptions::animated()),
        Err(StackRejection::AlreadyOnStack(a.id().clone()))
    );
    assert_eq!(
        rig.coordinator
            .replace_forward(b.id(), &b, PresentOptions::animated()),
        Err(StackRejection::SourceNotFound(b.id().clone()))
    );
    assert_eq!(rig.stack(), vec!["r", "a"]);
}

#[test]
fn rejected_operations_keep_existing_parent_link() {
    let rig = rig();
    let [r, x, holder] = ["r", "x", "holder"].map(|n| rig.screen(n));
    x.attach_parent(&holder);
    rig.coordinator.set([&r], PresentOptions::immediate()).unwrap();
    let missing = FlowId::named("missing");

    assert_eq!(
        rig.coordinator
            .push_from(&x, &missing, PresentOptions::animated()),
        Err(StackRejection::SourceNotFound(missing.clone()))
    );
    assert_eq!(x.parent(), Some(holder.clone()));

    assert_eq!(
        rig.coordinator.set([&x, &r], PresentOptions::immediate()),
        Err(StackRejection::AlreadyOnStack(r.id().clone()))
    );
    assert_eq!(x.parent(), Some(holder.clone()));

    assert_eq!(
        rig.coordinator
            .replace_forward(&missing, &x, PresentOptions::animated()),
        Err(StackRejection::SourceNotFound(missing.clone()))
    );
    assert_eq!(
        rig.coordinator
            .replace_backward(&missing, &x, PresentOptions::animated()),
        Err(StackRejection::SourceNotFound(missing.clone()))
    );
    assert_eq!(x.parent(), Some(holder.clone()));
    assert!(x.owner().is_none());
    assert_eq!(rig.stack(), vec!["r"]);
    assert_eq!(r.parent().as_ref(), Some(rig.coordinator.node()));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn events_bubble_to_the_pushing_screen() {
    let rig = rig();
    let [r, a] = ["r", "a"].map(|n| rig.screen(n));
    let taps = Rc::new(Cell::new(0));
    let seen = Rc::clone(&taps);
    r.handle(ScreenEventKind::Tap, move |_| seen.set(seen.get() + 1));
    rig.coordinator
        .node()
        .handle(ScreenEventKind::Close, |_| {});

    rig.coordinator.push(&r, PresentOptions::animated()).unwrap();
    rig.coordinator.push(&a, PresentOptions::animated()).unwrap();

    assert_eq!(
        a.dispatch(ScreenEvent::Tap("buy".into())),
        DispatchOutcome::Handled(r.id().clone())
    );
    assert_eq!(
        a.dispatch(ScreenEvent::Close),
        DispatchOutcome::Handled(rig.coordinator.node().id().clone())
    );
    assert_eq!(taps.get(), 1);

    rig.coordinator
        .pop_from(a.id(), PresentOptions::animated())
        .unwrap();
    assert_eq!(
        a.dispatch(ScreenEvent::Tap("late".into())),
        DispatchOutcome::Unhandled
    );
    assert_eq!(taps.get(), 1);
}

#[test]
fn nested_coordinator_bubbles_into_outer_stack() {
    let rig = rig();
    let inner_presenter = Rc::new(HeadlessPresenter::new("inner".to_string()));
    let inner = StackCoordinator::new(&rig.tree, inner_presenter.clone());
    let leaf = rig.screen("leaf");
    let closed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&closed);
    rig.coordinator
        .node()
        .handle(ScreenEventKind::Close, move |_| flag.set(true));

    rig.coordinator
        .push(inner.node(), PresentOptions::animated())
        .unwrap();
    inner.push(&leaf, PresentOptions::animated()).unwrap();

    assert_eq!(rig.presenter.views(), vec!["inner".to_string()]);
    assert_eq!(inner_presenter.views(), vec!["leaf".to_string()]);
    assert_eq!(
        leaf.dispatch(ScreenEvent::Close),
        DispatchOutcome::Handled(rig.coordinator.node().id().clone())
    );
    assert!(closed.get());
}

// ---------------------------------------------------------------------------
// Back button
// ---------------------------------------------------------------------------

#[test]
fn back_button_pops_when_allowed() {
    let rig = rig();
    let r = rig.screen("r");
    let (a, a_nav, _gate) = rig.recorded("a");
    rig.coordinator.push(&r, PresentOptions::animated()).unwrap();
    rig.coordinator.push(a_nav, PresentOptions::animated()).unwrap();
    rig.log.take();

    assert!(rig.presenter.press_back());
    assert_eq!(rig.stack(), vec!["r"]);
    assert_eq!(
        rig.presenter.last_presentation().unwrap().direction,
        Direction::Backward
    );
    assert_eq!(
        rig.log.calls_for(a.id()),
        vec![HookCall::ShouldAllowDismiss {
            flow: a.id().clone(),
            interactive: false
        }]
    );
}

#[test]
fn back_button_respects_dismiss_gate() {
    let rig = rig();
    let r = rig.screen("r");
    let (_a, a_nav, gate) = rig.recorded("a");
    rig.coordinator.push(&r, PresentOptions::animated()).unwrap();
    rig.coordinator.push(a_nav, PresentOptions::animated()).unwrap();

    gate.set(false);
    assert!(rig.presenter.press_back());
    assert_eq!(rig.stack(), vec!["r", "a"]);

    gate.set(true);
    assert!(rig.presenter.press_back());
    assert_eq!(rig.stack(), vec!["r"]);
}

#[test]
fn back_button_on_empty_presenter_is_noop() {
    let rig = rig();
    assert!(!rig.presenter.press_back());
    assert!(rig.presenter.history().is_empty());
}

// ---------------------------------------------------------------------------
// Interactive back gesture
// ---------------------------------------------------------------------------

#[test]
fn committed_gesture_pops_and_reports_to_revealed() {
    let rig = rig();
    let (r, r_nav, _gate) = rig.recorded("r");
    let a = rig.screen("a");
    rig.coordinator.push(r_nav, PresentOptions::animated()).unwrap();
    rig.coordinator.push(&a, PresentOptions::animated()).unwrap();
    rig.log.take();

    assert!(rig.presenter.begin_back_gesture());
    assert!(rig.coordinator.is_transition_pending());
    assert_eq!(rig.coordinator.pending_transition(), Some(r.id().clone()));

    assert_eq!(
        rig.presenter.finish_back_gesture(false),
        Some(Disposition::Committed)
    );
    assert!(!rig.coordinator.is_transition_pending());
    assert_eq!(rig.stack(), vec!["r"]);
    assert_eq!(rig.shown(), vec!["r"]);
    assert_eq!(a.parent(), None);

    let id = r.id().clone();
    assert_eq!(
        rig.log.calls_for(&id),
        vec![
            HookCall::WillPresent {
                flow: id.clone(),
                animated: true
            },
            HookCall::DidStartInteractive(id.clone()),
            HookCall::DidChangeInteractive {
                flow: id.clone(),
                cancelled: false
            },
            HookCall::DidCompleteInteractive {
                flow: id.clone(),
                cancelled: false
            },
            HookCall::DidPresent {
                flow: id.clone(),
                animated: true
            },
        ]
    );
}

#[test]
fn cancelled_gesture_rolls_back() {
    let rig = rig();
    let (r, r_nav, _gate) = rig.recorded("r");
    let a = rig.screen("a");
    rig.coordinator.push(r_nav, PresentOptions::animated()).unwrap();
    rig.coordinator.push(&a, PresentOptions::animated()).unwrap();
    rig.log.take();

    assert!(rig.presenter.begin_back_gesture());
    assert!(rig.presenter.update_back_gesture(true));
    assert_eq!(
        rig.presenter.finish_back_gesture(true),
        Some(Disposition::RolledBack)
    );

    assert!(!rig.coordinator.is_transition_pending());
    assert_eq!(rig.stack(), vec!["r", "a"]);
    assert_eq!(rig.shown(), vec!["r", "a"]);
    assert_eq!(a.parent(), Some(r.clone()));
    assert!(rig.log.calls_for(r.id()).contains(&HookCall::DidCompleteInteractive {
        flow: r.id().clone(),
        cancelled: true
    }));
    assert!(!rig.log.calls_for(r.id()).iter().any(|call| matches!(
        call,
        HookCall::DidPresent { .. }
    )));
}

#[test]
fn gesture_needs_consent_from_top() {
    let rig = rig();
    let r = rig.screen("r");
    let (a, a_nav, gate) = rig.recorded("a");
    rig.coordinator.push(&r, PresentOptions::animated()).unwrap();
    rig.coordinator.push(a_nav, PresentOptions::animated()).unwrap();

    gate.set(false);
    assert!(!rig.presenter.begin_back_gesture());
    assert_eq!(
        rig.presenter.events().last(),
        Some(&PresenterEvent::GestureRefused(a.id().clone()))
    );
    assert!(rig.log.calls_for(a.id()).contains(&HookCall::ShouldAllowDismiss {
        flow: a.id().clone(),
        interactive: true
    }));
    assert!(!rig.coordinator.is_transition_pending());
}

#[test]
fn gesture_needs_two_entries() {
    let rig = rig();
    let r = rig.screen("r");
    rig.coordinator.push(&r, PresentOptions::animated()).unwrap();
    assert!(!rig.presenter.begin_back_gesture());
}

#[test]
fn programmatic_navigation_rejected_during_gesture() {
    let rig = rig();
    let [r, a, b] = ["r", "a", "b"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();
    assert!(rig.presenter.begin_back_gesture());

    let (hits, done) = counter();
    assert_eq!(
        rig.coordinator
            .push(&b, PresentOptions::animated().with_completion(done)),
        Err(StackRejection::TransitionInFlight(r.id().clone()))
    );
    assert_eq!(hits.get(), 0);
    assert_eq!(rig.stack(), vec!["r", "a"]);

    assert_eq!(
        rig.presenter.finish_back_gesture(false),
        Some(Disposition::Committed)
    );
    rig.coordinator.push(&b, PresentOptions::animated()).unwrap();
    assert_eq!(rig.stack(), vec!["r", "b"]);
}

#[test]
fn allow_policy_abandons_gesture_before_presenting() {
    init_test_logging();
    let rig: Rig = StackRig::with_config(
        NavigationConfig::default().with_pending_policy(PendingInteractivePolicy::Allow),
    );
    let [r, a, b] = ["r", "a", "b"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();
    assert!(rig.presenter.begin_back_gesture());

    rig.coordinator.push(&b, PresentOptions::animated()).unwrap();
    assert!(!rig.presenter.is_gesture_active());
    assert!(!rig.coordinator.is_transition_pending());
    assert_eq!(rig.stack(), vec!["r", "a", "b"]);
    assert_eq!(rig.shown(), vec!["r", "a", "b"]);
    assert!(
        rig.presenter
            .events()
            .contains(&PresenterEvent::GestureSettled(Disposition::RolledBack))
    );
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

#[test]
fn navigator_drives_own_node() {
    let rig = rig();
    let [r, a, b] = ["r", "a", "b"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();

    let nav = rig.coordinator.navigator(&r);
    nav.push(&b, PresentOptions::animated()).unwrap();
    assert_eq!(rig.stack(), vec!["r", "b"]);

    let nav_b = rig.coordinator.navigator(&b);
    nav_b.pop_to_previous(PresentOptions::animated()).unwrap();
    assert_eq!(rig.stack(), vec!["r"]);
    assert!(!nav_b.is_attached());

    nav.push(&a, PresentOptions::immediate()).unwrap();
    nav.pop_to_current(PresentOptions::animated()).unwrap();
    assert_eq!(rig.stack(), vec!["r"]);
}

#[test]
fn navigator_replace_picks_direction() {
    let rig = rig();
    let [r, a, b, c] = ["r", "a", "b", "c"].map(|n| rig.screen(n));
    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();

    let (hits, done) = counter();
    rig.coordinator
        .navigator(&a)
        .replace(&b, ReplaceAnimation::Pop, Some(Box::new(done)))
        .unwrap();
    assert_eq!(rig.stack(), vec!["r", "b"]);
    assert_eq!(hits.get(), 1);
    assert_eq!(
        rig.presenter.last_presentation().unwrap().direction,
        Direction::Backward
    );

    rig.coordinator
        .navigator(&b)
        .replace(&c, ReplaceAnimation::None, None)
        .unwrap();
    assert_eq!(rig.stack(), vec!["r", "c"]);
    assert_eq!(
        rig.presenter.last_presentation().unwrap().direction,
        Direction::None
    );
}

#[test]
fn navigator_reports_detached() {
    let rig = rig();
    let [r, a, b] = ["r", "a", "b"].map(|n| rig.screen(n));
    let loose = rig.coordinator.navigator(&b);
    assert_eq!(
        loose.pop_to_previous(PresentOptions::animated()),
        Err(StackRejection::Detached)
    );

    rig.coordinator
        .set([&r, &a], PresentOptions::immediate())
        .unwrap();
    let nav_a = rig.coordinator.navigator(&a);
    assert!(nav_a.is_attached());
    rig.coordinator
        .pop_from(a.id(), PresentOptions::animated())
        .unwrap();
    assert_eq!(
        nav_a.push(&b, PresentOptions::animated()),
        Err(StackRejection::Detached)
    );

    let nav_r = rig.coordinator.navigator(&r);
    drop(rig);
    assert_eq!(
        nav_r.pop_to_current(PresentOptions::animated()),
        Err(StackRejection::Detached)
    );
}

// ---------------------------------------------------------------------------
// Hooks that navigate
// ---------------------------------------------------------------------------

struct AutoAdvance {
    next: Option<FlowNode<ScreenEvent, String>>,
}

impl NavigationFlow<ScreenEvent, String> for AutoAdvance {
    fn did_present(&mut self, navigator: &Navigator<ScreenEvent, String>, _animated: bool) {
        if let Some(next) = self.next.take() {
            navigator
                .push(next, PresentOptions::immediate())
                .expect("follow-up push");
        }
    }
}

#[test]
fn hook_can_navigate_during_presentation() {
    let rig = rig();
    let [splash, home] = ["splash", "home"].map(|n| rig.screen(n));
    let nav = NavigationNode::with_hooks(
        splash.clone(),
        AutoAdvance {
            next: Some(home.clone()),
        },
    );

    let (hits, done) = counter();
    rig.coordinator
        .push(nav, PresentOptions::animated().with_completion(done))
        .unwrap();

    assert_eq!(hits.get(), 1);
    assert_eq!(rig.stack(), vec!["splash", "home"]);
    assert_eq!(rig.shown(), vec!["splash", "home"]);
    assert_eq!(home.parent(), Some(splash.clone()));
    assert_eq!(rig.presenter.history().len(), 2);
}
