#![forbid(unsafe_code)]

//! Property tests: random operation sequences against a coordinator and the
//! headless presenter.
//!
//! After every step, accepted or rejected:
//! - the presenter shows exactly the coordinator stack,
//! - no identity appears twice,
//! - each entry's parent is the entry below it (the coordinator node for the
//!   bottom) and each entry is owned by the coordinator node,
//! - nodes off the stack have neither parent nor owner.
//!
//! A finished back gesture leaves the stack as `pop_from(top)` would, or
//! untouched when cancelled.

use proptest::prelude::*;
use waypoint_core::{FlowId, FlowNode};
use waypoint_harness::{ScreenEvent, StackRig};
use waypoint_nav::PresentOptions;

const POOL: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Set(Vec<usize>),
    Push(usize),
    PushFrom(usize, usize),
    PopFrom(usize),
    PopTo(usize),
    Replace(usize, usize, bool),
    Back,
    Gesture { cancel: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(0..POOL, 0..4).prop_map(Op::Set),
        (0..POOL).prop_map(Op::Push),
        (0..POOL, 0..POOL).prop_map(|(n, s)| Op::PushFrom(n, s)),
        (0..POOL).prop_map(Op::PopFrom),
        (0..POOL).prop_map(Op::PopTo),
        (0..POOL, 0..POOL, any::<bool>()).prop_map(|(o, n, f)| Op::Replace(o, n, f)),
        Just(Op::Back),
        any::<bool>().prop_map(|cancel| Op::Gesture { cancel }),
    ]
}

fn apply(rig: &StackRig<ScreenEvent>, pool: &[FlowNode<ScreenEvent, String>], op: &Op) {
    let c = &rig.coordinator;
    let _ = match op {
        Op::Set(picks) => c.set(
            picks.iter().map(|&i| &pool[i]),
            PresentOptions::immediate(),
        ),
        Op::Push(n) => c.push(&pool[*n], PresentOptions::animated()),
        Op::PushFrom(n, s) => c.push_from(&pool[*n], pool[*s].id(), PresentOptions::animated()),
        Op::PopFrom(t) => c.pop_from(pool[*t].id(), PresentOptions::animated()),
        Op::PopTo(t) => c.pop_to(pool[*t].id(), PresentOptions::animated()),
        Op::Replace(o, n, true) => {
            c.replace_forward(pool[*o].id(), &pool[*n], PresentOptions::animated())
        }
        Op::Replace(o, n, false) => {
            c.replace_backward(pool[*o].id(), &pool[*n], PresentOptions::animated())
        }
        Op::Back => {
            rig.presenter.press_back();
            Ok(())
        }
        Op::Gesture { cancel } => {
            if rig.presenter.begin_back_gesture() {
                rig.presenter.finish_back_gesture(*cancel);
            }
            Ok(())
        }
    };
}

fn check(rig: &StackRig<ScreenEvent>, pool: &[FlowNode<ScreenEvent, String>]) {
    let stack = rig.stack();
    assert_eq!(rig.shown(), stack);
    assert!(!rig.coordinator.is_transition_pending());

    let mut seen = std::collections::HashSet::new();
    for name in &stack {
        assert!(seen.insert(name.clone()), "duplicate {name}");
    }

    let root = rig.coordinator.node();
    let mut below = root.clone();
    for name in &stack {
        let node = rig.coordinator.get(&FlowId::named(name)).expect("on stack");
        assert_eq!(node.parent().as_ref(), Some(&below), "parent of {name}");
        assert!(node.is_owned_by(root), "owner of {name}");
        below = node;
    }

    for node in pool {
        if !rig.coordinator.contains(node.id()) {
            assert_eq!(node.parent(), None, "stray parent on {}", node.id());
            assert!(node.owner().is_none(), "stray owner on {}", node.id());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn stack_and_presenter_stay_consistent(ops in prop::collection::vec(op(), 1..24)) {
        let rig: StackRig = StackRig::new();
        let pool: Vec<_> = (0..POOL).map(|i| rig.screen(&format!("s{i}"))).collect();
        for op in &ops {
            apply(&rig, &pool, op);
            check(&rig, &pool);
        }
    }

    #[test]
    fn completions_fire_only_for_accepted_operations(
        ops in prop::collection::vec((0..POOL, any::<bool>()), 1..16),
    ) {
        let rig: StackRig = StackRig::new();
        let pool: Vec<_> = (0..POOL).map(|i| rig.screen(&format!("s{i}"))).collect();
        for (n, pop) in ops {
            let hits = std::rc::Rc::new(std::cell::Cell::new(0u32));
            let counter = std::rc::Rc::clone(&hits);
            let options = PresentOptions::animated()
                .with_completion(move || counter.set(counter.get() + 1));
            let result = if pop {
                rig.coordinator.pop_from(pool[n].id(), options)
            } else {
                rig.coordinator.push(&pool[n], options)
            };
            prop_assert_eq!(hits.get(), u32::from(result.is_ok()));
        }
    }

    #[test]
    fn gesture_commit_matches_pop_from_top(depth in 2usize..POOL, cancel in any::<bool>()) {
        let rig: StackRig = StackRig::new();
        let pool: Vec<_> = (0..depth).map(|i| rig.screen(&format!("s{i}"))).collect();
        rig.coordinator.set(&pool, PresentOptions::immediate()).unwrap();
        let before = rig.stack();

        prop_assert!(rig.presenter.begin_back_gesture());
        rig.presenter.finish_back_gesture(cancel);

        let expected = if cancel { before } else { before[..depth - 1].to_vec() };
        prop_assert_eq!(rig.stack(), expected.clone());
        prop_assert_eq!(rig.shown(), expected);
        check(&rig, &pool);
    }
}
