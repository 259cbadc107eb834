#![forbid(unsafe_code)]

//! Single-fire callback guard.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Action = Box<dyn FnOnce()>;

/// Runs its action at most once, whichever clone fires first.
///
/// Clones share the slot: firing through any clone disarms all of them. The action is taken out of the slot before it runs, so firing
/// again from inside the action is a no-op.
#[derive(Clone)]
pub struct OnceToken {
    slot: Rc<RefCell<Option<Action>>>,
}

impl OnceToken {
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(Box::new(action)))),
        }
    }

    /// Run the action if it has not run yet.
    ///
    /// Returns `true` if this call ran it.
    pub fn fire(&self) -> bool {
        let action = self.slot.borrow_mut().take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl fmt::Debug for OnceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceToken")
            .field("armed", &self.is_armed())
            .finish()
    }
}
