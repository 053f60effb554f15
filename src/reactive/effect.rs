use crate::runtime::ReactiveRuntime;
use std::rc::{Rc, Weak};

/// A side effect that runs when its dependencies change.
///
/// Effects track what they read and re-run whenever any of it changes.
/// The effect runs immediately on creation to establish initial dependencies
/// and stops when dropped. A rendering layer uses effects to repaint
/// components that read store state or getters.
///
/// # Examples
///
/// ```
/// use larder::{Effect, Store};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let store = Store::builder(0i32)
///     .mutation("set", |n: &mut i32, v: i32| *n = v)
///     .build();
/// let seen = Rc::new(Cell::new(0));
///
/// let _effect = Effect::new({
///     let store = store.clone();
///     let seen = Rc::clone(&seen);
///     move || seen.set(store.state())
/// });
///
/// store.commit("set", 10).unwrap();
/// assert_eq!(seen.get(), 10);
/// ```
pub struct Effect {
    id: usize,
    runtime: Weak<ReactiveRuntime>,
}

impl Effect {
    /// Create an effect in the current runtime and run it once.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::in_runtime(&ReactiveRuntime::current(), effect)
    }

    pub(crate) fn in_runtime<F>(runtime: &Rc<ReactiveRuntime>, effect: F) -> Self
    where
        F: Fn() + 'static,
    {
        let id = runtime.next_id();
        runtime.create_effect(id, Rc::new(effect));

        Self {
            id,
            runtime: Rc::downgrade(runtime),
        }
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.id);
        }
    }
}
