use crate::runtime::ReactiveRuntime;
use std::cell::{BorrowMutError, RefCell};
use std::rc::Rc;

/// Reactive cell holding a store's state.
///
/// Reads through [`with`](Self::with) are recorded against the current
/// observer. Outside the crate the cell is read-only: the only write path is
/// the store's `commit`, which notifies every observer once the mutation
/// handler returns.
pub struct Reactive<S> {
    value: Rc<RefCell<S>>,
    id: usize,
    runtime: Rc<ReactiveRuntime>,
}

impl<S: 'static> Reactive<S> {
    pub(crate) fn new(initial: S) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            value: Rc::new(RefCell::new(initial)),
            id,
            runtime,
        }
    }

    /// Read the value with a function, tracking the read.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a mutation handler of the same store.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.runtime.track_read(self.id);
        f(&self.value.borrow())
    }

    /// Read the value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Clone the current value, tracking the read.
    pub fn get(&self) -> S
    where
        S: Clone,
    {
        self.with(S::clone)
    }

    /// The cell's id in its runtime.
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn runtime(&self) -> &Rc<ReactiveRuntime> {
        &self.runtime
    }

    /// Apply `f` in place and notify observers.
    ///
    /// Fails without running `f` while any borrow of the value is alive.
    pub(crate) fn try_update<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, BorrowMutError> {
        let result = {
            let mut value = self.value.try_borrow_mut()?;
            f(&mut value)
        };
        // Release the borrow before observers read the new value
        self.runtime.notify_observers(self.id);
        Ok(result)
    }
}

impl<S> Clone for Reactive<S> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            id: self.id,
            runtime: Rc::clone(&self.runtime),
        }
    }
}
