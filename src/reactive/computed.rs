use crate::runtime::ReactiveRuntime;
use std::cell::RefCell;
use std::rc::Rc;

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    id: usize,
    runtime: Rc<ReactiveRuntime>,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.runtime.remove_observer(self.id);
    }
}

/// A memoized derived value that tracks its dependencies.
///
/// The computation runs on first read and again only after something it
/// read has changed. Store getters are built on this type.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value in the current runtime.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::in_runtime(ReactiveRuntime::current(), compute)
    }

    pub(crate) fn in_runtime<F>(runtime: Rc<ReactiveRuntime>, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let id = runtime.next_id();
        runtime.register_computed(id);

        Self {
            inner: Rc::new(ComputedInner {
                compute: Box::new(compute),
                cached: RefCell::new(None),
                id,
                runtime,
            }),
        }
    }

    /// Get the current value, recomputing if a dependency changed.
    pub fn get(&self) -> T {
        let inner = &self.inner;
        inner.runtime.track_read(inner.id);

        if !inner.runtime.is_dirty(inner.id) {
            if let Some(value) = inner.cached.borrow().as_ref() {
                return value.clone();
            }
        }
        self.recompute()
    }

    fn recompute(&self) -> T {
        let inner = &self.inner;
        inner.runtime.begin_recompute(inner.id);
        let value = inner.runtime.with_observer(inner.id, || (inner.compute)());
        *inner.cached.borrow_mut() = Some(value.clone());
        inner.runtime.mark_clean(inner.id);
        value
    }

    /// The computed value's id in its runtime.
    pub fn id(&self) -> usize {
        self.inner.id
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
