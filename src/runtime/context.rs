use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Observer callback re-run when one of its sources changes.
type Rerun = Rc<dyn Fn()>;

/// Dependency graph for one runtime.
#[derive(Default)]
struct Graph {
    current_observer: Option<usize>,
    // Map from source ID to the observers that read it
    subscribers: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to the sources it read during its last run
    sources: HashMap<usize, HashSet<usize>>,
    // Map from effect ID to its body
    effects: HashMap<usize, Rerun>,
    // Map from computed ID to dirty flag
    computed: HashMap<usize, bool>,
}

impl Graph {
    fn unlink(&mut self, observer_id: usize) {
        if let Some(old_sources) = self.sources.remove(&observer_id) {
            for source_id in old_sources {
                if let Some(subs) = self.subscribers.get_mut(&source_id) {
                    subs.remove(&observer_id);
                }
            }
        }
    }
}

/// Reactive runtime tracking dependencies between state cells, computed
/// values and effects.
///
/// Every thread has a default runtime. Scoped runtimes can be pushed on top of
/// it for isolation; reactive primitives capture the runtime that was current
/// when they were created.
///
/// # Examples
///
/// ```
/// use larder::runtime::ReactiveRuntime;
/// use larder::Store;
///
/// ReactiveRuntime::scope(|| {
///     let store = Store::builder(0u32).build();
///     assert_eq!(store.state(), 0);
/// });
/// // Runtime and all its state is dropped here
/// ```
pub struct ReactiveRuntime {
    next_id: Cell<usize>,
    graph: RefCell<Graph>,
}

thread_local! {
    static DEFAULT_RUNTIME: Rc<ReactiveRuntime> = ReactiveRuntime::new();
    static RUNTIME_STACK: RefCell<Vec<Rc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    pub fn new() -> Rc<Self> {
        Rc::new(ReactiveRuntime {
            next_id: Cell::new(0),
            graph: RefCell::new(Graph::default()),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// The runtime and everything tracked in it is dropped once the function
    /// returns and no primitive created inside still holds it.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(), f)
    }

    /// The runtime of the current thread used when no scope is active.
    pub fn thread_default() -> Rc<Self> {
        DEFAULT_RUNTIME.with(Rc::clone)
    }

    /// Get the current runtime (innermost scope, or the thread default).
    pub fn current() -> Rc<Self> {
        RUNTIME_STACK
            .with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(Self::thread_default)
    }

    /// Run a function with a specific runtime as the current one.
    ///
    /// ```
    /// use larder::runtime::ReactiveRuntime;
    /// use std::rc::Rc;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// let seen = ReactiveRuntime::with_runtime(runtime.clone(), ReactiveRuntime::current);
    /// assert!(Rc::ptr_eq(&runtime, &seen));
    /// ```
    pub fn with_runtime<F, R>(runtime: Rc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| stack.borrow_mut().push(runtime));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Drop every tracked dependency, effect and computed flag.
    ///
    /// Primitives created before the reset keep working but lose their
    /// subscriptions, so computed values fall back to recomputing on read.
    /// Ids keep counting up so new primitives never alias old ones.
    pub fn clear(&self) {
        *self.graph.borrow_mut() = Graph::default();
    }

    /// Generate the next unique id for a reactive primitive.
    pub fn next_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Record that the current observer, if any, read `source_id`.
    pub fn track_read(&self, source_id: usize) {
        let mut graph = self.graph.borrow_mut();
        if let Some(observer) = graph.current_observer {
            if observer == source_id {
                return;
            }
            graph
                .subscribers
                .entry(source_id)
                .or_default()
                .insert(observer);
            graph.sources.entry(observer).or_default().insert(source_id);
        }
    }

    /// Propagate a change of `source_id` to everything that read it.
    pub fn notify_observers(&self, source_id: usize) {
        let observers: Vec<usize> = {
            let graph = self.graph.borrow();
            match graph.subscribers.get(&source_id) {
                Some(subs) => subs.iter().copied().collect(),
                None => return,
            }
        };

        for observer_id in observers {
            self.mark_observer_dirty(observer_id);
        }
    }

    fn mark_observer_dirty(&self, observer_id: usize) {
        let mut graph = self.graph.borrow_mut();

        if let Some(dirty) = graph.computed.get_mut(&observer_id) {
            if *dirty {
                return;
            }
            *dirty = true;
            drop(graph);
            // A computed value is itself a source for its own readers
            self.notify_observers(observer_id);
            return;
        }

        let effect = graph.effects.get(&observer_id).cloned();
        drop(graph);

        if let Some(effect) = effect {
            self.run_effect(observer_id, &effect);
        }
    }

    /// Register an effect body and run it once, tracking what it reads.
    pub fn create_effect(&self, effect_id: usize, body: Rerun) {
        self.graph
            .borrow_mut()
            .effects
            .insert(effect_id, Rc::clone(&body));
        self.run_effect(effect_id, &body);
    }

    fn run_effect(&self, effect_id: usize, body: &Rerun) {
        self.graph.borrow_mut().unlink(effect_id);
        self.with_observer(effect_id, || body());
    }

    /// Forget an effect or computed value and all its dependency edges.
    pub fn remove_observer(&self, observer_id: usize) {
        let mut graph = self.graph.borrow_mut();
        graph.effects.remove(&observer_id);
        graph.computed.remove(&observer_id);
        graph.unlink(observer_id);
        graph.subscribers.remove(&observer_id);
    }

    /// Run `f` with `observer_id` as the current observer.
    pub fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.swap_observer(Some(observer_id), f)
    }

    /// Run `f` without recording any reads.
    pub fn untracked<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.swap_observer(None, f)
    }

    fn swap_observer<F, R>(&self, observer: Option<usize>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let prev = std::mem::replace(&mut self.graph.borrow_mut().current_observer, observer);
        let restore = RestoreObserver {
            runtime: self,
            prev,
        };
        let result = f();
        drop(restore);
        result
    }

    /// Register a computed value; it starts out dirty.
    pub fn register_computed(&self, computed_id: usize) {
        self.graph.borrow_mut().computed.insert(computed_id, true);
    }

    /// Whether a computed value must be recomputed before its next read.
    pub fn is_dirty(&self, computed_id: usize) -> bool {
        self.graph
            .borrow()
            .computed
            .get(&computed_id)
            .copied()
            .unwrap_or(true)
    }

    /// Drop the previous dependencies of a computed value before it reruns.
    pub fn begin_recompute(&self, computed_id: usize) {
        self.graph.borrow_mut().unlink(computed_id);
    }

    /// Mark a computed value clean after recomputation.
    pub fn mark_clean(&self, computed_id: usize) {
        if let Some(dirty) = self.graph.borrow_mut().computed.get_mut(&computed_id) {
            *dirty = false;
        }
    }

    /// Number of observers currently subscribed to `source_id`.
    pub fn subscriber_count(&self, source_id: usize) -> usize {
        self.graph
            .borrow()
            .subscribers
            .get(&source_id)
            .map_or(0, HashSet::len)
    }
}

struct RestoreObserver<'a> {
    runtime: &'a ReactiveRuntime,
    prev: Option<usize>,
}

impl Drop for RestoreObserver<'_> {
    fn drop(&mut self) {
        if let Ok(mut graph) = self.runtime.graph.try_borrow_mut() {
            graph.current_observer = self.prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_isolates_runtime() {
        let outer = ReactiveRuntime::current();
        let inner = ReactiveRuntime::scope(ReactiveRuntime::current);
        assert!(!Rc::ptr_eq(&outer, &inner));
        assert!(Rc::ptr_eq(&outer, &ReactiveRuntime::current()));
    }

    #[test]
    fn reads_are_tracked_only_under_an_observer() {
        let runtime = ReactiveRuntime::new();
        let source = runtime.next_id();
        let observer = runtime.next_id();

        runtime.track_read(source);
        assert_eq!(runtime.subscriber_count(source), 0);

        runtime.with_observer(observer, || runtime.track_read(source));
        assert_eq!(runtime.subscriber_count(source), 1);

        runtime.with_observer(observer, || {
            runtime.untracked(|| runtime.track_read(runtime.next_id()));
        });
        runtime.remove_observer(observer);
        assert_eq!(runtime.subscriber_count(source), 0);
    }

    #[test]
    fn notify_marks_computed_dirty_transitively() {
        let runtime = ReactiveRuntime::new();
        let source = runtime.next_id();
        let first = runtime.next_id();
        let second = runtime.next_id();

        runtime.register_computed(first);
        runtime.register_computed(second);
        runtime.with_observer(first, || runtime.track_read(source));
        runtime.with_observer(second, || runtime.track_read(first));
        runtime.mark_clean(first);
        runtime.mark_clean(second);

        runtime.notify_observers(source);
        assert!(runtime.is_dirty(first));
        assert!(runtime.is_dirty(second));
    }

    #[test]
    fn clear_never_reuses_ids() {
        let runtime = ReactiveRuntime::new();
        let old = runtime.next_id();
        runtime.register_computed(old);
        runtime.mark_clean(old);

        runtime.clear();
        let fresh = runtime.next_id();
        assert_ne!(fresh, old);

        runtime.register_computed(fresh);
        runtime.mark_clean(fresh);
        // Unknown to the cleared graph, so it must recompute.
        assert!(runtime.is_dirty(old));
    }
}
