use super::dispatch::{Dispatched, Executor};
use super::getters::{GetterEntry, Getters};
use super::options::{ActionHandler, Entry, MutationHandler, StoreOptions};
use crate::error::{Result, StoreError};
use crate::reactive::{Effect, Reactive};
use futures::task::SpawnError;
use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

type Subscriber<S> = Rc<dyn Fn(&MutationRecord, &S)>;

/// A committed mutation, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Registered name of the mutation.
    pub name: String,
    /// Type name of the payload it was committed with.
    pub payload_type: &'static str,
}

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) struct StoreInner<S: 'static> {
    pub(super) state: Reactive<S>,
    pub(super) mutations: HashMap<String, Entry>,
    pub(super) actions: HashMap<String, Entry>,
    pub(super) getters: HashMap<String, GetterEntry>,
    pub(super) subscribers: RefCell<Vec<(SubscriptionId, Subscriber<S>)>>,
    pub(super) next_subscription: Cell<u64>,
    pub(super) executor: Executor,
}

/// Centralized state container: one reactive state value, a table of
/// synchronous mutations, a table of actions and a table of getters.
///
/// `Store` is a cheap handle; clones share the same store. Mutations are the
/// only write path: outside a mutation handler the state is read-only.
///
/// # Examples
///
/// ```
/// use larder::Store;
///
/// #[derive(Clone)]
/// struct Counter {
///     count: i32,
/// }
///
/// let store = Store::builder(Counter { count: 0 })
///     .mutation("inc", |s: &mut Counter, n: i32| s.count += n)
///     .action("inc_twice", |store: Store<Counter>, n: i32| async move {
///         store.commit("inc", n)?;
///         store.commit("inc", n)?;
///         anyhow::Ok(())
///     })
///     .getter("double", |s: &Counter| s.count * 2)
///     .build();
///
/// store.dispatch("inc_twice", 2).unwrap();
/// assert_eq!(store.read(|s| s.count), 4);
/// assert_eq!(store.getters().get::<i32>("double").unwrap(), 8);
/// ```
pub struct Store<S: 'static> {
    inner: Rc<StoreInner<S>>,
}

impl<S: 'static> Store<S> {
    /// Start configuring a store with the given initial state.
    pub fn builder(state: S) -> StoreOptions<S> {
        StoreOptions::new(state)
    }

    pub(super) fn from_inner(inner: StoreInner<S>) -> Self {
        Self {
            inner: Rc::new(inner),
        }
    }

    /// Apply the mutation `name` to the state.
    ///
    /// The handler runs synchronously and in place. Reactive observers and
    /// subscribers are notified after it returns. On any error the state is
    /// left untouched.
    pub fn commit<P: 'static>(&self, name: &str, payload: P) -> Result<()> {
        let entry = self.inner.mutations.get(name).ok_or_else(|| {
            warn!(mutation = name, "unknown mutation type");
            StoreError::UnknownMutation(name.to_owned())
        })?;
        let handler = entry.handler::<MutationHandler<S, P>>(name, type_name::<P>())?;

        self.inner
            .state
            .try_update(|state| handler(state, payload))
            .map_err(|_| {
                warn!(mutation = name, "commit while state is borrowed");
                StoreError::StateBusy(name.to_owned())
            })?;
        debug!(mutation = name, "committed");

        self.notify_subscribers(&MutationRecord {
            name: name.to_owned(),
            payload_type: type_name::<P>(),
        });
        Ok(())
    }

    /// Run the action `name`.
    ///
    /// Unknown names, mistyped payloads and a shut-down host spawner fail
    /// here, before any handler runs. Otherwise the action is spawned and,
    /// with the store-owned executor, driven until it first suspends, so an
    /// action that never awaits has finished when this returns. The returned
    /// [`Dispatched`] may be dropped (fire-and-forget) or awaited for the
    /// action's result. Dispatching from inside another executor or another
    /// action is fine.
    pub fn dispatch<P: 'static>(&self, name: &str, payload: P) -> Result<Dispatched> {
        let entry = self.inner.actions.get(name).ok_or_else(|| {
            warn!(action = name, "unknown action type");
            StoreError::UnknownAction(name.to_owned())
        })?;
        let handler = entry.handler::<ActionHandler<S, P>>(name, type_name::<P>())?;
        let executor = &self.inner.executor;
        let refused = |_: SpawnError| {
            warn!(action = name, "executor refused the action");
            StoreError::Spawn(name.to_owned())
        };

        // A shut-down spawner is caught before the handler starts.
        executor.status().map_err(refused)?;
        let (dispatched, task) = Dispatched::track(name, handler(self.clone(), payload), executor);
        executor.spawn(task).map_err(refused)?;
        debug!(action = name, "dispatched");

        executor.run_until_stalled();
        Ok(dispatched)
    }

    /// Read-only view of the registered getters.
    pub fn getters(&self) -> Getters<'_> {
        Getters::new(&self.inner.getters)
    }

    /// Read the state with a function, tracking the read.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.inner.state.with(f)
    }

    /// Get a clone of the current state, tracking the read.
    pub fn state(&self) -> S
    where
        S: Clone,
    {
        self.inner.state.get()
    }

    /// The reactive cell holding the state, for host bindings.
    pub fn reactive(&self) -> &Reactive<S> {
        &self.inner.state
    }

    /// Call `callback` after every committed mutation.
    ///
    /// The state is borrowed while callbacks run, so a callback that commits
    /// gets [`StoreError::StateBusy`].
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&MutationRecord, &S) + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    fn notify_subscribers(&self, record: &MutationRecord) {
        let subscribers: Vec<_> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| Rc::clone(subscriber))
            .collect();

        for subscriber in subscribers {
            self.inner
                .state
                .with_untracked(|state| subscriber(record, state));
        }
    }

    /// Call `on_change(&new, &old)` whenever `select(state)` changes.
    ///
    /// Watching stops when the returned effect is dropped.
    pub fn watch<T, Sel, Cb>(&self, select: Sel, on_change: Cb) -> Effect
    where
        T: Clone + PartialEq + 'static,
        Sel: Fn(&S) -> T + 'static,
        Cb: Fn(&T, &T) + 'static,
    {
        let state = self.inner.state.clone();
        let runtime = Rc::clone(state.runtime());
        let tracker = Rc::clone(&runtime);
        let last: RefCell<Option<T>> = RefCell::new(None);

        Effect::in_runtime(&runtime, move || {
            let next = state.with(&select);
            let previous = last.borrow_mut().replace(next.clone());
            if let Some(previous) = previous {
                if previous != next {
                    tracker.untracked(|| on_change(&next, &previous));
                }
            }
        })
    }

    /// Drive the store-owned executor until no pending action can progress.
    ///
    /// Does nothing for stores running on a host spawner.
    pub fn run_pending(&self) {
        self.inner.executor.run_until_stalled();
    }

    /// Whether a mutation called `name` is registered.
    pub fn has_mutation(&self, name: &str) -> bool {
        self.inner.mutations.contains_key(name)
    }

    /// Whether an action called `name` is registered.
    pub fn has_action(&self, name: &str) -> bool {
        self.inner.actions.contains_key(name)
    }

    /// Non-owning handle to this store.
    pub fn downgrade(&self) -> WeakStore<S> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<S: 'static> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: 'static> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &type_name::<S>())
            .field("mutations", &self.inner.mutations.keys().collect::<Vec<_>>())
            .field("actions", &self.inner.actions.keys().collect::<Vec<_>>())
            .field("getters", &self.inner.getters.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to a [`Store`], held by components.
pub struct WeakStore<S: 'static> {
    inner: Weak<StoreInner<S>>,
}

impl<S: 'static> WeakStore<S> {
    /// The store, if it is still alive.
    pub fn upgrade(&self) -> Option<Store<S>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl<S: 'static> Clone for WeakStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}
