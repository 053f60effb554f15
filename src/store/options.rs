use super::dispatch::Executor;
use super::getters::{GetterCell, GetterEntry};
use super::store::{Store, StoreInner};
use crate::error::{DerivationError, Result, StoreError};
use crate::reactive::{Computed, Reactive};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::LocalSpawn;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::error::Error;
use std::future::Future;
use std::rc::Rc;
use tracing::warn;

pub(crate) type MutationHandler<S, P> = Box<dyn Fn(&mut S, P)>;
pub(crate) type ActionHandler<S, P> = Box<dyn Fn(Store<S>, P) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

type GetterFactory<S> = Box<dyn FnOnce(&Reactive<S>) -> GetterEntry>;

/// Type-erased mutation or action handler with its payload type.
pub(crate) struct Entry {
    handler: Box<dyn Any>,
    payload: &'static str,
}

impl Entry {
    fn new<P: 'static, H: 'static>(handler: H) -> Self {
        Self {
            handler: Box::new(handler),
            payload: type_name::<P>(),
        }
    }

    /// Recover the typed handler, failing when the caller's payload type differs.
    pub(crate) fn handler<H: 'static>(&self, name: &str, actual: &'static str) -> Result<&H> {
        self.handler
            .downcast_ref::<H>()
            .ok_or_else(|| StoreError::PayloadType {
                name: name.to_owned(),
                expected: self.payload,
                actual,
            })
    }
}

/// Configuration of a [`Store`]: initial state plus the mutation, action and
/// getter tables.
///
/// Obtained from [`Store::builder`]. Tables are fixed once [`build`](Self::build)
/// returns.
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
///     .getter("double", |s: &Counter| s.count * 2)
///     .build();
///
/// store.commit("inc", 3).unwrap();
/// assert_eq!(store.state().count, 3);
/// assert_eq!(store.getters().get::<i32>("double").unwrap(), 6);
/// ```
pub struct StoreOptions<S: 'static> {
    state: S,
    mutations: HashMap<String, Entry>,
    actions: HashMap<String, Entry>,
    getters: Vec<(String, GetterFactory<S>)>,
    spawner: Option<Rc<dyn LocalSpawn>>,
}

impl<S: 'static> StoreOptions<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            state,
            mutations: HashMap::new(),
            actions: HashMap::new(),
            getters: Vec::new(),
            spawner: None,
        }
    }

    /// Register a synchronous mutation handler.
    ///
    /// The handler receives the state mutably and the payload passed to
    /// `commit`. It must not start asynchronous work.
    pub fn mutation<P, F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        P: 'static,
        F: Fn(&mut S, P) + 'static,
    {
        let handler: MutationHandler<S, P> = Box::new(handler);
        insert_entry(&mut self.mutations, "mutation", name.into(), Entry::new::<P, _>(handler));
        self
    }

    /// Register an action handler.
    ///
    /// The handler receives a handle to the store and the payload passed to
    /// `dispatch`, and returns a future that may commit, dispatch or suspend.
    pub fn action<P, F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        P: 'static,
        F: Fn(Store<S>, P) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let handler: ActionHandler<S, P> =
            Box::new(move |store, payload| handler(store, payload).boxed_local());
        insert_entry(&mut self.actions, "action", name.into(), Entry::new::<P, _>(handler));
        self
    }

    /// Register a getter deriving a value from state.
    pub fn getter<V, F>(self, name: impl Into<String>, derive: F) -> Self
    where
        V: Clone + 'static,
        F: Fn(&S) -> V + 'static,
    {
        self.register_getter(name.into(), move |state: &S| Ok(derive(state)))
    }

    /// Register a getter whose derivation can fail.
    ///
    /// A failure surfaces as [`StoreError::GetterDerivation`] on read.
    pub fn try_getter<V, E, F>(self, name: impl Into<String>, derive: F) -> Self
    where
        V: Clone + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
        F: Fn(&S) -> std::result::Result<V, E> + 'static,
    {
        self.register_getter(name.into(), move |state: &S| {
            derive(state).map_err(|err| {
                let boxed: Box<dyn Error + Send + Sync> = err.into();
                DerivationError::from(boxed)
            })
        })
    }

    fn register_getter<V, F>(mut self, name: String, derive: F) -> Self
    where
        V: Clone + 'static,
        F: Fn(&S) -> std::result::Result<V, DerivationError> + 'static,
    {
        if self.getters.iter().any(|(existing, _)| *existing == name) {
            warn!(getter = %name, "getter registered twice, keeping the last one");
            self.getters.retain(|(existing, _)| *existing != name);
        }

        let factory: GetterFactory<S> = Box::new(move |state: &Reactive<S>| {
            let state = state.clone();
            let runtime = Rc::clone(state.runtime());
            let cell: GetterCell<V> = Computed::in_runtime(runtime, move || state.with(&derive));
            GetterEntry::new(cell)
        });
        self.getters.push((name, factory));
        self
    }

    /// Drive actions on a host-provided local executor instead of the
    /// store-owned action queue.
    pub fn spawner(mut self, spawner: impl LocalSpawn + 'static) -> Self {
        self.spawner = Some(Rc::new(spawner));
        self
    }

    /// Wrap the state in a reactive cell, build the getter view and return
    /// the store.
    pub fn build(self) -> Store<S> {
        let state = Reactive::new(self.state);
        let getters = self
            .getters
            .into_iter()
            .map(|(name, factory)| (name, factory(&state)))
            .collect();
        let executor = match self.spawner {
            Some(spawner) => Executor::Host(spawner),
            None => Executor::owned(),
        };

        Store::from_inner(StoreInner {
            state,
            mutations: self.mutations,
            actions: self.actions,
            getters,
            subscribers: Default::default(),
            next_subscription: Default::default(),
            executor,
        })
    }
}

fn insert_entry(table: &mut HashMap<String, Entry>, kind: &str, name: String, entry: Entry) {
    if table.contains_key(&name) {
        warn!(kind, name = %name, "handler registered twice, keeping the last one");
    }
    table.insert(name, entry);
}
