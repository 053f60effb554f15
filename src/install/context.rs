use crate::store::{Store, WeakStore};
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A store handed to a component through its creation options.
///
/// Holds the store weakly: the application wiring owns the store, the
/// component tree only points at it.
#[derive(Clone)]
pub struct ProvidedStore {
    key: TypeId,
    state: &'static str,
    handle: Rc<dyn Any>,
}

impl ProvidedStore {
    /// Weakly wrap `store`, keyed by its state type.
    pub fn new<S: 'static>(store: &Store<S>) -> Self {
        Self {
            key: TypeId::of::<S>(),
            state: type_name::<S>(),
            handle: Rc::new(store.downgrade()),
        }
    }

    /// Type name of the store's state.
    pub fn state_type(&self) -> &'static str {
        self.state
    }
}

impl fmt::Debug for ProvidedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedStore")
            .field("state", &self.state)
            .finish()
    }
}

/// Per-component map of provided stores, keyed by state type.
#[derive(Default)]
pub struct ContextNode {
    stores: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl ContextNode {
    /// An empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a store to this node, replacing any store of the same state type.
    pub fn provide(&self, store: &ProvidedStore) {
        self.stores
            .borrow_mut()
            .insert(store.key, Rc::clone(&store.handle));
    }

    /// The store of state type `S` attached to this node.
    ///
    /// `Some(None)` means a store was attached but has since been dropped.
    pub fn lookup<S: 'static>(&self) -> Option<Option<Store<S>>> {
        let stores = self.stores.borrow();
        let handle = stores.get(&TypeId::of::<S>())?;
        let weak = handle.downcast_ref::<WeakStore<S>>()?;
        Some(weak.upgrade())
    }

    /// Whether no store has been provided here.
    pub fn is_empty(&self) -> bool {
        self.stores.borrow().is_empty()
    }
}

impl fmt::Debug for ContextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextNode")
            .field("stores", &self.stores.borrow().len())
            .finish()
    }
}
