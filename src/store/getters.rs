use crate::error::{DerivationError, Result, StoreError};
use crate::reactive::Computed;
use std::any::{type_name, Any};
use std::collections::HashMap;

pub(crate) type GetterCell<V> = Computed<std::result::Result<V, DerivationError>>;

/// One registered getter: its computed cell, type-erased.
pub(crate) struct GetterEntry {
    cell: Box<dyn Any>,
    value: &'static str,
}

impl GetterEntry {
    pub(crate) fn new<V: Clone + 'static>(cell: GetterCell<V>) -> Self {
        Self {
            cell: Box::new(cell),
            value: type_name::<V>(),
        }
    }
}

/// Read-only view over a store's getters.
///
/// Each read returns the derivation's value for the current state. The value
/// is cached and only recomputed after a commit changed the state.
pub struct Getters<'a> {
    table: &'a HashMap<String, GetterEntry>,
}

impl<'a> Getters<'a> {
    pub(crate) fn new(table: &'a HashMap<String, GetterEntry>) -> Self {
        Self { table }
    }

    /// Read the getter `name` as a `V`.
    ///
    /// # Panics
    ///
    /// A panic raised by the derivation propagates to the caller.
    pub fn get<V: Clone + 'static>(&self, name: &str) -> Result<V> {
        let entry = self
            .table
            .get(name)
            .ok_or_else(|| StoreError::UnknownGetter(name.to_owned()))?;
        let cell = entry
            .cell
            .downcast_ref::<GetterCell<V>>()
            .ok_or_else(|| StoreError::GetterType {
                name: name.to_owned(),
                expected: entry.value,
                requested: type_name::<V>(),
            })?;

        cell.get().map_err(|source| StoreError::GetterDerivation {
            name: name.to_owned(),
            source,
        })
    }

    /// Whether a getter called `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Names of all registered getters, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.table.keys().map(String::as_str)
    }

    /// Number of registered getters.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the store has no getters.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
