//! # Larder
//!
//! A centralized reactive store for component-tree UIs.
//!
//! Larder keeps application state in one place and makes it reachable from
//! every component in a tree:
//!
//! ## Store
//!
//! - `Store<S>` - owns the state and the mutation, action and getter tables
//! - `commit` - apply a named synchronous mutation
//! - `dispatch` - run a named action that may suspend before committing
//! - `getters` - memoized values derived from state
//!
//! ## Injection
//!
//! - `install` - register the store hook with a component framework once
//! - `StoreAccess::store` - resolve the root's store from any descendant
//! - `tree` - a headless component tree implementing the framework seams
//!
//! ## Reactivity
//!
//! - `Reactive<S>`, `Computed<T>`, `Effect` - the primitives the store is
//!   built on, for hosts that render from store state
//!
//! ```
//! use larder::install::{install, ComponentOptions, StoreAccess};
//! use larder::tree::App;
//! use larder::Store;
//!
//! #[derive(Clone)]
//! struct Counter {
//!     count: i32,
//! }
//!
//! let store = Store::builder(Counter { count: 0 })
//!     .mutation("inc", |s: &mut Counter, n: i32| s.count += n)
//!     .getter("double", |s: &Counter| s.count * 2)
//!     .build();
//!
//! let app = App::new();
//! install(&app);
//! let root = app.mount(ComponentOptions::new().store(&store));
//! let button = root.child(ComponentOptions::new().name("button"));
//!
//! button.store::<Counter>().unwrap().commit("inc", 3).unwrap();
//! assert_eq!(store.getters().get::<i32>("double").unwrap(), 6);
//! ```

pub mod error;
pub mod install;
pub mod reactive;
pub mod runtime;
pub mod store;
pub mod tree;

// Re-export main types for convenience
pub use error::{Result, StoreError};
pub use install::{install, StoreAccess};
pub use reactive::{Computed, Effect, Reactive};
pub use store::{Dispatched, Getters, Store, StoreOptions, WeakStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = Store::builder(0)
            .mutation("set", |n: &mut i32, v: i32| *n = v)
            .build();
        assert_eq!(store.state(), 0);
        store.commit("set", 42).unwrap();
        assert_eq!(store.state(), 42);
    }
}
