//! The centralized store.
//!
//! A store owns one reactive state value and three tables: synchronous
//! mutations (`commit`), possibly asynchronous actions (`dispatch`) and
//! memoized getters (`getters`).

mod dispatch;
mod getters;
mod options;
mod store;

pub use dispatch::Dispatched;
pub use getters::Getters;
pub use options::StoreOptions;
pub use store::{MutationRecord, Store, SubscriptionId, WeakStore};
