//! Reactive primitives the store is built on.
//!
//! - `Reactive<S>`: the state cell; reads are tracked, writes notify
//! - `Computed<T>`: memoized derivation, recomputed only after a change
//! - `Effect`: side effect re-run whenever what it read changes

mod computed;
mod effect;
mod reactive;

pub use computed::Computed;
pub use effect::Effect;
pub use reactive::Reactive;
