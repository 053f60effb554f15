//! Tree-wide store injection.
//!
//! [`install`] registers a creation hook with a component framework. The
//! root component receives the store through its options and keeps it on
//! its own context node; every descendant resolves it by walking its
//! ancestor chain. Nothing is stored in process-wide state, so independent
//! trees can carry independent stores.

mod context;
mod framework;
mod installer;

pub use context::{ContextNode, ProvidedStore};
pub use framework::{ComponentOptions, CreationHook, Framework, Instance};
pub use installer::{install, resolve, StoreAccess, STORE_MIXIN};
