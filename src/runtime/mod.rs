//! Runtime support for reactive primitives.
//!
//! This module provides the infrastructure for dependency tracking,
//! change propagation and scoped execution contexts.

mod context;

pub use context::ReactiveRuntime;
