//! A minimal headless component framework.
//!
//! Implements the [`Framework`](crate::install::Framework) and
//! [`Instance`](crate::install::Instance) seams so stores can be injected into
//! a component tree without a real UI toolkit.

mod component;

pub use component::{App, Component};
