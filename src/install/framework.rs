use super::context::{ContextNode, ProvidedStore};
use crate::store::Store;
use std::rc::Rc;

/// Callback a framework runs once per component, right after the instance
/// exists and before it is attached to its parent.
pub type CreationHook = Rc<dyn Fn(&dyn Instance)>;

/// Creation options of a component instance.
#[derive(Debug, Clone, Default)]
pub struct ComponentOptions {
    name: Option<String>,
    store: Option<ProvidedStore>,
}

impl ComponentOptions {
    /// Options with no name and no store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the component, for logs and debugging.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Hand a store to this component and, once the store hook is
    /// installed, to all of its descendants. Normally set on the root only.
    pub fn store<S: 'static>(mut self, store: &Store<S>) -> Self {
        self.store = Some(ProvidedStore::new(store));
        self
    }

    /// The name set with [`name`](Self::name).
    pub fn component_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The store set with [`store`](Self::store).
    pub fn provided_store(&self) -> Option<&ProvidedStore> {
        self.store.as_ref()
    }
}

/// A component instance as seen by creation hooks.
pub trait Instance {
    /// The options the instance was created with.
    fn options(&self) -> &ComponentOptions;

    /// The instance's own context node.
    fn context(&self) -> &ContextNode;

    /// The instance that owns this one, if any.
    fn parent(&self) -> Option<Rc<dyn Instance>>;
}

/// Extension point of a component framework.
pub trait Framework {
    /// Register `hook` to run at every component creation from now on.
    fn mixin(&self, name: &'static str, hook: CreationHook);

    /// Whether a hook was registered under `name`.
    fn has_mixin(&self, name: &str) -> bool;
}
