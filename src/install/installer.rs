use super::framework::{Framework, Instance};
use crate::error::{Result, StoreError};
use crate::store::Store;
use std::any::type_name;
use std::rc::Rc;
use tracing::{debug, warn};

/// Name under which the store hook is registered.
pub const STORE_MIXIN: &str = "larder::store";

/// Register the store creation hook with `framework`.
///
/// Call once, before mounting the root component. From then on a component
/// created with [`ComponentOptions::store`](super::ComponentOptions::store)
/// makes that store reachable from itself and every descendant through
/// [`StoreAccess::store`].
///
/// Installing twice on the same framework does nothing and returns `false`.
pub fn install<F: Framework + ?Sized>(framework: &F) -> bool {
    if framework.has_mixin(STORE_MIXIN) {
        warn!("store hook already installed, ignoring");
        return false;
    }

    framework.mixin(STORE_MIXIN, Rc::new(attach_store));
    debug!("store hook installed");
    true
}

fn attach_store(instance: &dyn Instance) {
    if let Some(store) = instance.options().provided_store() {
        instance.context().provide(store);
        debug!(
            component = instance.options().component_name().unwrap_or("<anonymous>"),
            state = store.state_type(),
            "store attached"
        );
    }
}

/// Resolve the store of state type `S` visible from `instance`: its own
/// context node first, then each ancestor's.
pub fn resolve<S: 'static, I: Instance + ?Sized>(instance: &I) -> Result<Store<S>> {
    let not_found = || StoreError::StoreNotFound {
        state: type_name::<S>(),
    };

    if let Some(found) = instance.context().lookup::<S>() {
        return found.ok_or_else(not_found);
    }

    let mut cursor = instance.parent();
    while let Some(ancestor) = cursor {
        if let Some(found) = ancestor.context().lookup::<S>() {
            return found.ok_or_else(not_found);
        }
        cursor = ancestor.parent();
    }

    Err(not_found())
}

/// Store accessor available on every component instance.
pub trait StoreAccess {
    /// The store provided at the root of this instance's tree.
    ///
    /// Fails with [`StoreError::StoreNotFound`] when no ancestor carries a
    /// live store of state type `S`, including when the store hook was never
    /// installed.
    fn store<S: 'static>(&self) -> Result<Store<S>>;
}

impl<T: Instance + ?Sized> StoreAccess for T {
    fn store<S: 'static>(&self) -> Result<Store<S>> {
        resolve(self)
    }
}
