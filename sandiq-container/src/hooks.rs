//! Resolving hooks and container-aware injection.
//!
//! Hooks run on every freshly built object, before it is cached or
//! returned: global hooks first, then hooks on the alias that was
//! requested, then hooks on the canonical key, each in registration
//! order. They mutate the object in place and cannot replace it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::container::{Container, WeakContainer};
use crate::key::Key;

/// A resolving hook: `(object, container)`.
pub type HookFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), &Container) + Send + Sync>;

type AwareFn = fn(&mut (dyn Any + Send + Sync), &Container) -> bool;

/// Types that want a handle to the container that built them.
///
/// Register the type with
/// [`Container::container_aware`](crate::container::Container::container_aware);
/// the handle is injected right after construction, before any user hook.
pub trait ContainerAware {
    fn set_container(&mut self, container: WeakContainer);
}

#[derive(Clone, Default)]
pub(crate) struct Hooks {
    global: Vec<HookFn>,
    keyed: HashMap<Key, Vec<HookFn>>,
    aware: Vec<(TypeId, AwareFn)>,
}

impl Hooks {
    pub fn on_any(&mut self, hook: HookFn) {
        self.global.push(hook);
    }

    pub fn on(&mut self, key: Key, hook: HookFn) {
        self.keyed.entry(key).or_default().push(hook);
    }

    pub fn aware<T: ContainerAware + Send + Sync + 'static>(&mut self) {
        let type_id = TypeId::of::<T>();
        if !self.aware.iter().any(|(id, _)| *id == type_id) {
            let caster: AwareFn = inject::<T>;
            self.aware.push((type_id, caster));
        }
    }

    /// Hooks to run for one build, in firing order.
    pub fn chain_for(&self, alias: Option<&Key>, key: &Key) -> Vec<HookFn> {
        let mut chain = self.global.clone();
        if let Some(hooks) = alias.and_then(|alias| self.keyed.get(alias)) {
            chain.extend(hooks.iter().cloned());
        }
        if let Some(hooks) = self.keyed.get(key) {
            chain.extend(hooks.iter().cloned());
        }
        chain
    }

    fn casters(&self) -> Vec<AwareFn> {
        self.aware.iter().map(|(_, caster)| *caster).collect()
    }

    pub fn global_count(&self) -> usize {
        self.global.len()
    }
}

/// The universal global hook installed first by every container.
pub(crate) fn container_aware_hook() -> HookFn {
    Arc::new(|object: &mut (dyn Any + Send + Sync), container: &Container| {
        let casters = container.with_registry(|registry| registry.hooks.casters());
        for caster in casters {
            if caster(object, container) {
                break;
            }
        }
    })
}

/// Wraps a typed hook; objects of other types pass through untouched.
pub(crate) fn typed<T, F>(hook: F) -> HookFn
where
    T: Send + Sync + 'static,
    F: Fn(&mut T, &Container) + Send + Sync + 'static,
{
    Arc::new(move |object: &mut (dyn Any + Send + Sync), container: &Container| {
        if let Some(object) = object.downcast_mut::<T>() {
            hook(object, container);
        }
    })
}

fn inject<T: ContainerAware + Send + Sync + 'static>(
    object: &mut (dyn Any + Send + Sync),
    container: &Container,
) -> bool {
    match object.downcast_mut::<T>() {
        Some(aware) => {
            aware.set_container(container.downgrade());
            true
        }
        None => false,
    }
}
