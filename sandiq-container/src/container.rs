//! # The Container
//!
//! Stores bindings keyed by strings and builds object graphs on demand.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container ──scope()──> Container (per unit of work)
//!                                   │
//!                               resolve(key)
//!                                   │
//!                                   ▼
//!                      Resolver (one per top-level call:
//!                      protection, cycle chain, argument forcing)
//! ```
//!
//! # Examples
//! ```rust
//! use sandiq_container::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Logger {
//!     path: String,
//! }
//!
//! #[derive(Debug)]
//! struct Service {
//!     logger: Arc<Logger>,
//! }
//!
//! let container = Container::new();
//! container.autowire_definition(
//!     Key::of::<Logger>(),
//!     Definition::builder("app::Logger::new")
//!         .scalar_or("path", String::from("/tmp/log"))
//!         .build(|args| Ok(Logger { path: args.value(0)? })),
//! );
//! container.autowire_definition(
//!     Key::of::<Service>(),
//!     Definition::builder("app::Service::new")
//!         .class::<Logger>("logger")
//!         .build(|args| Ok(Service { logger: args.object(0)? })),
//! );
//!
//! let service = container.get::<Service>().expect("Failed to resolve");
//! assert_eq!(service.logger.path, "/tmp/log");
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace};

use crate::autowire::{self, Injectable};
use crate::definition::{Callable, Definition};
use crate::error::{Result, SandiqError};
use crate::factory::Factory;
use crate::hooks::{self, ContainerAware};
use crate::key::{IntoKeys, Key};
use crate::provider::ServiceProvider;
use crate::registry::{Recipe, Registry};
use crate::resolver::Resolver;
use crate::value::{Object, Params};

// ============================================================
// Settings & ContainerBuilder
// ============================================================

/// Container-wide switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Build unbound keys from the autowire catalog.
    pub autowiring: bool,
    /// Include `#[derive(Injectable)]` types collected at link time.
    pub global_catalog: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autowiring: true,
            global_catalog: true,
        }
    }
}

/// Builds a [`Container`] and runs its service providers.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .autowiring(false)
///     .provider(DatabaseProvider)
///     .provider(MailProvider)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    settings: Settings,
    providers: Vec<Arc<dyn ServiceProvider>>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            settings: Settings::default(),
            providers: Vec::new(),
        }
    }

    /// Enable or disable autowiring of unbound keys.
    pub fn autowiring(mut self, enabled: bool) -> Self {
        self.settings.autowiring = enabled;
        self
    }

    /// Enable or disable the link-time `Injectable` catalog.
    pub fn global_catalog(mut self, enabled: bool) -> Self {
        self.settings.global_catalog = enabled;
        self
    }

    /// Add a [`ServiceProvider`]; registered and booted by [`build`](Self::build).
    pub fn provider(mut self, provider: impl ServiceProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Creates the container, registers every provider, then boots them.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        info!(providers = self.providers.len(), "Building container");

        let container = Container::with_settings(self.settings);
        for provider in self.providers {
            container.register_shared_provider(provider)?;
        }
        container.boot()?;

        info!("Container built successfully ✓");
        Ok(container)
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

struct Inner {
    settings: Settings,
    registry: RwLock<Registry>,
    instances: DashMap<Key, Object>,
    providers: Mutex<Providers>,
}

#[derive(Default)]
struct Providers {
    registered: Vec<Arc<dyn ServiceProvider>>,
    booted: bool,
}

/// The service container.
///
/// A cheap-to-clone handle; clones share bindings and the
/// shared-instance cache. Bindings are meant to be registered during
/// boot, before request-scoped work starts resolving.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates a container with default [`Settings`].
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn with_settings(settings: Settings) -> Self {
        let mut registry = Registry::new();
        registry.hooks.on_any(hooks::container_aware_hook());
        Self::from_parts(settings, registry, DashMap::new(), false)
    }

    fn from_parts(
        settings: Settings,
        registry: Registry,
        instances: DashMap<Key, Object>,
        booted: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                registry: RwLock::new(registry),
                instances,
                providers: Mutex::new(Providers {
                    registered: Vec::new(),
                    booted,
                }),
            }),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings
    }

    // ── Bindings ──

    /// Registers how to build `key`, replacing any previous factory.
    ///
    /// `recipe` is a [`Definition`], a `(key, "method")` pair or a
    /// [`Recipe::closure`]. Non-empty `params` become the key's param
    /// table. A cached instance of `key` is dropped.
    ///
    /// # Errors
    /// [`SandiqError::InvalidFactory`] for an instance-method definition
    /// (it has no receiver) or a method recipe with an empty name.
    pub fn define(&self, key: impl Into<Key>, recipe: impl Into<Recipe>, params: Params) -> Result<()> {
        let key = key.into();
        let recipe = recipe.into();
        validate_recipe(&key, &recipe)?;

        self.inner.registry.write().define(&key, recipe, params);
        self.inner.instances.remove(&key);
        Ok(())
    }

    /// [`define`](Self::define) for a closure factory.
    pub fn define_with<R, F>(&self, key: impl Into<Key>, factory: F) -> Result<()>
    where
        R: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<R> + Send + Sync + 'static,
    {
        self.define(key, Recipe::closure(factory), Params::new())
    }

    /// Marks keys as shared: built once, then reused. Idempotent.
    pub fn share(&self, keys: impl IntoKeys) {
        let mut registry = self.inner.registry.write();
        for key in keys.into_keys() {
            registry.share(&key);
        }
    }

    /// Binds an already built object; implies shared.
    pub fn instance(&self, key: impl Into<Key>, object: Object) {
        let key = key.into();
        self.inner.registry.write().seed(&key, object.clone());
        self.inner.instances.insert(key, object);
    }

    /// Binds `value` under its own type key.
    pub fn instance_value<T: Send + Sync + 'static>(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.instance(Key::of::<T>(), value.clone());
        value
    }

    /// Makes each alias resolve to `canonical`.
    pub fn alias(&self, canonical: impl Into<Key>, aliases: impl IntoKeys) {
        let canonical = canonical.into();
        let mut registry = self.inner.registry.write();
        for alias in aliases.into_keys() {
            registry.alias(&canonical, alias);
        }
    }

    /// Merges overrides into the param tables of `keys`.
    pub fn params(&self, keys: impl IntoKeys, params: Params) {
        let mut registry = self.inner.registry.write();
        for key in keys.into_keys() {
            registry.merge_params(&key, &params);
        }
    }

    /// Forbids resolving `keys` directly; they stay available as dependencies.
    pub fn internal(&self, keys: impl IntoKeys) {
        let mut registry = self.inner.registry.write();
        for key in keys.into_keys() {
            registry.mark_internal(&key);
        }
    }

    /// `true` if the key (after aliasing) has an instance, a factory, or is shared.
    pub fn is_bound(&self, key: impl Into<Key>) -> bool {
        self.inner.registry.read().is_bound(&key.into())
    }

    pub fn is_shared(&self, key: impl Into<Key>) -> bool {
        let registry = self.inner.registry.read();
        let (_, canonical) = registry.canonical(&key.into());
        registry.is_shared(&canonical)
    }

    pub fn is_alias(&self, key: impl Into<Key>) -> bool {
        self.inner.registry.read().is_alias(&key.into())
    }

    // ── Autowiring & methods ──

    /// Adds `T` and its methods to this container's autowire catalog.
    pub fn autowire<T: Injectable>(&self) {
        let key = Key::of::<T>();
        let mut registry = self.inner.registry.write();
        registry.add_catalog(&key, T::definition());
        for method in T::methods() {
            registry.add_method(&key, method);
        }
    }

    /// Adds a hand-written definition to the autowire catalog.
    pub fn autowire_definition(&self, key: impl Into<Key>, definition: Definition) {
        self.inner.registry.write().add_catalog(&key.into(), definition);
    }

    /// Registers a method callable by name on `key`.
    ///
    /// Instance-method definitions get a receiver resolved from `key`;
    /// function definitions are static and construct nothing.
    pub fn method(&self, key: impl Into<Key>, definition: Definition) {
        self.inner.registry.write().add_method(&key.into(), definition);
    }

    // ── Hooks ──

    /// Runs `hook` on every fresh object built for `key` whose type is `T`.
    pub fn resolving<T, F>(&self, key: impl Into<Key>, hook: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, &Container) + Send + Sync + 'static,
    {
        let key = key.into();
        debug!(key = %key, "Registered resolving hook");
        self.inner.registry.write().hooks.on(key, hooks::typed(hook));
    }

    /// Runs `hook` on every freshly built object.
    pub fn resolving_any<F>(&self, hook: F)
    where
        F: Fn(&mut (dyn std::any::Any + Send + Sync), &Container) + Send + Sync + 'static,
    {
        debug!("Registered global resolving hook");
        self.inner.registry.write().hooks.on_any(Arc::new(hook));
    }

    /// Injects a [`WeakContainer`] into every freshly built `T`.
    pub fn container_aware<T: ContainerAware + Send + Sync + 'static>(&self) {
        debug!(type_name = type_name::<T>(), "Registered container-aware type");
        self.inner.registry.write().hooks.aware::<T>();
    }

    // ── Resolution ──

    /// Resolves `key` as a direct request from outside the container.
    ///
    /// ```rust,ignore
    /// let db = container.resolve("db")?;
    /// ```
    pub fn resolve(&self, key: impl Into<Key>) -> Result<Object> {
        self.resolve_with(key, Params::new())
    }

    /// Resolves `key` with call-site overrides on top of the registered ones.
    ///
    /// Overrides are ignored when a shared instance is already cached.
    pub fn resolve_with(&self, key: impl Into<Key>, params: Params) -> Result<Object> {
        let key = key.into();
        trace!(key = %key, "Resolving");
        Resolver::new(self).resolve_top(&key, &params)
    }

    /// [`resolve`](Self::resolve) followed by a downcast to `T`.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, key: impl Into<Key>) -> Result<Arc<T>> {
        let key = key.into();
        let object = self.resolve(key.clone())?;
        downcast(key, object)
    }

    /// Resolves `T` under its own type key.
    ///
    /// ```rust,ignore
    /// let service: Arc<Service> = container.get()?;
    /// ```
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_as::<T>(Key::of::<T>())
    }

    /// Calls a function or method with autowired arguments.
    pub fn invoke(&self, callable: impl Into<Callable>, params: Params) -> Result<Object> {
        let callable = callable.into();
        Resolver::new(self).invoke_top(&callable, &params)
    }

    /// [`invoke`](Self::invoke) followed by a downcast to `T`.
    pub fn invoke_as<T: Send + Sync + 'static>(
        &self,
        callable: impl Into<Callable>,
        params: Params,
    ) -> Result<Arc<T>> {
        let callable = callable.into();
        let key = match callable {
            Callable::Definition(ref definition) => Key::from(definition.name().to_owned()),
            Callable::Method { ref target, ref method } => {
                Key::from(format!("{}::{method}", target.key()))
            }
        };
        let object = self.invoke(callable, params)?;
        downcast(key, object)
    }

    /// A deferred factory for `key` with `params` bound, usable as another
    /// argument's value.
    pub fn get_factory(&self, key: impl Into<Key>, params: Params) -> Factory {
        Factory::for_key(key).bind(params)
    }

    // ── Providers ──

    /// Runs `provider.register`; the provider is booted by [`boot`](Self::boot),
    /// or right away when the container has already booted.
    pub fn register_provider(&self, provider: impl ServiceProvider + 'static) -> Result<()> {
        self.register_shared_provider(Arc::new(provider))
    }

    fn register_shared_provider(&self, provider: Arc<dyn ServiceProvider>) -> Result<()> {
        debug!(provider = provider.name(), "Registering provider");
        provider.register(self)?;

        let booted = {
            let mut providers = self.inner.providers.lock();
            providers.registered.push(provider.clone());
            providers.booted
        };
        if booted {
            provider.boot(self)?;
        }
        Ok(())
    }

    /// Boots every registered provider once, in registration order.
    pub fn boot(&self) -> Result<()> {
        let pending = {
            let mut providers = self.inner.providers.lock();
            if providers.booted {
                return Ok(());
            }
            providers.booted = true;
            providers.registered.clone()
        };

        for provider in pending {
            debug!(provider = provider.name(), "Booting provider");
            provider.boot(self)?;
        }
        Ok(())
    }

    // ── Scopes ──

    /// Forks a container for one unit of work (e.g. one request).
    ///
    /// Bindings are copied and `instance()` seeds carry over; shared
    /// objects built lazily by the parent do not.
    pub fn scope(&self) -> Container {
        let registry = self.inner.registry.read().clone();
        let instances = DashMap::new();
        for (key, object) in registry.seeded() {
            instances.insert(key.clone(), object.clone());
        }
        let booted = self.inner.providers.lock().booted;

        debug!(bindings = registry.len(), "Creating new scope");
        Self::from_parts(self.inner.settings, registry, instances, booted)
    }

    /// A handle that does not keep the container alive.
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// `true` if both handles point at the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Crate internals ──

    pub(crate) fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.inner.registry.read())
    }

    pub(crate) fn cached(&self, key: &Key) -> Option<Object> {
        self.inner.instances.get(key).map(|entry| entry.value().clone())
    }

    /// Caches `object` unless another build won the race; returns the
    /// cached identity either way.
    pub(crate) fn store(&self, key: Key, object: Object) -> Object {
        self.inner.instances.entry(key).or_insert(object).value().clone()
    }

    /// Autowire definition for `key`, if autowiring applies.
    pub(crate) fn autowire_lookup(&self, key: &Key) -> Option<Definition> {
        if !self.inner.settings.autowiring {
            return None;
        }
        self.with_registry(|registry| registry.catalog(key)).or_else(|| {
            self.inner
                .settings
                .global_catalog
                .then(|| autowire::global_definition(key))
                .flatten()
        })
    }

    /// Method lookup across this container and the global catalog.
    pub(crate) fn method_lookup(&self, key: &Key, method: &str) -> Option<Definition> {
        self.with_registry(|registry| registry.method(key, method)).or_else(|| {
            self.inner
                .settings
                .global_catalog
                .then(|| autowire::global_method(key, method))
                .flatten()
        })
    }

    pub(crate) fn suggestions(&self, key: &Key) -> Vec<String> {
        let registry = self.inner.registry.read();
        sandiq_support::rendering::suggest_similar(key.as_str(), &registry.known_keys(), 3)
    }
}

fn validate_recipe(key: &Key, recipe: &Recipe) -> Result<()> {
    let reason = match recipe {
        Recipe::Definition(definition) if definition.is_instance_method() => format!(
            "{} is an instance method; register it with .method() and define ({}, \"{}\")",
            definition.name(),
            definition.receiver().map(Key::as_str).unwrap_or_default(),
            definition.method_name()
        ),
        Recipe::Method { key: owner, method } if owner.as_str().is_empty() || method.is_empty() => {
            format!("method factory needs a key and a method name, got ({owner:?}, {method:?})")
        }
        _ => return Ok(()),
    };
    Err(SandiqError::InvalidFactory {
        key: key.clone(),
        reason,
    })
}

pub(crate) fn downcast<T: Send + Sync + 'static>(key: Key, object: Object) -> Result<Arc<T>> {
    object.downcast::<T>().map_err(|_| SandiqError::TypeMismatch {
        key,
        expected: type_name::<T>(),
    })
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Container")
            .field("bindings", &registry.len())
            .field("aliases", &registry.alias_count())
            .field("instances", &self.inner.instances.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

// ═══════════════════════════════════════════
// WeakContainer
// ═══════════════════════════════════════════

/// Non-owning container handle, handed to [`ContainerAware`] objects.
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<Inner>,
}

impl WeakContainer {
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl fmt::Debug for WeakContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ═══════════════════════════════════════════
// Free function for use inside factories
// ═══════════════════════════════════════════

/// Resolve a typed dependency from a [`Resolver`].
///
/// Use this inside factory closures:
///
/// ```rust,ignore
/// container.define_with("mailer", |r| {
///     let transport: Arc<Transport> = sandiq_container::container::resolve(r, "mailer.transport")?;
///     Ok(Mailer::new(transport))
/// })?;
/// ```
pub fn resolve<T: Send + Sync + 'static>(resolver: &Resolver<'_>, key: impl Into<Key>) -> Result<Arc<T>> {
    resolver.resolve_as::<T>(key)
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{resolve, Container, ContainerBuilder, Settings, WeakContainer};
    pub use crate::argument::{Argument, ArgumentKind};
    pub use crate::autowire::Injectable;
    pub use crate::definition::{Args, Callable, Definition, Target};
    pub use crate::error::{Result, SandiqError};
    pub use crate::factory::Factory;
    pub use crate::hooks::ContainerAware;
    pub use crate::key::{IntoKeys, Key};
    pub use crate::provider::ServiceProvider;
    pub use crate::registry::Recipe;
    pub use crate::resolver::Resolver;
    pub use crate::value::{Built, Object, Params, Value};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
