//! Binding tables: everything the container knows how to build.
//!
//! The registry maps [`Key`]s to their [`Binding`] (factory, shared flag,
//! seeded instance, param overrides, internal flag), plus the alias,
//! method, autowire-catalog and hook tables. It holds no built objects
//! except `instance()` seeds; the shared-instance cache lives in the
//! container.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::definition::Definition;
use crate::error::Result;
use crate::hooks::Hooks;
use crate::key::Key;
use crate::resolver::Resolver;
use crate::value::{Built, Object, Params};

/// Factory closure: receives the in-flight [`Resolver`] and builds one object.
///
/// # Why `Arc` and not `Box`?
/// Recipes are cloned out of the tables before they run, so no lock is
/// held while user code executes.
pub type ClosureFn = Arc<dyn Fn(&Resolver<'_>) -> Result<Built> + Send + Sync>;

/// The accepted shapes of a factory passed to
/// [`Container::define`](crate::container::Container::define).
#[derive(Clone)]
pub enum Recipe {
    /// Plain closure over the resolver.
    Closure(ClosureFn),
    /// Autowired definition.
    Definition(Definition),
    /// Late-bound method: resolve `key`, then call `method` on it.
    Method { key: Key, method: String },
}

impl Recipe {
    /// Wraps a closure returning any value.
    pub fn closure<R, F>(factory: F) -> Self
    where
        R: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<R> + Send + Sync + 'static,
    {
        Self::Closure(Arc::new(move |resolver: &Resolver<'_>| {
            Ok(Box::new(factory(resolver)?) as Built)
        }))
    }

    /// Late-bound method factory.
    pub fn method(key: impl Into<Key>, method: impl Into<String>) -> Self {
        Self::Method {
            key: key.into(),
            method: method.into(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Closure(_) => "closure".to_string(),
            Self::Definition(definition) => format!("definition {}", definition.name()),
            Self::Method { key, method } => format!("method {key}::{method}"),
        }
    }
}

impl From<Definition> for Recipe {
    fn from(definition: Definition) -> Self {
        Self::Definition(definition)
    }
}

impl<K: Into<Key>> From<(K, &str)> for Recipe {
    fn from((key, method): (K, &str)) -> Self {
        Self::method(key, method)
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipe({})", self.describe())
    }
}

/// Everything registered for a single key.
#[derive(Clone, Default)]
pub(crate) struct Binding {
    pub recipe: Option<Recipe>,
    pub shared: bool,
    pub instance: Option<Object>,
    pub params: Params,
    pub internal: bool,
}

impl Binding {
    /// Bound means "resolving this key is explicitly configured".
    pub fn is_bound(&self) -> bool {
        self.recipe.is_some() || self.instance.is_some() || self.shared
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("recipe", &self.recipe)
            .field("shared", &self.shared)
            .field("instance", &self.instance.is_some())
            .field("params", &self.params)
            .field("internal", &self.internal)
            .finish()
    }
}

/// All binding tables of one container.
///
/// Populated during boot; cloned wholesale when a scope is forked.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    bindings: HashMap<Key, Binding>,
    aliases: HashMap<Key, Key>,
    methods: HashMap<Key, HashMap<String, Definition>>,
    catalog: HashMap<Key, Definition>,
    pub hooks: Hooks,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn binding_mut(&mut self, key: &Key) -> &mut Binding {
        self.bindings.entry(key.clone()).or_default()
    }

    /// Replaces the recipe for `key`. Non-empty `params` replace the
    /// key's param table; empty ones leave it untouched.
    pub fn define(&mut self, key: &Key, recipe: Recipe, params: Params) {
        debug!(key = %key, recipe = %recipe.describe(), "Defined factory");
        let binding = self.binding_mut(key);
        binding.recipe = Some(recipe);
        binding.instance = None;
        if !params.is_empty() {
            binding.params = params;
        }
    }

    pub fn share(&mut self, key: &Key) {
        debug!(key = %key, "Marked shared");
        self.binding_mut(key).shared = true;
    }

    /// Seeds a pre-built instance; implies shared.
    pub fn seed(&mut self, key: &Key, object: Object) {
        debug!(key = %key, "Seeded instance");
        let binding = self.binding_mut(key);
        binding.instance = Some(object);
        binding.shared = true;
    }

    /// Registers `alias` → `canonical`. Self-aliases are ignored.
    pub fn alias(&mut self, canonical: &Key, alias: Key) {
        if &alias == canonical {
            return;
        }
        debug!(from = %alias, to = %canonical, "Registered alias");
        self.aliases.insert(alias, canonical.clone());
    }

    pub fn merge_params(&mut self, key: &Key, params: &Params) {
        debug!(key = %key, count = params.len(), "Merged params");
        self.binding_mut(key).params.merge(params);
    }

    pub fn mark_internal(&mut self, key: &Key) {
        debug!(key = %key, "Marked internal");
        self.binding_mut(key).internal = true;
    }

    pub fn add_method(&mut self, key: &Key, definition: Definition) {
        debug!(key = %key, method = definition.method_name(), "Registered method");
        self.methods
            .entry(key.clone())
            .or_default()
            .insert(definition.method_name().to_owned(), definition);
    }

    pub fn add_catalog(&mut self, key: &Key, definition: Definition) {
        debug!(key = %key, definition = definition.name(), "Registered autowire definition");
        self.catalog.insert(key.clone(), definition);
    }

    /// Follows one alias hop. Returns `(alias, canonical)`.
    pub fn canonical(&self, key: &Key) -> (Option<Key>, Key) {
        match self.aliases.get(key) {
            Some(target) => {
                trace!(from = %key, to = %target, "Following alias");
                (Some(key.clone()), target.clone())
            }
            None => (None, key.clone()),
        }
    }

    pub fn is_bound(&self, key: &Key) -> bool {
        let (_, canonical) = self.canonical(key);
        self.bindings.get(&canonical).is_some_and(Binding::is_bound)
    }

    pub fn is_shared(&self, key: &Key) -> bool {
        self.bindings.get(key).is_some_and(|binding| binding.shared)
    }

    pub fn is_alias(&self, key: &Key) -> bool {
        self.aliases.contains_key(key)
    }

    /// Internal if either the alias or the canonical key is marked.
    pub fn is_internal(&self, alias: Option<&Key>, key: &Key) -> bool {
        let marked = |k: &Key| self.bindings.get(k).is_some_and(|binding| binding.internal);
        marked(key) || alias.is_some_and(marked)
    }

    pub fn recipe(&self, key: &Key) -> Option<Recipe> {
        self.bindings.get(key).and_then(|binding| binding.recipe.clone())
    }

    /// Registered params for `key`, overlaid by the alias's params.
    pub fn params_for(&self, alias: Option<&Key>, key: &Key) -> Params {
        let mut params = self
            .bindings
            .get(key)
            .map(|binding| binding.params.clone())
            .unwrap_or_default();

        if let Some(alias_binding) = alias.and_then(|alias| self.bindings.get(alias)) {
            params.merge(&alias_binding.params);
        }
        params
    }

    /// Looks up a method on `key`, then on its canonical key.
    pub fn method(&self, key: &Key, name: &str) -> Option<Definition> {
        let lookup = |k: &Key| self.methods.get(k).and_then(|table| table.get(name)).cloned();
        lookup(key).or_else(|| {
            let (_, canonical) = self.canonical(key);
            lookup(&canonical)
        })
    }

    pub fn catalog(&self, key: &Key) -> Option<Definition> {
        self.catalog.get(key).cloned()
    }

    /// `instance()` seeds, carried into forked scopes.
    pub fn seeded(&self) -> impl Iterator<Item = (&Key, &Object)> {
        self.bindings
            .iter()
            .filter_map(|(key, binding)| binding.instance.as_ref().map(|object| (key, object)))
    }

    /// Every key that appears in any table (for suggestions).
    pub fn known_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .bindings
            .keys()
            .chain(self.aliases.keys())
            .chain(self.catalog.keys())
            .map(Key::as_str)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Returns the number of keys with a binding entry.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings)
            .field("aliases", &self.aliases)
            .field("catalog", &self.catalog.len())
            .field("global_hooks", &self.hooks.global_count())
            .finish()
    }
}
