//! The resolve algorithm.
//!
//! A [`Resolver`] lives for one top-level `resolve`, `invoke` or
//! `Factory::make` call. It carries the chain of keys currently being
//! built, so a key met twice fails fast instead of recursing forever.
//!
//! Steps for one key:
//!
//! 1. follow one alias hop,
//! 2. reject internal keys on a top-level request,
//! 3. return a cached shared instance if there is one,
//! 4. merge registered params (canonical, then alias) with the call-site ones,
//! 5. build from the recipe, or from the autowire catalog,
//! 6. run the resolving hooks (container-aware injection is the first one),
//! 7. cache the object when the key is shared.

use std::cell::RefCell;
use std::sync::Arc;

use sandiq_support::rendering::render_chain;
use tracing::{trace, warn};

use crate::argument::{Argument, ArgumentKind};
use crate::container::{self, Container};
use crate::definition::{Args, Callable, Definition, Target};
use crate::error::{
    CircularDependencyError, NoFactoryError, Result, SandiqError, UnresolvableArgumentError,
};
use crate::factory::{Factory, FactoryTarget};
use crate::key::Key;
use crate::registry::Recipe;
use crate::value::{Built, Object, Params, Value};

/// In-flight resolution state, handed to closure factories.
///
/// Everything resolved through a `Resolver` counts as a dependency:
/// internal keys are allowed and cycles are detected.
pub struct Resolver<'a> {
    container: &'a Container,
    chain: RefCell<Vec<Key>>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self {
            container,
            chain: RefCell::new(Vec::new()),
        }
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Keys currently being built, outermost first.
    pub fn chain(&self) -> Vec<Key> {
        self.chain.borrow().clone()
    }

    pub fn resolve(&self, key: impl Into<Key>) -> Result<Object> {
        self.resolve_key(&key.into(), &Params::new(), false)
    }

    pub fn resolve_with(&self, key: impl Into<Key>, params: &Params) -> Result<Object> {
        self.resolve_key(&key.into(), params, false)
    }

    pub fn resolve_as<T: Send + Sync + 'static>(&self, key: impl Into<Key>) -> Result<Arc<T>> {
        let key = key.into();
        let object = self.resolve_key(&key, &Params::new(), false)?;
        container::downcast(key, object)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_as::<T>(Key::of::<T>())
    }

    pub fn invoke(&self, callable: &Callable, params: &Params) -> Result<Object> {
        self.call(callable, params, false)
    }

    // ── Entry points for the container ──

    pub(crate) fn resolve_top(&self, key: &Key, params: &Params) -> Result<Object> {
        self.resolve_key(key, params, true)
    }

    pub(crate) fn invoke_top(&self, callable: &Callable, params: &Params) -> Result<Object> {
        self.call(callable, params, true)
    }

    // ── Keys ──

    pub(crate) fn resolve_key(&self, key: &Key, params: &Params, protect: bool) -> Result<Object> {
        let (alias, canonical, internal, shared, registered) =
            self.container.with_registry(|registry| {
                let (alias, canonical) = registry.canonical(key);
                let internal = registry.is_internal(alias.as_ref(), &canonical);
                let shared = registry.is_shared(&canonical);
                let registered = registry.params_for(alias.as_ref(), &canonical);
                (alias, canonical, internal, shared, registered)
            });

        if protect && internal {
            return Err(SandiqError::InternalResolution {
                key: canonical,
                alias,
            });
        }

        if let Some(object) = self.container.cached(&canonical) {
            trace!(key = %canonical, "Cache hit");
            return Ok(object);
        }

        let effective = registered.merged(params);
        let built = self.build(alias.as_ref(), &canonical, &effective)?;
        let object: Object = Arc::from(built);

        if shared {
            trace!(key = %canonical, "Caching shared instance");
            Ok(self.container.store(canonical, object))
        } else {
            Ok(object)
        }
    }

    /// Builds a fresh object for `key` and runs its hooks. Never touches the cache.
    fn build(&self, alias: Option<&Key>, key: &Key, params: &Params) -> Result<Built> {
        self.enter(key)?;
        let built = self.build_inner(key, params);
        self.leave();
        let mut built = built?;

        let hooks = self
            .container
            .with_registry(|registry| registry.hooks.chain_for(alias, key));
        for hook in hooks {
            hook(&mut *built, self.container);
        }
        Ok(built)
    }

    fn build_inner(&self, key: &Key, params: &Params) -> Result<Built> {
        let recipe = self.container.with_registry(|registry| registry.recipe(key));
        match recipe {
            Some(Recipe::Closure(factory)) => {
                trace!(key = %key, "Building from closure");
                factory(self)
            }
            Some(Recipe::Definition(definition)) => {
                trace!(key = %key, definition = definition.name(), "Building from definition");
                self.call_definition(&definition, params, None)
            }
            Some(Recipe::Method { key: owner, method }) => {
                trace!(key = %key, owner = %owner, method = %method, "Building from method");
                self.call_method(&Target::Key(owner), &method, params, false)
            }
            None => match self.container.autowire_lookup(key) {
                Some(definition) => {
                    trace!(key = %key, definition = definition.name(), "Autowiring");
                    self.call_definition(&definition, params, None)
                }
                None => Err(SandiqError::NoFactory(NoFactoryError {
                    key: key.clone(),
                    suggestions: self.container.suggestions(key),
                })),
            },
        }
    }

    fn enter(&self, key: &Key) -> Result<()> {
        let mut chain = self.chain.borrow_mut();
        if let Some(start) = chain.iter().position(|k| k == key) {
            let mut cycle = chain[start..].to_vec();
            cycle.push(key.clone());
            warn!(chain = %render_chain(&cycle), "Circular dependency detected");
            return Err(SandiqError::CircularDependency(CircularDependencyError {
                chain: cycle,
            }));
        }
        chain.push(key.clone());
        Ok(())
    }

    fn leave(&self) {
        self.chain.borrow_mut().pop();
    }

    // ── Definitions ──

    /// Forces every argument of `definition` and calls its body.
    pub(crate) fn call_definition(
        &self,
        definition: &Definition,
        params: &Params,
        receiver: Option<&Object>,
    ) -> Result<Built> {
        let mut values = Vec::with_capacity(definition.arguments().len());
        for argument in definition.arguments() {
            let value = match argument.kind() {
                ArgumentKind::Class(key) => self.class_argument(definition, argument, key, params)?,
                ArgumentKind::Scalar(_) => self.scalar_argument(definition, argument, params)?,
            };
            values.push(value);
        }
        definition.call(Args::new(definition, values), receiver)
    }

    /// Override by name, then by type key, then the declared type.
    fn class_argument(
        &self,
        definition: &Definition,
        argument: &Argument,
        key: &Key,
        params: &Params,
    ) -> Result<Option<Object>> {
        let overridden = params
            .get(argument.name())
            .or_else(|| params.get(key.as_str()));

        match overridden {
            Some(Value::Key(target)) => {
                trace!(argument = argument.name(), to = %target, "Redirecting argument");
                self.dependency(definition, argument, target)
            }
            Some(value) => self.force(value),
            None => self.dependency(definition, argument, key),
        }
    }

    fn dependency(&self, definition: &Definition, argument: &Argument, key: &Key) -> Result<Option<Object>> {
        match self.resolve_key(key, &Params::new(), false) {
            Ok(object) => Ok(Some(object)),
            Err(err) if err.is_unresolvable() => match argument.default_value() {
                Some(default) => {
                    trace!(argument = argument.name(), key = %key, "Falling back to default");
                    self.force(default)
                }
                None => Err(unresolvable(definition, argument, key.as_str(), Some(err))),
            },
            Err(err) => Err(err),
        }
    }

    /// Scalars come from the override table by name only.
    fn scalar_argument(
        &self,
        definition: &Definition,
        argument: &Argument,
        params: &Params,
    ) -> Result<Option<Object>> {
        match params.get(argument.name()) {
            Some(Value::Key(key)) => Ok(Some(Arc::new(key.as_str().to_owned()) as Object)),
            Some(value) => self.force(value),
            None => match argument.default_value() {
                Some(default) => self.force(default),
                None => Err(unresolvable(definition, argument, argument.type_name(), None)),
            },
        }
    }

    /// Turns a value into the object placed in the argument slot.
    fn force(&self, value: &Value) -> Result<Option<Object>> {
        match value {
            Value::Object(object) => Ok(Some(object.clone())),
            Value::Null => Ok(None),
            Value::Key(key) => self.resolve_key(key, &Params::new(), false).map(Some),
            Value::Factory(factory) => self.invoke_factory(factory, false).map(Some),
        }
    }

    // ── Factories & methods ──

    /// Runs a factory. With `protect` set, an internal target key or
    /// receiver is refused, as for a top-level `resolve`.
    pub(crate) fn invoke_factory(&self, factory: &Factory, protect: bool) -> Result<Object> {
        trace!(target = factory.target_name(), "Invoking factory");
        let built = match factory.target() {
            FactoryTarget::Definition(definition) => {
                let receiver = self.receiver_of(definition, protect)?;
                self.call_definition(definition, factory.params(), receiver.as_ref())?
            }
            FactoryTarget::Key(key) => {
                let (alias, canonical, internal, registered) = self.container.with_registry(|registry| {
                    let (alias, canonical) = registry.canonical(key);
                    let internal = registry.is_internal(alias.as_ref(), &canonical);
                    let registered = registry.params_for(alias.as_ref(), &canonical);
                    (alias, canonical, internal, registered)
                });
                if protect && internal {
                    return Err(SandiqError::InternalResolution {
                        key: canonical,
                        alias,
                    });
                }
                self.build(alias.as_ref(), &canonical, &registered.merged(factory.params()))?
            }
        };
        Ok(Arc::from(built))
    }

    fn call(&self, callable: &Callable, params: &Params, protect: bool) -> Result<Object> {
        let built = match callable {
            Callable::Definition(definition) => {
                let receiver = self.receiver_of(definition, protect)?;
                self.call_definition(definition, params, receiver.as_ref())?
            }
            Callable::Method { target, method } => self.call_method(target, method, params, protect)?,
        };
        Ok(Arc::from(built))
    }

    fn call_method(&self, target: &Target, method: &str, params: &Params, protect: bool) -> Result<Built> {
        let definition = self
            .container
            .method_lookup(target.key(), method)
            .ok_or_else(|| SandiqError::UnknownMethod {
                key: target.key().clone(),
                method: method.to_owned(),
            })?;

        if !definition.is_instance_method() {
            return self.call_definition(&definition, params, None);
        }

        let receiver = match target {
            Target::Object(_, object) => object.clone(),
            Target::Key(key) => self.resolve_key(key, &Params::new(), protect)?,
        };
        self.call_definition(&definition, params, Some(&receiver))
    }

    /// Resolves the receiver of an instance-method definition.
    fn receiver_of(&self, definition: &Definition, protect: bool) -> Result<Option<Object>> {
        definition
            .receiver()
            .map(|key| self.resolve_key(key, &Params::new(), protect))
            .transpose()
    }
}

fn unresolvable(
    definition: &Definition,
    argument: &Argument,
    type_name: &str,
    source: Option<SandiqError>,
) -> SandiqError {
    SandiqError::UnresolvableArgument(UnresolvableArgumentError {
        position: argument.position(),
        name: argument.name().to_owned(),
        type_name: type_name.to_owned(),
        declared_in: definition.name().to_owned(),
        source: source.map(Box::new),
    })
}
