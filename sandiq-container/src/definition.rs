//! Definitions: how to build one target from its arguments.
//!
//! Rust has no constructor reflection, so a [`Definition`] spells out the
//! parameter list explicitly, either by hand through
//! [`Definition::builder`] or generated by `#[derive(Injectable)]`.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use sandiq_container::definition::Definition;
//!
//! struct Logger { path: String }
//! struct Service { logger: Arc<Logger> }
//!
//! let logger = Definition::builder("app::Logger::new")
//!     .scalar_or("path", String::from("/tmp/log"))
//!     .build(|args| Ok(Logger { path: args.value(0)? }));
//!
//! let service = Definition::builder("app::Service::new")
//!     .class::<Logger>("logger")
//!     .build(|args| Ok(Service { logger: args.object(0)? }));
//!
//! assert_eq!(service.arguments().len(), 1);
//! assert!(!logger.arguments()[0].is_required());
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::argument::Argument;
use crate::error::{Result, SandiqError};
use crate::key::Key;
use crate::resolver::Resolver;
use crate::value::{Built, Object, Params, Value};

type FunctionBody = Arc<dyn Fn(Args) -> Result<Built> + Send + Sync>;
type MethodBody = Arc<dyn Fn(&Object, Args) -> Result<Built> + Send + Sync>;

#[derive(Clone)]
enum Body {
    Function(FunctionBody),
    Method { receiver: Key, body: MethodBody },
}

/// Immutable description of how to build one target.
///
/// Cheap to clone; every clone shares the same argument list and body.
#[derive(Clone)]
pub struct Definition {
    name: Arc<str>,
    arguments: Arc<[Argument]>,
    body: Body,
}

impl Definition {
    /// Starts a definition. `name` identifies it in diagnostics,
    /// e.g. `"app::Service::new"`.
    pub fn builder(name: impl Into<String>) -> DefinitionBuilder {
        DefinitionBuilder {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment of the name: `get_pdo` for `app::Manager::get_pdo`.
    pub fn method_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Returns `true` when the body needs a receiver object.
    pub fn is_instance_method(&self) -> bool {
        matches!(self.body, Body::Method { .. })
    }

    /// Key of the receiver type for instance methods.
    pub fn receiver(&self) -> Option<&Key> {
        match self.body {
            Body::Method { ref receiver, .. } => Some(receiver),
            Body::Function(_) => None,
        }
    }

    /// Resolves every argument against `resolver` and calls the body.
    ///
    /// Instance methods fail with [`SandiqError::InvalidFactory`]; use
    /// [`Resolver::invoke`] with a [`Callable`] for those.
    pub fn invoke(&self, resolver: &Resolver<'_>, params: &Params) -> Result<Built> {
        resolver.call_definition(self, params, None)
    }

    pub(crate) fn call(&self, args: Args, receiver: Option<&Object>) -> Result<Built> {
        match (&self.body, receiver) {
            (Body::Function(body), _) => body(args),
            (Body::Method { body, .. }, Some(receiver)) => body(receiver, args),
            (Body::Method { receiver, .. }, None) => Err(SandiqError::InvalidFactory {
                key: receiver.clone(),
                reason: format!("{} is an instance method and needs a receiver", self.name),
            }),
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("instance_method", &self.is_instance_method())
            .finish()
    }
}

/// Collects arguments for a [`Definition`].
///
/// Positions are assigned in the order arguments are added.
pub struct DefinitionBuilder {
    name: String,
    arguments: Vec<Argument>,
}

impl DefinitionBuilder {
    /// Required dependency on type `T`.
    pub fn class<T: ?Sized + 'static>(self, name: &str) -> Self {
        self.class_key(name, Key::of::<T>())
    }

    /// Required dependency on an arbitrary key.
    pub fn class_key(self, name: &str, key: impl Into<Key>) -> Self {
        let position = self.arguments.len();
        self.argument(Argument::class(position, name, key))
    }

    /// Dependency on `T` that becomes null when `T` cannot be built.
    pub fn optional_class<T: ?Sized + 'static>(self, name: &str) -> Self {
        self.optional_class_key(name, Key::of::<T>())
    }

    pub fn optional_class_key(self, name: &str, key: impl Into<Key>) -> Self {
        let position = self.arguments.len();
        self.argument(Argument::class(position, name, key).optional())
    }

    /// Required plain value of type `T`.
    pub fn scalar<T: ?Sized + 'static>(self, name: &str) -> Self {
        let position = self.arguments.len();
        self.argument(Argument::scalar::<T>(position, name))
    }

    /// Plain value of type `T` with a default.
    pub fn scalar_or<T: Send + Sync + 'static>(self, name: &str, default: T) -> Self {
        let position = self.arguments.len();
        self.argument(Argument::scalar::<T>(position, name).with_default(Value::of(default)))
    }

    /// Appends a prepared argument; its position is reassigned.
    pub fn argument(mut self, argument: Argument) -> Self {
        let position = self.arguments.len();
        self.arguments.push(argument.at(position));
        self
    }

    /// Finishes with a constructor or free function body.
    pub fn build<R, F>(self, body: F) -> Definition
    where
        R: Send + Sync + 'static,
        F: Fn(Args) -> Result<R> + Send + Sync + 'static,
    {
        self.build_raw(move |args| Ok(Box::new(body(args)?) as Built))
    }

    /// Finishes with a body that returns an already boxed object.
    pub fn build_raw<F>(self, body: F) -> Definition
    where
        F: Fn(Args) -> Result<Built> + Send + Sync + 'static,
    {
        Definition {
            name: self.name.into(),
            arguments: self.arguments.into(),
            body: Body::Function(Arc::new(body)),
        }
    }

    /// Finishes with an instance method body on receiver type `T`.
    pub fn build_method<T, R, F>(self, body: F) -> Definition
    where
        T: Send + Sync + 'static,
        R: Send + Sync + 'static,
        F: Fn(&T, Args) -> Result<R> + Send + Sync + 'static,
    {
        let receiver = Key::of::<T>();
        let body: MethodBody = Arc::new(move |object: &Object, args| {
            let this = object.downcast_ref::<T>().ok_or_else(|| SandiqError::TypeMismatch {
                key: Key::of::<T>(),
                expected: type_name::<T>(),
            })?;
            Ok(Box::new(body(this, args)?) as Built)
        });

        Definition {
            name: self.name.into(),
            arguments: self.arguments.into(),
            body: Body::Method { receiver, body },
        }
    }
}

/// The forced argument array handed to a definition body.
///
/// Slots are in argument order; a null slot holds `None`.
pub struct Args {
    values: Vec<Option<Object>>,
    arguments: Arc<[Argument]>,
    declared_in: Arc<str>,
}

impl Args {
    pub(crate) fn new(definition: &Definition, values: Vec<Option<Object>>) -> Self {
        Self {
            values,
            arguments: definition.arguments.clone(),
            declared_in: definition.name.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Untyped access to slot `index`.
    pub fn raw(&self, index: usize) -> Option<&Object> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Shared object in slot `index`; null is an error.
    pub fn object<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        self.optional(index)?.ok_or_else(|| self.type_error::<T>(index))
    }

    /// Shared object in slot `index`, or `None` for null.
    pub fn optional<T: Send + Sync + 'static>(&self, index: usize) -> Result<Option<Arc<T>>> {
        match self.raw(index) {
            Some(object) => object
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| self.type_error::<T>(index)),
            None => Ok(None),
        }
    }

    /// Clones the value in slot `index` out of its object.
    pub fn value<T: Clone + Send + Sync + 'static>(&self, index: usize) -> Result<T> {
        self.raw(index)
            .and_then(|object| object.downcast_ref::<T>())
            .cloned()
            .ok_or_else(|| self.type_error::<T>(index))
    }

    fn type_error<T: ?Sized>(&self, index: usize) -> SandiqError {
        SandiqError::ArgumentType {
            position: index,
            name: self
                .arguments
                .get(index)
                .map(|argument| argument.name().to_owned())
                .unwrap_or_default(),
            declared_in: self.declared_in.to_string(),
            expected: type_name::<T>(),
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("declared_in", &self.declared_in)
            .field("len", &self.values.len())
            .finish()
    }
}

/// Something [`Container::invoke`](crate::container::Container::invoke) can call.
#[derive(Clone, Debug)]
pub enum Callable {
    /// A free function or static method definition.
    Definition(Definition),
    /// A registered method, looked up by name on `target`.
    Method { target: Target, method: String },
}

/// Receiver side of a method callable.
#[derive(Clone)]
pub enum Target {
    /// Resolve this key to obtain the receiver (skipped for static methods).
    Key(Key),
    /// Use this object as the receiver; the key selects the method table.
    Object(Key, Object),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "Key({key})"),
            Self::Object(key, _) => write!(f, "Object({key})"),
        }
    }
}

impl Target {
    pub fn key(&self) -> &Key {
        match self {
            Self::Key(key) | Self::Object(key, _) => key,
        }
    }
}

impl Callable {
    /// Method `method` on whatever `key` resolves to.
    pub fn method(key: impl Into<Key>, method: impl Into<String>) -> Self {
        Self::Method {
            target: Target::Key(key.into()),
            method: method.into(),
        }
    }

    /// Method `method` on an existing object registered under `key`'s method table.
    pub fn on(key: impl Into<Key>, object: Object, method: impl Into<String>) -> Self {
        Self::Method {
            target: Target::Object(key.into(), object),
            method: method.into(),
        }
    }
}

impl From<Definition> for Callable {
    fn from(definition: Definition) -> Self {
        Self::Definition(definition)
    }
}
