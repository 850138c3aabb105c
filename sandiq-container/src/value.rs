//! Objects, argument values and override tables.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::sync::Arc;

use crate::factory::Factory;
use crate::key::Key;

/// A built, shareable object.
///
/// Two resolutions returned the same instance when
/// [`Arc::ptr_eq`] holds for their objects.
pub type Object = Arc<dyn Any + Send + Sync>;

/// A freshly built object that resolving hooks may still mutate.
pub type Built = Box<dyn Any + Send + Sync>;

/// Value of an argument slot or of an override entry.
///
/// `Key` and `Factory` are deferred: they are forced into an object
/// right before the owning definition is called, never earlier.
#[derive(Clone)]
pub enum Value {
    /// A concrete object, used as is.
    Object(Object),
    /// Resolve this key through the container instead of the declared type.
    Key(Key),
    /// Build through this factory at the moment the argument is needed.
    Factory(Factory),
    /// The absent value.
    Null,
}

impl Value {
    /// Wraps a plain value, e.g. `Value::of(String::from("reporting"))`.
    pub fn of<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    /// Wraps an already shared object.
    pub fn object(object: Object) -> Self {
        Self::Object(object)
    }

    /// Redirects a class argument to another key.
    pub fn key(key: impl Into<Key>) -> Self {
        Self::Key(key.into())
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` when forcing this value would run a build.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Key(_) | Self::Factory(_))
    }
}

impl From<Factory> for Value {
    fn from(factory: Factory) -> Self {
        Self::Factory(factory)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(_) => f.write_str("Object(..)"),
            Self::Key(key) => write!(f, "Key({key})"),
            Self::Factory(factory) => write!(f, "Factory({})", factory.target_name()),
            Self::Null => f.write_str("Null"),
        }
    }
}

/// Override table: argument name or argument type → [`Value`].
///
/// Argument names may be written with or without the `$` sigil;
/// `"$conn"` and `"conn"` address the same entry.
///
/// # Examples
/// ```
/// use sandiq_container::value::{Params, Value};
///
/// let params = Params::new()
///     .with("$connection", Value::of(String::from("reporting")))
///     .with("timeout", Value::of(30u64));
///
/// assert!(params.get("connection").is_some());
/// assert!(params.get("$timeout").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Params {
    entries: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Params::set`].
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
        self.entries.insert(normalize(name.as_ref()).to_owned(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(normalize(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(normalize(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlays `other` on top of `self`; entries of `other` win.
    pub fn merge(&mut self, other: &Params) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    /// Returns `self` overlaid by `other`.
    pub fn merged(&self, other: &Params) -> Params {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.entries.iter()
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<N: AsRef<str>, V: Into<Value>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}

fn normalize(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}
