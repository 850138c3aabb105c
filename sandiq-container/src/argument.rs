//! One parameter slot of a [`Definition`](crate::definition::Definition).

use std::any::type_name;
use std::fmt;

use crate::key::Key;
use crate::value::Value;

/// Whether an argument names a dependency or carries a plain value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Resolved through the container under this key.
    Class(Key),
    /// Supplied only by overrides or the default. Holds the type tag
    /// used in diagnostics.
    Scalar(&'static str),
}

/// Describes one parameter of a constructible target.
///
/// A required argument has no default; an optional one always has a
/// default, which may be [`Value::Null`].
#[derive(Clone)]
pub struct Argument {
    position: usize,
    name: String,
    kind: ArgumentKind,
    default: Option<Value>,
}

impl Argument {
    /// A required class argument resolved under `key`.
    pub fn class(position: usize, name: impl Into<String>, key: impl Into<Key>) -> Self {
        Self {
            position,
            name: strip_sigil(name.into()),
            kind: ArgumentKind::Class(key.into()),
            default: None,
        }
    }

    /// A required scalar argument of type `T`.
    pub fn scalar<T: ?Sized + 'static>(position: usize, name: impl Into<String>) -> Self {
        Self {
            position,
            name: strip_sigil(name.into()),
            kind: ArgumentKind::Scalar(type_name::<T>()),
            default: None,
        }
    }

    /// Makes the argument optional with the given default.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Makes the argument optional, defaulting to [`Value::Null`].
    pub fn optional(self) -> Self {
        self.with_default(Value::Null)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ArgumentKind {
        &self.kind
    }

    /// The dependency key for class arguments.
    pub fn class_key(&self) -> Option<&Key> {
        match self.kind {
            ArgumentKind::Class(ref key) => Some(key),
            ArgumentKind::Scalar(_) => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ArgumentKind::Class(_))
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Declared type, as shown in diagnostics.
    pub fn type_name(&self) -> &str {
        match self.kind {
            ArgumentKind::Class(ref key) => key.as_str(),
            ArgumentKind::Scalar(tag) => tag,
        }
    }

    pub(crate) fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("position", &self.position)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.is_required())
            .finish()
    }
}

fn strip_sigil(name: String) -> String {
    match name.strip_prefix('$') {
        Some(stripped) => stripped.to_owned(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Logger;

    #[test]
    fn class_argument() {
        let arg = Argument::class(0, "$logger", Key::of::<Logger>());
        assert_eq!(arg.name(), "logger");
        assert!(arg.is_class());
        assert!(arg.is_required());
        assert_eq!(arg.class_key(), Some(&Key::of::<Logger>()));
    }

    #[test]
    fn scalar_with_default_is_optional() {
        let arg = Argument::scalar::<String>(1, "path").with_default(Value::of(String::from("/tmp/log")));
        assert!(!arg.is_class());
        assert!(!arg.is_required());
        assert_eq!(arg.type_name(), "alloc::string::String");
        assert!(arg.default_value().is_some());
    }

    #[test]
    fn optional_defaults_to_null() {
        let arg = Argument::class(0, "cache", "cache").optional();
        assert!(arg.default_value().is_some_and(Value::is_null));
    }
}
