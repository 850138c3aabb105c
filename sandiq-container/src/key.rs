//! Binding keys.
//!
//! A [`Key`] names something the container can build. It is normally the
//! path of a Rust type (obtained with [`Key::of`]), but any string works
//! as a free-form service name (`"db"`, `"session"`).

use std::any::type_name;
use std::borrow::{Borrow, Cow};
use std::fmt;

use sandiq_support::rendering::shorten_type_name;

/// Identifies a binding in the registry.
///
/// # Examples
/// ```
/// use sandiq_container::key::Key;
///
/// struct Mailer;
///
/// let key = Key::of::<Mailer>();
/// assert!(key.as_str().ends_with("Mailer"));
///
/// let named = Key::from("mailer.transport");
/// assert_eq!(named.as_str(), "mailer.transport");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Creates the class key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(type_name::<T>()))
    }

    /// Creates a key from a static service name without allocating.
    #[inline]
    pub const fn name(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the full key text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key with module paths stripped, for diagnostics.
    pub fn short_name(&self) -> String {
        shorten_type_name(&self.0)
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One key or a collection of keys.
///
/// Lets `share`, `internal` and `params` accept either
/// `"db"` or `["db", "cache"]`.
pub trait IntoKeys {
    fn into_keys(self) -> Vec<Key>;
}

impl IntoKeys for Key {
    fn into_keys(self) -> Vec<Key> {
        vec![self]
    }
}

impl IntoKeys for &Key {
    fn into_keys(self) -> Vec<Key> {
        vec![self.clone()]
    }
}

impl IntoKeys for &'static str {
    fn into_keys(self) -> Vec<Key> {
        vec![Key::from(self)]
    }
}

impl IntoKeys for String {
    fn into_keys(self) -> Vec<Key> {
        vec![Key::from(self)]
    }
}

impl<T: Into<Key>, const N: usize> IntoKeys for [T; N] {
    fn into_keys(self) -> Vec<Key> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Key>> IntoKeys for Vec<T> {
    fn into_keys(self) -> Vec<Key> {
        self.into_iter().map(Into::into).collect()
    }
}
