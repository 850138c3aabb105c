//! Error types for container operations.
//!
//! Every failure names the key, parameter or chain involved so the
//! message alone is enough to find the broken binding.

use std::fmt;

use sandiq_support::rendering::{render_chain, render_parameter};

use crate::key::Key;

/// Main error type for all Sandiq operations.
#[derive(Debug, thiserror::Error)]
pub enum SandiqError {
    /// Nothing is registered for the key and it cannot be autowired.
    #[error("{}", .0)]
    NoFactory(NoFactoryError),

    /// An internal key was requested directly instead of as a dependency.
    #[error("{}", render_internal(.key, .alias.as_ref()))]
    InternalResolution { key: Key, alias: Option<Key> },

    /// A required argument of a definition could not be satisfied.
    #[error("{}", .0)]
    UnresolvableArgument(UnresolvableArgumentError),

    /// A key was reached again while it was still being built.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// `define` was handed a recipe of an unusable shape.
    #[error("Invalid factory for {key}: {reason}")]
    InvalidFactory { key: Key, reason: String },

    /// A method recipe or callable names a method that was never registered.
    #[error("Unknown method {method:?} on {key}\n  Hint: register it with .method() or Injectable::methods()")]
    UnknownMethod { key: Key, method: String },

    /// An argument value does not have the type the body asked for.
    #[error("Argument {} of {declared_in} is not a {expected}", render_argument(.position, .name, .expected))]
    ArgumentType {
        position: usize,
        name: String,
        declared_in: String,
        expected: &'static str,
    },

    /// A resolved object does not have the type the caller asked for.
    #[error("Type mismatch for {key}: expected {expected}")]
    TypeMismatch { key: Key, expected: &'static str },

    /// A factory body returned its own error.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: Key,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SandiqError {
    /// Wraps an arbitrary error raised inside a factory body.
    pub fn construction(
        key: impl Into<Key>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ConstructionFailed {
            key: key.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for errors that mean "this key cannot be built",
    /// as opposed to errors in the shape of the dependency graph.
    pub fn is_unresolvable(&self) -> bool {
        matches!(
            self,
            Self::NoFactory(_) | Self::UnresolvableArgument(_) | Self::InternalResolution { .. }
        )
    }
}

fn render_argument(position: &usize, name: &str, expected: &str) -> String {
    render_parameter(*position, name, expected)
}

fn render_internal(key: &Key, alias: Option<&Key>) -> String {
    match alias {
        Some(alias) => format!(
            "{key} (requested as {alias}) is internal and can only be resolved as a dependency"
        ),
        None => format!("{key} is internal and can only be resolved as a dependency"),
    }
}

/// Error when a key has no factory and cannot be autowired.
#[derive(Debug)]
pub struct NoFactoryError {
    /// The key that was requested.
    pub key: Key,
    /// Registered keys with similar names.
    pub suggestions: Vec<String>,
}

impl fmt::Display for NoFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No factory for {}", self.key)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: define() a factory for {} or autowire::<{}>() it",
            self.key,
            self.key.short_name()
        )
    }
}

/// Error when a required argument cannot be resolved.
#[derive(Debug)]
pub struct UnresolvableArgumentError {
    /// Zero-based parameter position.
    pub position: usize,
    /// Parameter name, without the `$` sigil.
    pub name: String,
    /// Declared dependency type, or the scalar type tag.
    pub type_name: String,
    /// Definition that declares the parameter, e.g. `app::Service::new`.
    pub declared_in: String,
    /// Why the dependency itself failed, if it was a class argument.
    pub source: Option<Box<SandiqError>>,
}

impl fmt::Display for UnresolvableArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unresolvable argument {} of {}",
            render_parameter(self.position, &self.name, &self.type_name),
            self.declared_in
        )?;

        match self.source {
            Some(ref source) => write!(f, "\n  Caused by: {source}"),
            None => write!(
                f,
                "\n  Hint: pass it with .params({:?}, ...) or give the argument a default",
                format!("${}", self.name)
            ),
        }
    }
}

impl std::error::Error for UnresolvableArgumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Error when a key depends on itself, directly or transitively.
///
/// Shows the full chain so the cycle is visible.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The chain of keys that forms the cycle, e.g. `[A, B, A]`.
    pub chain: Vec<Key>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: let one side resolve the other later through a WeakContainer"
        )
    }
}

/// Convenient Result type for Sandiq operations.
pub type Result<T> = std::result::Result<T, SandiqError>;
