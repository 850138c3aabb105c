//! Core resolution engine for Sandiq.

pub mod argument;
pub mod autowire;
pub mod container;
pub mod definition;
pub mod error;
pub mod factory;
pub mod hooks;
pub mod key;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod value;

pub use container::{prelude, Container, ContainerBuilder, Settings, WeakContainer};
pub use error::{Result, SandiqError};
pub use key::Key;

#[doc(hidden)]
pub use inventory;
