//! Deferred, parameter-bound factories.
//!
//! A [`Factory`] is a definition (or a key) plus a snapshot of overrides.
//! Used as the value of another argument it defers construction until
//! the outer object is actually built:
//!
//! ```
//! use sandiq_container::prelude::*;
//!
//! #[derive(Debug)]
//! struct Connection { name: String }
//! #[derive(Debug)]
//! struct Report { conn: std::sync::Arc<Connection> }
//!
//! let connection = Definition::builder("app::Connection::new")
//!     .scalar::<String>("name")
//!     .build(|args| Ok(Connection { name: args.value(0)? }));
//!
//! let container = Container::new();
//! container
//!     .define(
//!         Key::of::<Report>(),
//!         Definition::builder("app::Report::new")
//!             .class::<Connection>("conn")
//!             .build(|args| Ok(Report { conn: args.object(0)? })),
//!         Params::new().with(
//!             "$conn",
//!             Factory::new(connection).bind(Params::new().with("$name", Value::of(String::from("reporting")))),
//!         ),
//!     )
//!     .unwrap();
//!
//! let report = container.get::<Report>().unwrap();
//! assert_eq!(report.conn.name, "reporting");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::definition::Definition;
use crate::error::Result;
use crate::key::Key;
use crate::resolver::Resolver;
use crate::value::{Object, Params};

#[derive(Clone)]
pub(crate) enum FactoryTarget {
    Definition(Definition),
    Key(Key),
}

/// A definition or key bound to a set of override values.
///
/// Every invocation builds a fresh object; factories never consult the
/// shared-instance cache.
#[derive(Clone)]
pub struct Factory {
    target: FactoryTarget,
    params: Params,
}

impl Factory {
    /// Factory over a standalone definition.
    pub fn new(definition: Definition) -> Self {
        Self {
            target: FactoryTarget::Definition(definition),
            params: Params::new(),
        }
    }

    /// Factory over whatever the container would use to build `key`.
    pub fn for_key(key: impl Into<Key>) -> Self {
        Self {
            target: FactoryTarget::Key(key.into()),
            params: Params::new(),
        }
    }

    /// Returns a new factory with `params` overlaid on the captured ones.
    pub fn bind(&self, params: Params) -> Self {
        Self {
            target: self.target.clone(),
            params: self.params.merged(&params),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Definition name or key, for diagnostics.
    pub fn target_name(&self) -> &str {
        match self.target {
            FactoryTarget::Definition(ref definition) => definition.name(),
            FactoryTarget::Key(ref key) => key.as_str(),
        }
    }

    pub(crate) fn target(&self) -> &FactoryTarget {
        &self.target
    }

    /// Builds inside an ongoing resolution.
    pub fn invoke(&self, resolver: &Resolver<'_>) -> Result<Object> {
        resolver.invoke_factory(self, false)
    }

    /// Builds from outside any resolution. This is a direct request, so
    /// an internal target key fails with `InternalResolution`.
    pub fn make(&self, container: &Container) -> Result<Object> {
        Resolver::new(container).invoke_factory(self, true)
    }

    /// [`Factory::make`] followed by a downcast.
    pub fn make_as<T: Send + Sync + 'static>(&self, container: &Container) -> Result<Arc<T>> {
        let object = self.make(container)?;
        crate::container::downcast(Key::from(self.target_name().to_owned()), object)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("target", &self.target_name())
            .field("params", &self.params)
            .finish()
    }
}
