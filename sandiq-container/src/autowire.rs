//! Autowiring without reflection.
//!
//! A type opts in by implementing [`Injectable`], usually through
//! `#[derive(Injectable)]`. The derive also submits an [`AutowireEntry`]
//! to a link-time catalog, so containers built with the default settings
//! can construct the type without any registration call.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::definition::Definition;
use crate::key::Key;

/// A type the container can construct from its own argument list.
pub trait Injectable: Send + Sync + 'static {
    /// How to build `Self`.
    fn definition() -> Definition;

    /// Methods callable by name on `Self` through `invoke` or a
    /// `(key, "method")` recipe.
    fn methods() -> Vec<Definition> {
        Vec::new()
    }
}

/// One link-time catalog record.
///
/// Holds function pointers so it can live in a `static`.
pub struct AutowireEntry {
    pub key: fn() -> Key,
    pub definition: fn() -> Definition,
    pub methods: fn() -> Vec<Definition>,
}

impl AutowireEntry {
    pub const fn of<T: Injectable>() -> Self {
        Self {
            key: Key::of::<T>,
            definition: T::definition,
            methods: T::methods,
        }
    }
}

inventory::collect!(AutowireEntry);

struct Catalog {
    definitions: HashMap<Key, Definition>,
    methods: HashMap<Key, HashMap<String, Definition>>,
}

static GLOBAL: Lazy<Catalog> = Lazy::new(|| {
    let mut catalog = Catalog {
        definitions: HashMap::new(),
        methods: HashMap::new(),
    };
    for entry in inventory::iter::<AutowireEntry> {
        let key = (entry.key)();
        let table = catalog.methods.entry(key.clone()).or_default();
        for method in (entry.methods)() {
            table.insert(method.method_name().to_owned(), method);
        }
        catalog.definitions.insert(key, (entry.definition)());
    }
    debug!(types = catalog.definitions.len(), "Loaded global autowire catalog");
    catalog
});

pub(crate) fn global_definition(key: &Key) -> Option<Definition> {
    GLOBAL.definitions.get(key).cloned()
}

pub(crate) fn global_method(key: &Key, method: &str) -> Option<Definition> {
    GLOBAL.methods.get(key).and_then(|table| table.get(method)).cloned()
}
