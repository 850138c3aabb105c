//! # Sandiq Macros
//!
//! Procedural macros for the Sandiq container.
//!
//! - [`Injectable`](derive@Injectable): build a struct's `Definition` from its fields

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod injectable;

/// Derives `sandiq::autowire::Injectable` for a struct with named fields.
///
/// Each field becomes one argument, in declaration order:
///
/// | field type          | argument                                 |
/// |---------------------|------------------------------------------|
/// | `Arc<T>`            | required dependency on `T`               |
/// | `Option<Arc<T>>`    | optional dependency, null when unbuildable |
/// | anything else       | scalar, filled from params by field name |
///
/// Scalar fields must be `Clone`.
///
/// # Attributes
///
/// - `#[inject(default)]`: scalar default from `Default::default()`
/// - `#[inject(default = expr)]`: scalar default from an expression
/// - `#[inject(key = "db.reporting")]`: resolve a dependency field from another key
/// - `#[injectable(crate = "path")]`: path to the `sandiq` crate (default `::sandiq`)
///
/// Non-generic structs are also added to the global autowire catalog, so
/// a default container builds them without any registration call.
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Injectable)]
/// struct Logger {
///     #[inject(default = String::from("/tmp/log"))]
///     path: String,
/// }
///
/// #[derive(Injectable)]
/// struct Service {
///     logger: Arc<Logger>,
///     cache: Option<Arc<Cache>>,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject, injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(&input)
        .unwrap_or_else(|err| err.write_errors())
        .into()
}
