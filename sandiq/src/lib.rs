//! # Sandiq: autowiring service container for Rust
//!
//! Services are bound under string keys (type paths or plain names such
//! as `"db"`), built on demand by resolving each constructor argument,
//! and optionally shared, aliased or fenced off as internal.
//!
//! ```rust
//! use std::sync::Arc;
//! use sandiq::prelude::*;
//!
//! #[derive(Debug, Injectable)]
//! struct Logger {
//!     #[inject(default = String::from("/tmp/log"))]
//!     path: String,
//! }
//!
//! #[derive(Debug, Injectable)]
//! struct Service {
//!     logger: Arc<Logger>,
//! }
//!
//! let container = Container::new();
//! let service = container.get::<Service>().unwrap();
//! assert_eq!(service.logger.path, "/tmp/log");
//! ```

pub use sandiq_container::*;
pub use sandiq_derive::*;
pub use sandiq_support::*;

pub mod prelude {
    pub use sandiq_container::prelude::*;
    pub use sandiq_derive::Injectable;
}
