//! Derive macros for Sandiq.
//!
//! Re-exported by the `sandiq` facade; depend on that crate instead.

pub use sandiq_macros::*;
