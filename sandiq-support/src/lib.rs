//! # Sandiq Support
//!
//! Shared helpers for the Sandiq service container.
//!
//! This crate provides:
//! - Text rendering for error messages (resolution chains, parameters)
//! - "Did you mean?" suggestions over registered keys

pub mod rendering;
