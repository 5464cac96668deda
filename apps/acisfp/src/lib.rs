//! # acisfp Library
//!
//! This library exposes the acisfp application modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod cli;
pub mod config;
pub mod error;
pub mod ocat;

pub use error::AppError;

// Re-export acisfp_core for convenience
pub use acisfp_core;
