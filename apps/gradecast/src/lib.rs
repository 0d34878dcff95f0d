//! # Gradecast Library
//!
//! This library exposes the Gradecast modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod artifacts;
pub mod cli;
pub mod error;
pub mod records;
pub mod settings;

// Re-export gradecast_core for convenience
pub use gradecast_core;
