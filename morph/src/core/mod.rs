//! Deterministic engine types.
//!
//! Core modules must be free of I/O side effects. They describe steps, results
//! and the run context as in-memory data and are testable in isolation.

pub mod context;
pub mod definition;
pub mod error;
pub mod path;
pub mod property;
pub mod result;
pub mod stats;
pub mod step;
pub mod template;
pub mod value;
