//! Filesystem-facing helpers.
//!
//! These modules read and write files under explicit paths and keep parsing
//! out of the engine.

pub mod config;
pub mod template_file;
