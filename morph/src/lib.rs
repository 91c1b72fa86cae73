//! Transformation steps applied to a folder tree.
//!
//! A [`Template`](core::template::Template) is an ordered tree of steps. Each
//! step is performed against a root folder and a shared
//! [`Context`](core::context::Context), producing a classified result that
//! later steps can depend on, gate on or read values from.
//!
//! - **[`core`]**: Step definitions, results, context and the template arena.
//!   No I/O.
//! - **[`perform`]**: The per-step protocol (dependencies, gates, paths,
//!   property injection, persistence).
//! - **[`run`]**: Orchestration of a whole template, abort handling included.
//! - **[`looping`]**, **[`fanout`]**: Containers that create steps at run time.
//! - **[`steps`]**, **[`conditions`]**: Built-in leaf steps.
//! - **[`io`]**: Template files and driver configuration.

pub mod conditions;
pub mod core;
pub mod exit_codes;
pub mod fanout;
pub mod io;
pub mod logging;
pub mod looping;
pub mod perform;
pub mod run;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::context::Context;
pub use crate::core::definition::{LoopCondition, MultiMode, StepDef};
pub use crate::core::result::PerformResult;
pub use crate::core::template::{StepId, Template};
pub use crate::core::value::Value;
pub use crate::run::{Engine, RunOutcome};
