//! Stable exit codes for morph CLI commands.

/// Template is valid, or the run completed without errors.
pub const OK: i32 = 0;
/// Invalid template, configuration or arguments; nothing was run.
pub const INVALID: i32 = 1;
/// A step with abort-on-failure failed and stopped the run.
pub const ABORTED: i32 = 2;
/// The run completed with error results (or warnings under `fail_on_warning`).
pub const FAILED: i32 = 3;
