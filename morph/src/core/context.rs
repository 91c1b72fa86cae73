//! Run-scoped key/value store shared by all steps.

use std::collections::HashMap;

use crate::core::result::PerformResult;
use crate::core::value::Value;

/// Mutable store for one transformation run.
///
/// Holds two maps: attributes written by steps for later steps to read, and
/// the last perform result of every step keyed by step name (used for
/// dependency checks). Last write wins; nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct Context {
    attributes: HashMap<String, Value>,
    results: HashMap<String, PerformResult>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Last perform result recorded for the named step.
    pub fn result(&self, step: &str) -> Option<&PerformResult> {
        self.results.get(step)
    }

    pub(crate) fn put_result(&mut self, result: PerformResult) {
        self.results.insert(result.step().to_string(), result);
    }

    /// Attributes as a plain map, e.g. for rendering templates.
    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// Boolean attribute lookup; missing and non-boolean values read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}
