//! Two-file conditions.

use std::path::Path;

use anyhow::Result;

use crate::core::context::Context;
use crate::core::definition::StepDef;
use crate::core::error::StepError;
use crate::core::property::PropertySpec;
use crate::core::step::{Condition, FileComparison, Leaf};
use crate::core::value::Value;

/// Compares the step's file (the baseline) with a file held by a context
/// attribute.
///
/// Both files absent is `true`, exactly one absent is `false`; otherwise the
/// comparison decides.
#[derive(Debug, Clone)]
pub struct DoubleCondition {
    attribute: String,
    comparison: Box<dyn FileComparison>,
}

impl DoubleCondition {
    pub fn new(comparison: impl FileComparison + 'static, attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            comparison: Box::new(comparison),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl Leaf for DoubleCondition {
    fn type_name(&self) -> &'static str {
        self.comparison.type_name()
    }

    fn description(&self) -> String {
        format!("{} against file in {}", self.comparison.description(), self.attribute)
    }

    fn properties(&self) -> &'static [PropertySpec] {
        self.comparison.properties()
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.comparison.set_property(name, value)
    }
}

impl Condition for DoubleCondition {
    fn evaluate(&self, file: &Path, ctx: &Context) -> Result<bool> {
        let other = ctx
            .get(&self.attribute)
            .and_then(Value::as_path)
            .ok_or_else(|| StepError::ComparisonFileMissing {
                attribute: self.attribute.clone(),
            })?;
        match (file.exists(), other.exists()) {
            (false, false) => Ok(true),
            (true, false) | (false, true) => Ok(false),
            (true, true) => self.comparison.compare(file, other),
        }
    }
}

impl StepDef {
    /// A two-file condition comparing the step's file with the file held by
    /// `attribute`.
    pub fn double_condition(
        comparison: impl FileComparison + 'static,
        attribute: impl Into<String>,
    ) -> Self {
        StepDef::condition(DoubleCondition::new(comparison, attribute))
    }
}
