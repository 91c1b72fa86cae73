use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::core::definition::StepDef;
use crate::core::step::{FileComparison, Leaf};

/// Byte-for-byte file equality.
#[derive(Debug, Clone, Default)]
pub struct CompareFiles;

impl CompareFiles {
    /// Two-file condition comparing the step's file with the one in `attribute`.
    pub fn step(attribute: impl Into<String>) -> StepDef {
        StepDef::double_condition(CompareFiles, attribute)
    }
}

impl Leaf for CompareFiles {
    fn type_name(&self) -> &'static str {
        "CompareFiles"
    }

    fn description(&self) -> String {
        "Compare file contents".to_string()
    }
}

impl FileComparison for CompareFiles {
    fn compare(&self, baseline: &Path, comparison: &Path) -> Result<bool> {
        let left = fs::read(baseline).with_context(|| format!("read {}", baseline.display()))?;
        let right = fs::read(comparison).with_context(|| format!("read {}", comparison.display()))?;
        Ok(left == right)
    }
}
