use std::path::Path;

use anyhow::Result;

use crate::core::context::Context;
use crate::core::step::{Condition, Leaf};

/// True when the step's file or folder exists.
#[derive(Debug, Clone, Default)]
pub struct FileExists;

impl Leaf for FileExists {
    fn type_name(&self) -> &'static str {
        "FileExists"
    }

    fn description(&self) -> String {
        "Check if file or folder exists".to_string()
    }
}

impl Condition for FileExists {
    fn evaluate(&self, file: &Path, _ctx: &Context) -> Result<bool> {
        Ok(file.exists())
    }
}
