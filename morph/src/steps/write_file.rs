use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result, bail};

use crate::core::context::Context;
use crate::core::property::{PropertySpec, PropertyType};
use crate::core::result::OperationResult;
use crate::core::step::{Leaf, Operation};
use crate::core::value::Value;
use crate::steps::render::render;

const PROPERTIES: &[PropertySpec] = &[PropertySpec::new("content", PropertyType::Text)];

/// Writes rendered text to the step's file, creating parent folders.
#[derive(Debug, Clone)]
pub struct WriteFile {
    content: String,
}

impl WriteFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl Leaf for WriteFile {
    fn type_name(&self) -> &'static str {
        "WriteFile"
    }

    fn description(&self) -> String {
        "Write text to file".to_string()
    }

    fn properties(&self) -> &'static [PropertySpec] {
        PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value) {
            ("content", Value::Text(content)) => self.content = content,
            (name, value) => bail!("cannot set {name} of WriteFile to {value}"),
        }
        Ok(())
    }
}

impl Operation for WriteFile {
    fn execute(&self, file: &Path, ctx: &Context) -> Result<OperationResult> {
        let content = render(&self.content, ctx)?;
        if file.is_file() {
            let current = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
            if current == content {
                return Ok(OperationResult::no_op(format!(
                    "{} already has the expected content",
                    file.display()
                )));
            }
        }
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(file, &content).with_context(|| format!("write {}", file.display()))?;
        Ok(OperationResult::success(format!("{} has been written", file.display())))
    }
}
