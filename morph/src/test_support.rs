//! Test-only leaf steps and file-tree builders.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context as _, Result, anyhow};
use tempfile::TempDir;

use crate::core::context::Context;
use crate::core::property::{PropertySpec, PropertyType};
use crate::core::result::{OperationResult, UtilityResult};
use crate::core::step::{Condition, FileComparison, Leaf, Operation, Utility};
use crate::core::value::Value;

/// Create a temporary directory holding `files` as `(relative path, contents)`.
pub fn temp_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture file");
    }
    dir
}

const LABEL: &[PropertySpec] = &[PropertySpec::nullable("label", PropertyType::Text)];

/// Utility counting its executions; clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct CountingUtility {
    count: Rc<Cell<usize>>,
    files: Rc<RefCell<Vec<PathBuf>>>,
    labels: Rc<RefCell<Vec<Option<String>>>>,
    label: Option<String>,
}

impl CountingUtility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// Files the utility was executed against, in order.
    pub fn files(&self) -> Vec<PathBuf> {
        self.files.borrow().clone()
    }

    /// Value of the `label` property at each execution.
    pub fn labels(&self) -> Vec<Option<String>> {
        self.labels.borrow().clone()
    }
}

impl Leaf for CountingUtility {
    fn type_name(&self) -> &'static str {
        "CountingUtility"
    }

    fn description(&self) -> String {
        "Count executions".to_string()
    }

    fn properties(&self) -> &'static [PropertySpec] {
        LABEL
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "label" => {
                self.label = value.as_text().map(str::to_string);
                Ok(())
            }
            other => Err(anyhow!("unknown property {other}")),
        }
    }
}

impl Utility for CountingUtility {
    fn execute(&self, file: &Path, _ctx: &Context) -> Result<UtilityResult> {
        self.count.set(self.count.get() + 1);
        self.files.borrow_mut().push(file.to_path_buf());
        self.labels.borrow_mut().push(self.label.clone());
        Ok(UtilityResult::null())
    }
}

/// Utility returning a fixed value.
#[derive(Debug, Clone)]
pub struct ValueUtility(pub Value);

impl Leaf for ValueUtility {
    fn type_name(&self) -> &'static str {
        "ValueUtility"
    }

    fn description(&self) -> String {
        format!("Produce {}", self.0)
    }
}

impl Utility for ValueUtility {
    fn execute(&self, _file: &Path, _ctx: &Context) -> Result<UtilityResult> {
        Ok(UtilityResult::value(self.0.clone()))
    }
}

/// Utility whose execution always fails.
#[derive(Debug, Clone)]
pub struct FailingUtility {
    message: String,
}

impl FailingUtility {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Leaf for FailingUtility {
    fn type_name(&self) -> &'static str {
        "FailingUtility"
    }

    fn description(&self) -> String {
        format!("Fail with {}", self.message)
    }
}

impl Utility for FailingUtility {
    fn execute(&self, _file: &Path, _ctx: &Context) -> Result<UtilityResult> {
        Err(anyhow!("{}", self.message)).context("failing utility")
    }
}

/// Utility whose execution panics.
#[derive(Debug, Clone)]
pub struct PanickingUtility;

impl Leaf for PanickingUtility {
    fn type_name(&self) -> &'static str {
        "PanickingUtility"
    }

    fn description(&self) -> String {
        "Panic".to_string()
    }
}

impl Utility for PanickingUtility {
    fn execute(&self, _file: &Path, _ctx: &Context) -> Result<UtilityResult> {
        panic!("leaf panicked")
    }
}

/// Condition with a fixed answer.
#[derive(Debug, Clone)]
pub struct FixedCondition {
    value: bool,
}

impl FixedCondition {
    pub fn new(value: bool) -> Self {
        Self { value }
    }
}

impl Leaf for FixedCondition {
    fn type_name(&self) -> &'static str {
        "FixedCondition"
    }

    fn description(&self) -> String {
        format!("Always {}", self.value)
    }
}

impl Condition for FixedCondition {
    fn evaluate(&self, _file: &Path, _ctx: &Context) -> Result<bool> {
        Ok(self.value)
    }
}

/// Condition that is true only for files named `name`.
#[derive(Debug, Clone)]
pub struct FileNamed {
    name: String,
}

impl FileNamed {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Leaf for FileNamed {
    fn type_name(&self) -> &'static str {
        "FileNamed"
    }

    fn description(&self) -> String {
        format!("Check file is named {}", self.name)
    }
}

impl Condition for FileNamed {
    fn evaluate(&self, file: &Path, _ctx: &Context) -> Result<bool> {
        Ok(file.file_name().is_some_and(|name| name == self.name.as_str()))
    }
}

/// Condition whose evaluation always fails.
#[derive(Debug, Clone)]
pub struct FailingCondition;

impl Leaf for FailingCondition {
    fn type_name(&self) -> &'static str {
        "FailingCondition"
    }

    fn description(&self) -> String {
        "Fail to evaluate".to_string()
    }
}

impl Condition for FailingCondition {
    fn evaluate(&self, file: &Path, _ctx: &Context) -> Result<bool> {
        Err(anyhow!("cannot evaluate {}", file.display()))
    }
}

/// Comparison with a fixed answer.
#[derive(Debug, Clone)]
pub struct AlwaysEqual {
    equal: bool,
}

impl AlwaysEqual {
    pub fn new(equal: bool) -> Self {
        Self { equal }
    }
}

impl Leaf for AlwaysEqual {
    fn type_name(&self) -> &'static str {
        "AlwaysEqual"
    }

    fn description(&self) -> String {
        format!("Compare as {}", if self.equal { "equal" } else { "different" })
    }
}

impl FileComparison for AlwaysEqual {
    fn compare(&self, _baseline: &Path, _comparison: &Path) -> Result<bool> {
        Ok(self.equal)
    }
}

const CONTENT: &[PropertySpec] = &[PropertySpec::new("content", PropertyType::Text)];

/// Operation writing `content` to its file; clones share the record of
/// touched files.
#[derive(Debug, Clone)]
pub struct TouchOperation {
    content: String,
    touched: Rc<RefCell<Vec<(PathBuf, String)>>>,
}

impl TouchOperation {
    pub fn new() -> Self {
        Self {
            content: "touched".to_string(),
            touched: Rc::default(),
        }
    }

    /// `(file, content)` pairs written so far, in order.
    pub fn touched(&self) -> Vec<(PathBuf, String)> {
        self.touched.borrow().clone()
    }
}

impl Default for TouchOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl Leaf for TouchOperation {
    fn type_name(&self) -> &'static str {
        "TouchOperation"
    }

    fn description(&self) -> String {
        "Write a marker into the file".to_string()
    }

    fn properties(&self) -> &'static [PropertySpec] {
        CONTENT
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value) {
            ("content", Value::Text(content)) => {
                self.content = content;
                Ok(())
            }
            (other, value) => Err(anyhow!("cannot set {other} to {value}")),
        }
    }
}

impl Operation for TouchOperation {
    fn execute(&self, file: &Path, _ctx: &Context) -> Result<OperationResult> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(file, &self.content).with_context(|| format!("write {}", file.display()))?;
        self.touched
            .borrow_mut()
            .push((file.to_path_buf(), self.content.clone()));
        Ok(OperationResult::success(format!("Touched {}", file.display())))
    }
}
