use std::path::Path;

use anyhow::{Result, bail};

use crate::core::context::Context;
use crate::core::property::{PropertySpec, PropertyType};
use crate::core::step::{Condition, Leaf};
use crate::core::value::Value;

const PROPERTIES: &[PropertySpec] = &[PropertySpec::new("step", PropertyType::Text)];

/// True when the named step has been performed and did not end in a
/// dependency failure.
#[derive(Debug, Clone)]
pub struct ResultCondition {
    step: String,
}

impl ResultCondition {
    pub fn new(step: impl Into<String>) -> Self {
        Self { step: step.into() }
    }
}

impl Leaf for ResultCondition {
    fn type_name(&self) -> &'static str {
        "ResultCondition"
    }

    fn description(&self) -> String {
        format!("Check that {} succeeded", self.step)
    }

    fn properties(&self) -> &'static [PropertySpec] {
        PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value) {
            ("step", Value::Text(step)) => self.step = step,
            (name, value) => bail!("cannot set {name} of ResultCondition to {value}"),
        }
        Ok(())
    }
}

impl Condition for ResultCondition {
    fn evaluate(&self, _file: &Path, ctx: &Context) -> Result<bool> {
        Ok(ctx
            .result(&self.step)
            .is_some_and(|result| !result.is_dependency_failure()))
    }
}
