use std::path::Path;

use anyhow::{Result, bail};

use crate::core::context::Context;
use crate::core::definition::StepDef;
use crate::core::error::StepError;
use crate::core::property::{PropertySpec, PropertyType};
use crate::core::result::UtilityResult;
use crate::core::step::{Leaf, Utility};
use crate::core::value::Value;

const PROPERTIES: &[PropertySpec] = &[PropertySpec::new("message", PropertyType::Text)];

/// Always fails. Usually gated, to stop the run when something is off.
#[derive(Debug, Clone)]
pub struct Abort {
    message: String,
}

impl Abort {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// An abort step with abort-on-failure already enabled.
    pub fn step(message: impl Into<String>) -> StepDef {
        let message = message.into();
        StepDef::utility(Self::new(message.clone())).abort_with(message)
    }
}

impl Leaf for Abort {
    fn type_name(&self) -> &'static str {
        "Abort"
    }

    fn description(&self) -> String {
        format!("Abort transformation: {}", self.message)
    }

    fn properties(&self) -> &'static [PropertySpec] {
        PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value) {
            ("message", Value::Text(message)) => self.message = message,
            (name, value) => bail!("cannot set {name} of Abort to {value}"),
        }
        Ok(())
    }
}

impl Utility for Abort {
    fn execute(&self, _file: &Path, _ctx: &Context) -> Result<UtilityResult> {
        Ok(UtilityResult::error(StepError::Abort {
            message: self.message.clone(),
        }))
    }
}
