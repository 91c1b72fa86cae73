use std::path::Path;

use anyhow::{Result, bail};
use serde::Deserialize;
use tracing::{debug, error, info, trace, warn};

use crate::core::context::Context;
use crate::core::property::{PropertySpec, PropertyType};
use crate::core::result::UtilityResult;
use crate::core::step::{Leaf, Utility};
use crate::core::value::Value;
use crate::steps::render::render;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

const PROPERTIES: &[PropertySpec] = &[PropertySpec::new("message", PropertyType::Text)];

/// Emits a message rendered against the context.
#[derive(Debug, Clone)]
pub struct Log {
    message: String,
    level: LogLevel,
}

impl Log {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::default(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

impl Leaf for Log {
    fn type_name(&self) -> &'static str {
        "Log"
    }

    fn description(&self) -> String {
        format!("Log message '{}'", self.message)
    }

    fn properties(&self) -> &'static [PropertySpec] {
        PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value) {
            ("message", Value::Text(message)) => self.message = message,
            (name, value) => bail!("cannot set {name} of Log to {value}"),
        }
        Ok(())
    }
}

impl Utility for Log {
    fn execute(&self, _file: &Path, ctx: &Context) -> Result<UtilityResult> {
        let message = render(&self.message, ctx)?;
        match self.level {
            LogLevel::Trace => trace!(target: "morph::log", "{message}"),
            LogLevel::Debug => debug!(target: "morph::log", "{message}"),
            LogLevel::Info => info!(target: "morph::log", "{message}"),
            LogLevel::Warn => warn!(target: "morph::log", "{message}"),
            LogLevel::Error => error!(target: "morph::log", "{message}"),
        }
        Ok(UtilityResult::null().with_details(message))
    }
}
