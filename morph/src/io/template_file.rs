//! Templates defined in TOML.
//!
//! ```toml
//! name = "upgrade"
//!
//! [[steps]]
//! type = "find_files"
//! name = "poms"
//! pattern = '^pom\.xml$'
//! recursive = true
//!
//! [[steps]]
//! type = "multiple_operations"
//! files = ["poms"]
//! [steps.template]
//! type = "write_file"
//! content = "upgraded"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::core::definition::{LoopCondition, MultiMode, StepDef};
use crate::core::template::{StepId, Template};
use crate::steps::{
    Abort, CompareFiles, DeleteFile, FileExists, FindFiles, Log, LogLevel, ManualInstruction,
    ResultCondition, WriteFile,
};

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateFile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

/// One `[[steps]]` table: settings shared by every step plus a `type`-tagged body.
#[derive(Debug, Clone, Deserialize)]
pub struct StepEntry {
    #[serde(flatten)]
    common: CommonEntry,
    #[serde(flatten)]
    kind: KindEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CommonEntry {
    name: Option<String>,
    relative: Option<String>,
    absolute: Option<String>,
    absolute_suffix: Option<String>,
    depends_on: Vec<String>,
    #[serde(rename = "if")]
    if_attribute: Option<String>,
    unless: Option<String>,
    when: Option<Box<StepEntry>>,
    save_result: Option<bool>,
    context_attribute: Option<String>,
    abort_on_failure: Option<bool>,
    abort_message: Option<String>,
    /// Property name to context attribute.
    set: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModeEntry {
    #[default]
    AtLeastOne,
    All,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KindEntry {
    Log {
        message: String,
        #[serde(default)]
        level: LogLevel,
    },
    Abort {
        message: String,
    },
    FindFiles {
        pattern: String,
        #[serde(default)]
        recursive: bool,
        #[serde(default)]
        include_folders: bool,
    },
    FileExists,
    CompareFiles {
        attribute: String,
    },
    ResultCondition {
        step: String,
    },
    WriteFile {
        content: String,
    },
    DeleteFile,
    ManualInstruction {
        description: String,
    },
    Group {
        #[serde(default)]
        steps: Vec<StepEntry>,
    },
    Loop {
        times: Option<u32>,
        #[serde(rename = "while")]
        while_attribute: Option<String>,
        condition: Option<Box<StepEntry>>,
        template: Box<StepEntry>,
    },
    MultipleOperations {
        #[serde(default)]
        files: Vec<String>,
        property: Option<String>,
        values: Option<String>,
        template: Box<StepEntry>,
    },
    MultipleConditions {
        #[serde(default)]
        files: Vec<String>,
        #[serde(default)]
        mode: ModeEntry,
        template: Box<StepEntry>,
    },
    FilterFiles {
        #[serde(default)]
        files: Vec<String>,
        template: Box<StepEntry>,
    },
}

/// Read and build a template file.
pub fn load_template(path: &Path) -> Result<Template> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_template(&contents).with_context(|| format!("load template {}", path.display()))
}

/// Build a template from TOML text.
pub fn parse_template(contents: &str) -> Result<Template> {
    let file: TemplateFile = toml::from_str(contents).context("parse template toml")?;
    build_template(&file)
}

pub fn build_template(file: &TemplateFile) -> Result<Template> {
    if file.name.trim().is_empty() {
        bail!("template name cannot be blank");
    }
    let mut template = Template::new(&file.name);
    if let Some(description) = &file.description {
        template = template.with_description(description);
    }
    for entry in &file.steps {
        attach(&mut template, entry)?;
    }
    Ok(template)
}

fn attach(template: &mut Template, entry: &StepEntry) -> Result<StepId> {
    let def = to_def(entry)?;
    let label = def.name().unwrap_or(def.type_name()).to_string();
    template
        .add(def)
        .with_context(|| format!("attach step {label}"))
}

fn to_def(entry: &StepEntry) -> Result<StepDef> {
    let mut def = apply_common(kind_def(&entry.kind)?, &entry.common)?;
    if let KindEntry::Group { steps } = &entry.kind {
        for child in steps {
            let child = to_def(child)?;
            let label = child.name().unwrap_or(child.type_name()).to_string();
            def = def
                .with_child(child)
                .with_context(|| format!("attach step {label}"))?;
        }
    }
    Ok(def)
}

fn kind_def(kind: &KindEntry) -> Result<StepDef> {
    let def = match kind {
        KindEntry::Log { message, level } => StepDef::utility(Log::new(message).with_level(*level)),
        KindEntry::Abort { message } => Abort::step(message),
        KindEntry::FindFiles {
            pattern,
            recursive,
            include_folders,
        } => StepDef::utility(
            FindFiles::new(pattern)?
                .recursive(*recursive)
                .include_folders(*include_folders),
        ),
        KindEntry::FileExists => StepDef::condition(FileExists),
        KindEntry::CompareFiles { attribute } => CompareFiles::step(attribute),
        KindEntry::ResultCondition { step } => StepDef::condition(ResultCondition::new(step)),
        KindEntry::WriteFile { content } => StepDef::operation(WriteFile::new(content)),
        KindEntry::DeleteFile => StepDef::operation(DeleteFile),
        KindEntry::ManualInstruction { description } => {
            StepDef::utility(ManualInstruction::new(description)).save_result(false)
        }
        KindEntry::Group { .. } => StepDef::group(),
        KindEntry::Loop {
            times,
            while_attribute,
            condition,
            template,
        } => {
            let condition = match (times, while_attribute, condition) {
                (Some(times), None, None) => LoopCondition::Times(*times),
                (None, Some(attribute), None) => LoopCondition::Attribute(attribute.clone()),
                (None, None, Some(condition)) => LoopCondition::Condition(Box::new(to_def(condition)?)),
                _ => bail!("loop needs exactly one of 'times', 'while' or 'condition'"),
            };
            StepDef::looping(to_def(template)?, condition)?
        }
        KindEntry::MultipleOperations {
            files,
            property,
            values,
            template,
        } => {
            let def = StepDef::multiple_operations(to_def(template)?)?.files(files.iter().cloned());
            match (property, values) {
                (Some(property), Some(values)) => def.property_values(property, values)?,
                (None, None) => def,
                _ => bail!("'property' and 'values' must be set together"),
            }
        }
        KindEntry::MultipleConditions {
            files,
            mode,
            template,
        } => {
            let mode = match mode {
                ModeEntry::AtLeastOne => MultiMode::AtLeastOne,
                ModeEntry::All => MultiMode::All,
            };
            StepDef::multiple_conditions(to_def(template)?)?
                .files(files.iter().cloned())
                .mode(mode)
        }
        KindEntry::FilterFiles { files, template } => {
            StepDef::filter_files(to_def(template)?)?.files(files.iter().cloned())
        }
    };
    Ok(def)
}

fn apply_common(mut def: StepDef, common: &CommonEntry) -> Result<StepDef> {
    if let Some(name) = &common.name {
        def = def.named(name);
    }
    if common.relative.is_some() && common.absolute.is_some() {
        bail!("'relative' and 'absolute' cannot both be set");
    }
    if let Some(relative) = &common.relative {
        def = def.relative(relative);
    }
    if let Some(attribute) = &common.absolute {
        def = match &common.absolute_suffix {
            Some(suffix) => def.absolute_with(attribute, suffix),
            None => def.absolute(attribute),
        };
    }
    if !common.depends_on.is_empty() {
        def = def.depends_on(common.depends_on.iter().cloned());
    }
    match (&common.if_attribute, &common.unless, &common.when) {
        (None, None, None) => {}
        (Some(attribute), None, None) => def = def.execute_if(attribute),
        (None, Some(attribute), None) => def = def.execute_unless(attribute),
        (None, None, Some(condition)) => def = def.execute_when(to_def(condition)?)?,
        _ => bail!("only one of 'if', 'unless' or 'when' can be set"),
    }
    if let Some(save) = common.save_result {
        def = def.save_result(save);
    }
    if let Some(attribute) = &common.context_attribute {
        def = def.context_attribute(attribute);
    }
    if let Some(abort) = common.abort_on_failure {
        def = def.abort_on_failure(abort);
    }
    if let Some(message) = &common.abort_message {
        def = def.abort_with(message);
    }
    for (property, attribute) in &common.set {
        def = def.set_from_context(property, attribute)?;
    }
    Ok(def)
}
