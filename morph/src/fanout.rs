//! Dynamic fan-out over runtime-discovered files.
//!
//! Multiple-operations containers clone their template operation once per
//! file, and once more per configuration value when a property axis is set.
//! The clones become children of the container and are performed by the
//! orchestrator right after it. Multiple-conditions containers evaluate a
//! cloned single-file condition per file inline and reduce the answers to a
//! single boolean; file filters keep the files the condition holds for.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::context::Context;
use crate::core::definition::{
    FilterFilesSpec, MultiMode, MultipleConditionsSpec, MultipleOperationsSpec, StepDef,
};
use crate::core::error::StepError;
use crate::core::path::{PathSource, relative_to};
use crate::core::property::coerce;
use crate::core::template::{StepId, Template};
use crate::core::value::Value;
use crate::perform::evaluate_isolated;

/// Clones planned by a multiple-operations container, not yet attached.
#[derive(Debug)]
pub(crate) struct Expansion {
    pub(crate) clones: Vec<(String, StepDef)>,
    pub(crate) details: String,
}

/// Union of the files held by `attributes`, joined to `root` and deduplicated.
///
/// Missing attributes are ignored; attributes holding anything other than
/// files are ignored with a warning.
pub fn union_files(attributes: &[String], root: &Path, ctx: &Context) -> BTreeSet<PathBuf> {
    let mut files = BTreeSet::new();
    for attribute in attributes {
        let Some(value) = ctx.get(attribute) else {
            continue;
        };
        match value.as_files() {
            Some(found) => files.extend(found.into_iter().map(|file| root.join(file))),
            None if value.is_null() => {}
            None => warn!(attribute = %attribute, found = value.type_name(), "attribute does not hold files"),
        }
    }
    files
}

fn template_name(template: &StepDef, container: &str) -> String {
    template
        .name()
        .map_or_else(|| format!("{container}-{}-template", template.type_name()), str::to_string)
}

/// Plan the operations of a multiple-operations container.
pub(crate) fn expand(
    spec: &MultipleOperationsSpec,
    name: &str,
    path_explicit: bool,
    file: &Path,
    root: &Path,
    ctx: &Context,
) -> Result<Expansion, StepError> {
    let type_name = spec.template.type_name();
    let mut files = union_files(&spec.files, root, ctx);
    if files.is_empty() {
        if !path_explicit {
            debug!(step = %name, "multiple operation has no file to perform against");
            return Ok(Expansion {
                clones: Vec::new(),
                details: format!("Multiple operation {name} resulted in 0 operations based on {type_name}"),
            });
        }
        // Configuration-only fan-out against the container's own file.
        files.insert(file.to_path_buf());
    }

    let values = match &spec.axis {
        None => None,
        Some(axis) => match ctx.get(&axis.attribute) {
            Some(Value::Set(values)) if values.is_empty() => {
                return Err(StepError::EmptySet {
                    attribute: axis.attribute.clone(),
                });
            }
            Some(Value::Set(values)) => Some((axis, values)),
            _ => {
                return Err(StepError::NotASet {
                    attribute: axis.attribute.clone(),
                });
            }
        },
    };

    let base_name = template_name(&spec.template, name);
    let mut clones = Vec::new();
    for file in &files {
        let mut clone = (*spec.template).clone();
        clone.settings.path = PathSource::Relative(relative_to(root, file));
        clone.settings.path_explicit = true;
        match values {
            None => clones.push(clone),
            Some((axis, values)) => {
                for value in values {
                    let mut configured = clone.clone();
                    let not_assignable = |reason: String| StepError::PropertyNotAssignable {
                        step: base_name.clone(),
                        property: axis.spec.name.to_string(),
                        attribute: axis.attribute.clone(),
                        reason,
                    };
                    let coerced = coerce(value, &axis.spec).map_err(not_assignable)?;
                    configured
                        .set_leaf_property(axis.spec.name, coerced)
                        .map_err(|err| not_assignable(format!("{err:#}")))?;
                    clones.push(configured);
                }
            }
        }
    }

    let count = clones.len();
    debug!(step = %name, files = files.len(), operations = count, "multiple operation expanded");
    Ok(Expansion {
        clones: clones
            .into_iter()
            .enumerate()
            .map(|(i, def)| (format!("{base_name}-{}", i + 1), def))
            .collect(),
        details: format!("Multiple operation {name} resulted in {count} operations based on {type_name}"),
    })
}

/// Attach planned clones as children of `container`; returns their names.
pub(crate) fn attach(template: &mut Template, container: StepId, clones: Vec<(String, StepDef)>) -> Vec<Value> {
    let mut names = Vec::with_capacity(clones.len());
    for (order, (name, def)) in (1u32..).zip(clones) {
        names.push(Value::Text(name.clone()));
        template.attach_child(container, order, name, def);
    }
    names
}

/// Evaluate a multiple-conditions container.
///
/// Stops at the first decisive answer. Any evaluation failure fails the whole
/// aggregate.
pub(crate) fn evaluate_files(
    spec: &MultipleConditionsSpec,
    name: &str,
    root: &Path,
    ctx: &Context,
) -> Result<bool, StepError> {
    let files = union_files(&spec.files, root, ctx);
    if files.is_empty() {
        return Err(StepError::NoFiles {
            step: name.to_string(),
        });
    }

    let base_name = template_name(&spec.template, name);
    for (i, file) in files.iter().enumerate() {
        let condition_name = format!("{base_name}-{}", i + 1);
        let value = evaluate_file(&spec.template, &condition_name, file, root, ctx)?;
        debug!(step = %name, condition = %condition_name, file = %file.display(), value, "condition evaluated");
        match (spec.mode, value) {
            (MultiMode::AtLeastOne, true) => return Ok(true),
            (MultiMode::All, false) => return Ok(false),
            _ => {}
        }
    }
    Ok(spec.mode == MultiMode::All)
}

/// Files of a filter for which its condition holds, in path order.
///
/// No files is not an error: the filter simply keeps nothing. The first
/// evaluation failure fails the filter.
pub(crate) fn filter_files(
    spec: &FilterFilesSpec,
    name: &str,
    root: &Path,
    ctx: &Context,
) -> Result<Vec<PathBuf>, StepError> {
    let files = union_files(&spec.files, root, ctx);
    let base_name = template_name(&spec.template, name);
    let mut kept = Vec::new();
    for (i, file) in files.into_iter().enumerate() {
        let condition_name = format!("{base_name}-{}", i + 1);
        if evaluate_file(&spec.template, &condition_name, &file, root, ctx)? {
            kept.push(file);
        }
    }
    debug!(step = %name, kept = kept.len(), "files filtered");
    Ok(kept)
}

/// Evaluate a clone of `template` against one file, without saving its value.
fn evaluate_file(
    template: &StepDef,
    condition_name: &str,
    file: &Path,
    root: &Path,
    ctx: &Context,
) -> Result<bool, StepError> {
    let mut condition = template.clone().save_result(false);
    condition.settings.path = PathSource::Relative(relative_to(root, file));
    evaluate_isolated(&condition, condition_name, root, ctx).map_err(|err| StepError::ConditionFailed {
        condition: condition_name.to_string(),
        file: file.display().to_string(),
        message: err.to_string(),
    })
}
