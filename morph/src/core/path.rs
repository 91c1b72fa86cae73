//! Target file resolution.
//!
//! A step points at its target either through a literal path relative to the
//! root folder, or through a context attribute holding an absolute file plus an
//! optional extra relative suffix. The second form can only be resolved at
//! perform time.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::core::context::Context;
use crate::core::error::StepError;
use crate::core::value::Value;

/// How a step locates the file or folder it acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSource {
    /// Path relative to the root folder; an empty path is the root itself.
    Relative(PathBuf),
    /// Absolute file taken from a context attribute, plus an optional suffix.
    Attribute {
        attribute: String,
        suffix: Option<String>,
    },
    /// Nothing set yet.
    Unset,
}

impl PathSource {
    pub fn is_set(&self) -> bool {
        !matches!(self, PathSource::Unset)
    }

    /// Resolve against `root`, reading the context for attribute sources.
    pub fn resolve(&self, step: &str, root: &Path, ctx: &Context) -> Result<PathBuf, StepError> {
        match self {
            PathSource::Unset => Err(StepError::PathNotSet {
                step: step.to_string(),
            }),
            PathSource::Relative(relative) => Ok(join_relative(root, relative)),
            PathSource::Attribute { attribute, suffix } => {
                let base = match ctx.get(attribute) {
                    None => {
                        return Err(StepError::PathAttributeMissing {
                            step: step.to_string(),
                            attribute: attribute.clone(),
                        });
                    }
                    Some(Value::Null) => {
                        return Err(StepError::PathAttributeNull {
                            step: step.to_string(),
                            attribute: attribute.clone(),
                        });
                    }
                    Some(value) => value.as_path().ok_or_else(|| StepError::PathAttributeNotAFile {
                        step: step.to_string(),
                        attribute: attribute.clone(),
                        found: value.type_name(),
                    })?,
                };
                Ok(match suffix {
                    Some(suffix) => join_relative(base, Path::new(suffix)),
                    None => base.to_path_buf(),
                })
            }
        }
    }
}

/// Replace both `/` and `\` with the platform separator.
pub fn normalize_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

fn join_relative(base: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}

/// Express `file` relative to `root`, falling back to the file itself when it
/// lives elsewhere.
pub fn relative_to(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root).unwrap_or(file).to_path_buf()
}
