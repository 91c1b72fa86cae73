//! Error types for template definition and step execution.

use thiserror::Error;

/// Invalid configuration detected while building a template.
///
/// These are raised before any run starts and are never converted into results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("step name cannot be blank")]
    BlankName,

    #[error("{what} cannot be blank")]
    Blank { what: &'static str },

    #[error("invalid attempt to add step {name} to {parent}, its name is already registered")]
    DuplicateName { name: String, parent: String },

    #[error("neither absolute nor relative path has been set for step {step}")]
    PathNotSet { step: String },

    #[error("{property} is not a valid property of {step_type}")]
    UnknownProperty {
        property: String,
        step_type: &'static str,
    },

    #[error("the number of iterations should be equal or greater than 2, got {0}")]
    InvalidIterations(u32),

    #[error("operation {step} must always save its result")]
    OperationMustSaveResult { step: String },

    #[error("step {step} cannot be used as a condition")]
    NotACondition { step: String },

    #[error("step {step} cannot be used as a fan-out template: {reason}")]
    InvalidTemplate { step: String, reason: &'static str },

    #[error("{parent} cannot hold child steps")]
    NotAGroup { parent: String },

    #[error("unknown step id {0}")]
    UnknownStep(usize),
}

/// Fault carried by an error-class result.
///
/// Cloneable so results can live in the context and in the run report at the
/// same time. Leaf failures are flattened to their rendered message chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("step {step} has already been performed")]
    AlreadyPerformed { step: String },

    #[error("neither absolute nor relative path has been set for step {step}")]
    PathNotSet { step: String },

    #[error(
        "context attribute {attribute}, which is supposed to define absolute file for {step}, does not exist"
    )]
    PathAttributeMissing { step: String, attribute: String },

    #[error("context attribute {attribute}, which is supposed to define absolute file for {step}, is null")]
    PathAttributeNull { step: String, attribute: String },

    #[error("context attribute {attribute} for {step} holds a {found}, not a file")]
    PathAttributeNotAFile {
        step: String,
        attribute: String,
        found: &'static str,
    },

    #[error(
        "attempt to set property '{property}' for '{step}' failed, there is no context attribute named '{attribute}'"
    )]
    PropertyAttributeMissing {
        step: String,
        property: String,
        attribute: String,
    },

    #[error(
        "an error happened when setting property '{property}' from context attribute '{attribute}' in '{step}': {reason}"
    )]
    PropertyNotAssignable {
        step: String,
        property: String,
        attribute: String,
        reason: String,
    },

    #[error("{step} has failed: {message}")]
    Failed { step: String, message: String },

    #[error("{step} panicked: {message}")]
    Panicked { step: String, message: String },

    #[error("context attribute {attribute} does not contain a set of values")]
    NotASet { attribute: String },

    #[error("context attribute {attribute} contains an empty set of values")]
    EmptySet { attribute: String },

    #[error("multiple condition {step} has no files to evaluate")]
    NoFiles { step: String },

    #[error("condition {condition} failed while evaluating {file}: {message}")]
    ConditionFailed {
        condition: String,
        file: String,
        message: String,
    },

    #[error("condition {step} did not produce a boolean value")]
    NotBoolean { step: String },

    #[error("comparison file from attribute {attribute} is null or missing")]
    ComparisonFileMissing { attribute: String },

    #[error("{message}")]
    Abort { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_attribute_missing_names_property_and_attribute() {
        let err = StepError::PropertyAttributeMissing {
            step: "TU".into(),
            property: "color".into(),
            attribute: "ATT".into(),
        };
        let message = err.to_string();
        assert!(message.contains("'color'"));
        assert!(message.contains("'ATT'"));
    }
}
