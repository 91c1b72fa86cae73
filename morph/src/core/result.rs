//! Execution and perform results.
//!
//! Utilities and operations each have their own closed set of execution
//! outcomes. The perform layer wraps either of them and adds the states a step
//! can end in without executing (skips and pre-execution errors). The
//! "exception type" and "dependency failure" classifications are plain matches
//! over these enums.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::StepError;
use crate::core::value::Value;

/// Outcome of a utility execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilityKind {
    /// Ran normally but produced no value.
    Null,
    /// Ran normally and produced a value.
    Value,
    /// Degraded but valid outcome; may carry a value and/or an error.
    Warning,
    /// Failed; carries the fault.
    Error,
}

/// Outcome of an operation execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    NoOp,
    Success,
    Warning,
    Error,
}

/// Whether a step inspects the tree or mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepRole {
    Utility,
    Operation,
}

/// Work a transformation leaves to the user, with the document describing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInstructionRecord {
    pub description: String,
    pub resource: PathBuf,
}

/// Result of a utility's own execution logic.
#[derive(Debug, Clone, PartialEq)]
pub struct UtilityResult {
    kind: UtilityKind,
    value: Option<Value>,
    details: Option<String>,
    warnings: Vec<String>,
    error: Option<StepError>,
    instruction: Option<ManualInstructionRecord>,
}

impl UtilityResult {
    fn with_kind(kind: UtilityKind) -> Self {
        Self {
            kind,
            value: None,
            details: None,
            warnings: Vec::new(),
            error: None,
            instruction: None,
        }
    }

    pub fn null() -> Self {
        Self::with_kind(UtilityKind::Null)
    }

    /// A `VALUE` result. A `Null` value is coerced to a `NULL` result.
    pub fn value(value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return Self::null();
        }
        Self {
            value: Some(value),
            ..Self::with_kind(UtilityKind::Value)
        }
    }

    pub fn warning(value: Option<Value>) -> Self {
        Self {
            value: value.filter(|v| !v.is_null()),
            ..Self::with_kind(UtilityKind::Warning)
        }
    }

    /// A `WARNING` result that also records the fault that degraded it.
    pub fn warning_with_error(value: Option<Value>, error: StepError) -> Self {
        Self {
            error: Some(error),
            ..Self::warning(value)
        }
    }

    pub fn error(error: StepError) -> Self {
        Self {
            error: Some(error),
            ..Self::with_kind(UtilityKind::Error)
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Record a non-fatal warning. `NULL` and `VALUE` are demoted to `WARNING`,
    /// nothing is ever demoted further.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        if matches!(self.kind, UtilityKind::Null | UtilityKind::Value) {
            self.kind = UtilityKind::Warning;
        }
        self
    }

    pub fn kind(&self) -> UtilityKind {
        self.kind
    }

    pub fn value_ref(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn error_ref(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    /// Attach a manual instruction to be reported at the end of the run.
    pub fn with_instruction(mut self, instruction: ManualInstructionRecord) -> Self {
        self.instruction = Some(instruction);
        self
    }

    pub fn instruction(&self) -> Option<&ManualInstructionRecord> {
        self.instruction.as_ref()
    }

    pub fn is_exception_type(&self) -> bool {
        matches!(self.kind, UtilityKind::Error | UtilityKind::Warning)
    }

    pub fn is_dependency_failure(&self) -> bool {
        matches!(self.kind, UtilityKind::Null | UtilityKind::Error)
    }
}

/// Result of an operation's own execution logic.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    kind: OperationKind,
    value: Option<Value>,
    details: Option<String>,
    warnings: Vec<String>,
    error: Option<StepError>,
}

impl OperationResult {
    fn with_kind(kind: OperationKind) -> Self {
        Self {
            kind,
            value: None,
            details: None,
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn no_op(details: impl Into<String>) -> Self {
        Self::with_kind(OperationKind::NoOp).with_details(details)
    }

    pub fn success(details: impl Into<String>) -> Self {
        Self::with_kind(OperationKind::Success).with_details(details)
    }

    pub fn warning(details: impl Into<String>) -> Self {
        Self::with_kind(OperationKind::Warning).with_details(details)
    }

    pub fn warning_with_error(error: StepError) -> Self {
        Self {
            error: Some(error),
            ..Self::with_kind(OperationKind::Warning)
        }
    }

    pub fn error(error: StepError) -> Self {
        Self {
            error: Some(error),
            ..Self::with_kind(OperationKind::Error)
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach a value to be stored in the context alongside the result.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.value = (!value.is_null()).then_some(value);
        self
    }

    /// Record a non-fatal warning. `NO_OP` and `SUCCESS` are demoted to `WARNING`.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        if matches!(self.kind, OperationKind::NoOp | OperationKind::Success) {
            self.kind = OperationKind::Warning;
        }
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn value_ref(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn error_ref(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    pub fn is_exception_type(&self) -> bool {
        matches!(self.kind, OperationKind::Error | OperationKind::Warning)
    }

    pub fn is_dependency_failure(&self) -> bool {
        matches!(self.kind, OperationKind::Error)
    }
}

/// Either kind of execution result.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Utility(UtilityResult),
    Operation(OperationResult),
}

impl ExecutionResult {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionResult::Utility(r) => match r.kind() {
                UtilityKind::Null => "NULL",
                UtilityKind::Value => "VALUE",
                UtilityKind::Warning => "WARNING",
                UtilityKind::Error => "ERROR",
            },
            ExecutionResult::Operation(r) => match r.kind() {
                OperationKind::NoOp => "NO_OP",
                OperationKind::Success => "SUCCESS",
                OperationKind::Warning => "WARNING",
                OperationKind::Error => "ERROR",
            },
        }
    }

    pub fn is_exception_type(&self) -> bool {
        match self {
            ExecutionResult::Utility(r) => r.is_exception_type(),
            ExecutionResult::Operation(r) => r.is_exception_type(),
        }
    }

    pub fn is_dependency_failure(&self) -> bool {
        match self {
            ExecutionResult::Utility(r) => r.is_dependency_failure(),
            ExecutionResult::Operation(r) => r.is_dependency_failure(),
        }
    }

    pub fn is_error(&self) -> bool {
        match self {
            ExecutionResult::Utility(r) => r.kind() == UtilityKind::Error,
            ExecutionResult::Operation(r) => r.kind() == OperationKind::Error,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ExecutionResult::Utility(r) => r.value_ref(),
            ExecutionResult::Operation(r) => r.value_ref(),
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ExecutionResult::Utility(r) => r.details(),
            ExecutionResult::Operation(r) => r.details(),
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            ExecutionResult::Utility(r) => r.warnings(),
            ExecutionResult::Operation(r) => r.warnings(),
        }
    }

    pub fn error(&self) -> Option<&StepError> {
        match self {
            ExecutionResult::Utility(r) => r.error_ref(),
            ExecutionResult::Operation(r) => r.error_ref(),
        }
    }
}

/// How a perform call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PerformKind {
    /// The step's own logic ran; see the wrapped result.
    Executed(ExecutionResult),
    /// The step's condition evaluated to false.
    SkippedCondition,
    /// A dependency had not run, or ran and failed.
    SkippedDependency,
    /// An operation failed before its execution was attempted.
    ErrorPreValidation(StepError),
    /// The step failed outside of its own execution logic.
    Error(StepError),
}

/// Outer result of performing one step.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformResult {
    step: String,
    role: StepRole,
    kind: PerformKind,
    details: Option<String>,
}

impl PerformResult {
    pub fn executed(step: impl Into<String>, role: StepRole, result: ExecutionResult) -> Self {
        let details = result.details().map(str::to_string);
        Self {
            step: step.into(),
            role,
            kind: PerformKind::Executed(result),
            details,
        }
    }

    pub fn skipped_condition(step: impl Into<String>, role: StepRole, details: String) -> Self {
        Self {
            step: step.into(),
            role,
            kind: PerformKind::SkippedCondition,
            details: Some(details),
        }
    }

    pub fn skipped_dependency(step: impl Into<String>, role: StepRole, details: String) -> Self {
        Self {
            step: step.into(),
            role,
            kind: PerformKind::SkippedDependency,
            details: Some(details),
        }
    }

    pub fn error_pre_validation(step: impl Into<String>, error: StepError) -> Self {
        Self {
            step: step.into(),
            role: StepRole::Operation,
            kind: PerformKind::ErrorPreValidation(error),
            details: None,
        }
    }

    pub fn failed(step: impl Into<String>, role: StepRole, error: StepError) -> Self {
        Self {
            step: step.into(),
            role,
            kind: PerformKind::Error(error),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn role(&self) -> StepRole {
        self.role
    }

    pub fn kind(&self) -> &PerformKind {
        &self.kind
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn execution(&self) -> Option<&ExecutionResult> {
        match &self.kind {
            PerformKind::Executed(result) => Some(result),
            _ => None,
        }
    }

    /// Value carried by the execution result, if any.
    pub fn value(&self) -> Option<&Value> {
        self.execution().and_then(ExecutionResult::value)
    }

    pub fn warnings(&self) -> &[String] {
        match self.execution() {
            Some(result) => result.warnings(),
            None => &[],
        }
    }

    /// Manual instruction produced by the step, if it produced one.
    pub fn instruction(&self) -> Option<&ManualInstructionRecord> {
        match self.execution() {
            Some(ExecutionResult::Utility(result)) => result.instruction(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StepError> {
        match &self.kind {
            PerformKind::Executed(result) => result.error(),
            PerformKind::ErrorPreValidation(err) | PerformKind::Error(err) => Some(err),
            PerformKind::SkippedCondition | PerformKind::SkippedDependency => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match &self.kind {
            PerformKind::Executed(result) => result.label(),
            PerformKind::SkippedCondition => "SKIPPED_CONDITION",
            PerformKind::SkippedDependency => "SKIPPED_DEPENDENCY",
            PerformKind::ErrorPreValidation(_) => "ERROR_PRE_VALIDATION",
            PerformKind::Error(_) => "ERROR",
        }
    }

    /// Skips are not exception types; perform-level errors always are.
    pub fn is_exception_type(&self) -> bool {
        match &self.kind {
            PerformKind::SkippedCondition | PerformKind::SkippedDependency => false,
            PerformKind::ErrorPreValidation(_) | PerformKind::Error(_) => true,
            PerformKind::Executed(result) => result.is_exception_type(),
        }
    }

    /// Whether a step depending on this one must be skipped.
    pub fn is_dependency_failure(&self) -> bool {
        match &self.kind {
            PerformKind::SkippedCondition
            | PerformKind::SkippedDependency
            | PerformKind::ErrorPreValidation(_)
            | PerformKind::Error(_) => true,
            PerformKind::Executed(result) => result.is_dependency_failure(),
        }
    }

    /// Error-class outcome, the only kind that can trigger an abort.
    pub fn is_error(&self) -> bool {
        match &self.kind {
            PerformKind::ErrorPreValidation(_) | PerformKind::Error(_) => true,
            PerformKind::Executed(result) => result.is_error(),
            PerformKind::SkippedCondition | PerformKind::SkippedDependency => false,
        }
    }

    /// Whether the result is worth persisting into the context attributes.
    pub(crate) fn is_persistable(&self) -> bool {
        matches!(&self.kind, PerformKind::Executed(result) if !result.is_error())
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            step: self.step.clone(),
            role: self.role,
            result: self.label().to_string(),
            details: self.details.clone(),
            warnings: self.warnings().to_vec(),
            error: self.error().map(ToString::to_string),
        }
    }
}

/// Serializable view of a perform result, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub step: String,
    pub role: StepRole,
    pub result: String,
    pub details: Option<String>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> StepError {
        StepError::Failed {
            step: "s".into(),
            message: "boom".into(),
        }
    }

    #[test]
    fn null_value_is_coerced_to_null_result() {
        let result = UtilityResult::value(Value::Null);
        assert_eq!(result.kind(), UtilityKind::Null);
        assert!(result.value_ref().is_none());
    }

    #[test]
    fn warnings_demote_success_but_never_errors() {
        let value = UtilityResult::value(true).with_warning("careful");
        assert_eq!(value.kind(), UtilityKind::Warning);
        assert_eq!(value.value_ref(), Some(&Value::Bool(true)));

        let error = UtilityResult::error(failure()).with_warning("careful");
        assert_eq!(error.kind(), UtilityKind::Error);

        let op = OperationResult::no_op("nothing").with_warning("careful");
        assert_eq!(op.kind(), OperationKind::Warning);
        assert_eq!(op.warnings(), ["careful".to_string()]);
    }

    #[test]
    fn dependency_failure_classification() {
        let null = ExecutionResult::Utility(UtilityResult::null());
        let value = ExecutionResult::Utility(UtilityResult::value(1));
        let no_op = ExecutionResult::Operation(OperationResult::no_op("n"));
        let op_error = ExecutionResult::Operation(OperationResult::error(failure()));
        assert!(null.is_dependency_failure());
        assert!(!value.is_dependency_failure());
        assert!(!no_op.is_dependency_failure());
        assert!(op_error.is_dependency_failure());

        let skipped = PerformResult::skipped_condition("s", StepRole::Utility, "d".into());
        assert!(skipped.is_dependency_failure());
        assert!(!skipped.is_exception_type());
        assert!(!skipped.is_error());
    }

    #[test]
    fn perform_error_carries_fault() {
        let result = PerformResult::error_pre_validation("op", failure());
        assert_eq!(result.label(), "ERROR_PRE_VALIDATION");
        assert!(result.is_exception_type());
        assert!(result.is_error());
        assert_eq!(result.error(), Some(&failure()));
    }

    #[test]
    fn failed_result_exposes_its_error() {
        let result = PerformResult::failed("s", StepRole::Utility, failure());
        assert_eq!(result.label(), "ERROR");
        assert!(result.is_error());
        assert_eq!(result.error(), Some(&failure()));
        assert!(result.instruction().is_none());
    }

    #[test]
    fn instructions_surface_through_the_perform_result() {
        let record = ManualInstructionRecord {
            description: "do it".into(),
            resource: PathBuf::from("docs/a.md"),
        };
        let result = PerformResult::executed(
            "s",
            StepRole::Utility,
            ExecutionResult::Utility(UtilityResult::value("do it").with_instruction(record.clone())),
        );
        assert_eq!(result.instruction(), Some(&record));
    }
}
