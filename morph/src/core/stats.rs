//! Aggregate counters over the results of a run.

use serde::Serialize;

use crate::core::result::{
    ExecutionResult, OperationKind, PerformKind, PerformResult, UtilityKind,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub performed: usize,
    pub utilities: usize,
    pub operations: usize,
    pub utility_null: usize,
    pub utility_value: usize,
    pub utility_warning: usize,
    pub utility_error: usize,
    pub operation_no_op: usize,
    pub operation_success: usize,
    pub operation_warning: usize,
    pub operation_error: usize,
    pub skipped_condition: usize,
    pub skipped_dependency: usize,
    pub error_pre_validation: usize,
    /// Perform-level errors (already performed, path or property failures).
    pub perform_error: usize,
    /// Non-fatal warnings recorded across all results.
    pub warnings: usize,
}

impl RunStatistics {
    pub fn from_results(results: &[PerformResult]) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.record(result);
        }
        stats
    }

    fn record(&mut self, result: &PerformResult) {
        self.performed += 1;
        self.warnings += result.warnings().len();
        match result.kind() {
            PerformKind::Executed(ExecutionResult::Utility(r)) => {
                self.utilities += 1;
                match r.kind() {
                    UtilityKind::Null => self.utility_null += 1,
                    UtilityKind::Value => self.utility_value += 1,
                    UtilityKind::Warning => self.utility_warning += 1,
                    UtilityKind::Error => self.utility_error += 1,
                }
            }
            PerformKind::Executed(ExecutionResult::Operation(r)) => {
                self.operations += 1;
                match r.kind() {
                    OperationKind::NoOp => self.operation_no_op += 1,
                    OperationKind::Success => self.operation_success += 1,
                    OperationKind::Warning => self.operation_warning += 1,
                    OperationKind::Error => self.operation_error += 1,
                }
            }
            PerformKind::SkippedCondition => self.skipped_condition += 1,
            PerformKind::SkippedDependency => self.skipped_dependency += 1,
            PerformKind::ErrorPreValidation(_) => self.error_pre_validation += 1,
            PerformKind::Error(_) => self.perform_error += 1,
        }
    }

    /// Error-class results of any kind.
    pub fn errors(&self) -> usize {
        self.utility_error + self.operation_error + self.error_pre_validation + self.perform_error
    }

    /// WARNING-typed results plus recorded warnings.
    pub fn has_warnings(&self) -> bool {
        self.utility_warning + self.operation_warning + self.warnings > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StepError;
    use crate::core::result::{OperationResult, StepRole, UtilityResult};

    #[test]
    fn counts_by_kind() {
        let results = vec![
            PerformResult::executed(
                "a",
                StepRole::Utility,
                ExecutionResult::Utility(UtilityResult::value(1)),
            ),
            PerformResult::executed(
                "b",
                StepRole::Operation,
                ExecutionResult::Operation(OperationResult::success("done").with_warning("w")),
            ),
            PerformResult::skipped_dependency("c", StepRole::Utility, "skipped".into()),
            PerformResult::error_pre_validation(
                "d",
                StepError::PathNotSet { step: "d".into() },
            ),
        ];
        let stats = RunStatistics::from_results(&results);
        assert_eq!(stats.performed, 4);
        assert_eq!(stats.utility_value, 1);
        assert_eq!(stats.operation_warning, 1);
        assert_eq!(stats.skipped_dependency, 1);
        assert_eq!(stats.error_pre_validation, 1);
        assert_eq!(stats.warnings, 1);
        assert_eq!(stats.errors(), 1);
        assert!(stats.has_warnings());
    }
}
