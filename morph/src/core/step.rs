//! Leaf step contracts.
//!
//! Leaf steps only provide their execution body and a description. Path
//! resolution, gating, property injection and context persistence belong to
//! the perform protocol and must not be done here.
//!
//! Every leaf must be cloneable: loops and fan-out containers stamp out fresh
//! instances from a template. The `*Clone` helper traits are implemented for
//! any `Clone` leaf, so a non-cloneable leaf is rejected at compile time.

use std::fmt;
use std::path::Path;

use anyhow::{Result, bail};

use crate::core::context::Context;
use crate::core::property::PropertySpec;
use crate::core::result::{OperationResult, UtilityResult};
use crate::core::value::Value;

/// Behavior shared by every leaf step.
pub trait Leaf: fmt::Debug {
    /// Short type name, used in generated step names.
    fn type_name(&self) -> &'static str;

    /// One-line, specific description of what this instance does.
    fn description(&self) -> String;

    /// Properties that may be bound to context attributes.
    fn properties(&self) -> &'static [PropertySpec] {
        &[]
    }

    /// Assign an already coerced property value.
    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        let _ = value;
        bail!("{} has no property {name}", self.type_name())
    }
}

/// Read-only step: inspects the tree and/or the context.
pub trait Utility: Leaf + UtilityClone {
    fn execute(&self, file: &Path, ctx: &Context) -> Result<UtilityResult>;
}

/// Mutating step: changes the file tree.
pub trait Operation: Leaf + OperationClone {
    fn execute(&self, file: &Path, ctx: &Context) -> Result<OperationResult>;
}

/// Single-file condition; always evaluates to a boolean.
pub trait Condition: Leaf + ConditionClone {
    fn evaluate(&self, file: &Path, ctx: &Context) -> Result<bool>;
}

/// Comparison predicate used by two-file conditions. Only called when both
/// files exist.
pub trait FileComparison: Leaf + ComparisonClone {
    fn compare(&self, baseline: &Path, comparison: &Path) -> Result<bool>;
}

pub trait UtilityClone {
    fn clone_utility(&self) -> Box<dyn Utility>;
}

impl<T: Utility + Clone + 'static> UtilityClone for T {
    fn clone_utility(&self) -> Box<dyn Utility> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Utility> {
    fn clone(&self) -> Self {
        self.clone_utility()
    }
}

pub trait OperationClone {
    fn clone_operation(&self) -> Box<dyn Operation>;
}

impl<T: Operation + Clone + 'static> OperationClone for T {
    fn clone_operation(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Operation> {
    fn clone(&self) -> Self {
        self.clone_operation()
    }
}

pub trait ConditionClone {
    fn clone_condition(&self) -> Box<dyn Condition>;
}

impl<T: Condition + Clone + 'static> ConditionClone for T {
    fn clone_condition(&self) -> Box<dyn Condition> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Condition> {
    fn clone(&self) -> Self {
        self.clone_condition()
    }
}

pub trait ComparisonClone {
    fn clone_comparison(&self) -> Box<dyn FileComparison>;
}

impl<T: FileComparison + Clone + 'static> ComparisonClone for T {
    fn clone_comparison(&self) -> Box<dyn FileComparison> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn FileComparison> {
    fn clone(&self) -> Self {
        self.clone_comparison()
    }
}
