//! Per-step perform protocol.
//!
//! Every attached step goes through the same sequence: execute-once check,
//! property injection, dependency check, gate, path resolution, execution,
//! context persistence. Leaf steps only ever see the execution part.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::context::Context;
use crate::core::definition::{Body, Gate, StepDef};
use crate::core::error::StepError;
use crate::core::property::coerce;
use crate::core::result::{ExecutionResult, OperationResult, PerformResult, StepRole, UtilityResult};
use crate::core::template::{StepId, Template};
use crate::core::value::Value;
use crate::fanout;
use crate::looping;

/// What the orchestrator has to do once a step has been performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FollowUp {
    None,
    /// Perform the step's children, in order.
    Children,
    /// Run one more loop iteration.
    Iterate,
}

#[derive(Debug)]
pub(crate) struct Performed {
    pub(crate) result: PerformResult,
    pub(crate) follow_up: FollowUp,
}

impl Performed {
    fn done(result: PerformResult) -> Self {
        Self {
            result,
            follow_up: FollowUp::None,
        }
    }
}

/// Perform a single attached step against `root`.
///
/// Containers are performed as steps of their own; their children are not
/// touched here. A step can only be performed once, later calls yield an
/// `ERROR` result and have no side effects.
pub fn perform(template: &mut Template, id: StepId, root: &Path, ctx: &mut Context) -> PerformResult {
    perform_step(template, id, root, ctx).result
}

pub(crate) fn perform_step(
    template: &mut Template,
    id: StepId,
    root: &Path,
    ctx: &mut Context,
) -> Performed {
    let node = template.node(id);
    let name = node.name().to_string();
    if node.has_been_performed() {
        warn!(step = %name, "step has already been performed");
        return Performed::done(PerformResult::failed(
            &name,
            node.def().role(),
            StepError::AlreadyPerformed { step: name.clone() },
        ));
    }

    let performed = gate_and_execute(template, id, &name, root, ctx);
    template.node_mut(id).performed = true;

    let node = template.node(id);
    let result = &performed.result;
    debug!(step = %name, result = result.label(), details = ?result.details(), "step performed");
    if let Some(err) = result.error() {
        warn!(step = %name, result = result.label(), err = %err, "step failed");
    }
    for warning in result.warnings() {
        warn!(step = %name, warning = %warning, "step warning");
    }

    ctx.put_result(result.clone());
    if node.def().settings.save_result && result.is_persistable() {
        let value = result.value().cloned().unwrap_or(Value::Null);
        ctx.put(node.context_attribute(), value);
    }
    performed
}

fn gate_and_execute(
    template: &mut Template,
    id: StepId,
    name: &str,
    root: &Path,
    ctx: &Context,
) -> Performed {
    let role = template.node(id).def().role();

    if let Err(err) = apply_late_bindings(&mut template.node_mut(id).def, name, ctx) {
        return Performed::done(PerformResult::failed(name, role, err));
    }

    let def = template.node(id).def();
    if let Some(details) = unmet_dependency(def, name, ctx) {
        debug!(step = %name, "{details}");
        return Performed::done(PerformResult::skipped_dependency(name, role, details));
    }
    if let Some(details) = failing_gate(def, name, root, ctx) {
        debug!(step = %name, "{details}");
        return Performed::done(PerformResult::skipped_condition(name, role, details));
    }

    let file = match def.settings.path.resolve(name, root, ctx) {
        Ok(file) => file,
        Err(err) => {
            let result = match role {
                StepRole::Operation => PerformResult::error_pre_validation(name, err),
                StepRole::Utility => PerformResult::failed(name, role, err),
            };
            return Performed::done(result);
        }
    };
    debug!(step = %name, file = %file.display(), "executing step");

    match &def.body {
        Body::Utility(leaf) => {
            let result = guarded(name, || leaf.execute(&file, ctx)).unwrap_or_else(UtilityResult::error);
            Performed::done(executed_utility(name, result))
        }
        Body::Operation(leaf) => {
            let result = guarded(name, || leaf.execute(&file, ctx)).unwrap_or_else(OperationResult::error);
            Performed::done(PerformResult::executed(
                name,
                StepRole::Operation,
                ExecutionResult::Operation(result),
            ))
        }
        Body::Condition(leaf) => {
            let result = match guarded(name, || leaf.evaluate(&file, ctx)) {
                Ok(value) => UtilityResult::value(value),
                Err(err) => UtilityResult::error(err),
            };
            Performed::done(executed_utility(name, result))
        }
        Body::Group(_) => {
            let children: Vec<Value> = template
                .children(id)
                .iter()
                .map(|&child| Value::Text(template.node(child).name().to_string()))
                .collect();
            Performed {
                result: executed_utility(name, UtilityResult::value(Value::List(children))),
                follow_up: FollowUp::Children,
            }
        }
        Body::Loop(spec) => {
            let result = looping::evaluate(spec, name, root, ctx);
            let follow_up = if result.value_ref() == Some(&Value::Bool(true)) {
                FollowUp::Iterate
            } else {
                FollowUp::None
            };
            Performed {
                result: executed_utility(name, result),
                follow_up,
            }
        }
        Body::MultipleOperations(spec) => {
            let expansion = fanout::expand(spec, name, def.settings.path_explicit, &file, root, ctx);
            match expansion {
                Ok(expansion) => {
                    let names = fanout::attach(template, id, expansion.clones);
                    let result = UtilityResult::value(Value::List(names)).with_details(expansion.details);
                    Performed {
                        result: executed_utility(name, result),
                        follow_up: FollowUp::Children,
                    }
                }
                Err(err) => Performed::done(executed_utility(name, UtilityResult::error(err))),
            }
        }
        Body::MultipleConditions(spec) => {
            let result = match fanout::evaluate_files(spec, name, root, ctx) {
                Ok(value) => UtilityResult::value(value),
                Err(err) => UtilityResult::error(err),
            };
            Performed::done(executed_utility(name, result))
        }
        Body::FilterFiles(spec) => {
            let result = match fanout::filter_files(spec, name, root, ctx) {
                Ok(files) => {
                    let details = format!(
                        "FilterFiles {name} resulted in {} files based on {}",
                        files.len(),
                        spec.template.type_name()
                    );
                    if files.is_empty() {
                        UtilityResult::null().with_details(details)
                    } else {
                        UtilityResult::value(Value::Files(files)).with_details(details)
                    }
                }
                Err(err) => UtilityResult::error(err),
            };
            Performed::done(executed_utility(name, result))
        }
    }
}

fn executed_utility(name: &str, result: UtilityResult) -> PerformResult {
    PerformResult::executed(name, StepRole::Utility, ExecutionResult::Utility(result))
}

/// Inject context attribute values into the step's bound properties.
pub(crate) fn apply_late_bindings(def: &mut StepDef, name: &str, ctx: &Context) -> Result<(), StepError> {
    let bindings = def.settings.late_bindings.clone();
    for binding in &bindings {
        let value = ctx
            .get(&binding.attribute)
            .ok_or_else(|| StepError::PropertyAttributeMissing {
                step: name.to_string(),
                property: binding.property.clone(),
                attribute: binding.attribute.clone(),
            })?;
        let not_assignable = |reason: String| StepError::PropertyNotAssignable {
            step: name.to_string(),
            property: binding.property.clone(),
            attribute: binding.attribute.clone(),
            reason,
        };
        let coerced = coerce(value, &binding.spec).map_err(not_assignable)?;
        def.set_leaf_property(&binding.property, coerced)
            .map_err(|err| not_assignable(format!("{err:#}")))?;
        debug!(step = %name, property = %binding.property, attribute = %binding.attribute, "property set from context");
    }
    Ok(())
}

fn unmet_dependency(def: &StepDef, name: &str, ctx: &Context) -> Option<String> {
    def.dependencies().iter().find_map(|dependency| match ctx.result(dependency) {
        None => Some(format!(
            "{name} was skipped because its dependency {dependency} has not been executed yet"
        )),
        Some(result) if result.is_dependency_failure() => Some(format!(
            "{name} was skipped because its dependency {dependency} resulted in {}",
            result.label()
        )),
        Some(_) => None,
    })
}

fn failing_gate(def: &StepDef, name: &str, root: &Path, ctx: &Context) -> Option<String> {
    match def.settings.gate.as_ref()? {
        Gate::If(attribute) => (!ctx.flag(attribute))
            .then(|| format!("{name} was skipped due to failing 'if' condition: {attribute}")),
        Gate::Unless(attribute) => ctx
            .flag(attribute)
            .then(|| format!("{name} was skipped due to failing 'unless' condition: {attribute}")),
        Gate::When(condition) => {
            let condition_name = embedded_condition_name(condition, name);
            let passed = match evaluate_isolated(condition, &condition_name, root, ctx) {
                Ok(value) => value,
                Err(err) => {
                    debug!(step = %name, condition = %condition_name, err = %err, "condition evaluation failed");
                    false
                }
            };
            (!passed).then(|| format!("{name} was skipped due to failing condition: {condition_name}"))
        }
    }
}

/// Name an embedded condition gets when it has none of its own.
pub(crate) fn embedded_condition_name(condition: &StepDef, owner: &str) -> String {
    condition
        .name()
        .map_or_else(|| format!("{owner}_condition"), str::to_string)
}

/// Evaluate a condition on a private copy, without dependencies, gate or
/// persistence.
pub(crate) fn evaluate_isolated(
    condition: &StepDef,
    name: &str,
    root: &Path,
    ctx: &Context,
) -> Result<bool, StepError> {
    let mut condition = condition.clone();
    apply_late_bindings(&mut condition, name, ctx)?;
    match &condition.body {
        Body::Condition(leaf) => {
            let file = condition.settings.path.resolve(name, root, ctx)?;
            guarded(name, || leaf.evaluate(&file, ctx))
        }
        Body::MultipleConditions(spec) => fanout::evaluate_files(spec, name, root, ctx),
        _ => Err(StepError::NotBoolean {
            step: name.to_string(),
        }),
    }
}

/// Run leaf code, turning errors and panics into a [`StepError`].
fn guarded<T>(step: &str, f: impl FnOnce() -> Result<T>) -> Result<T, StepError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(StepError::Failed {
            step: step.to_string(),
            message: format!("{err:#}"),
        }),
        Err(payload) => Err(StepError::Panicked {
            step: step.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
