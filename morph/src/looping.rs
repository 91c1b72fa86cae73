//! Loop container.
//!
//! Performing a loop only decides whether one more iteration has to run. When
//! it does, the orchestrator asks [`spawn_iteration`] for a fresh clone of the
//! templated child and a clone of the loop itself with the iteration counter
//! advanced, and performs both in that order. Termination is re-evaluated
//! lazily on every pass.

use std::path::Path;

use tracing::debug;

use crate::core::context::Context;
use crate::core::definition::{Body, LoopCondition, LoopSpec};
use crate::core::result::UtilityResult;
use crate::core::template::{StepId, Template, default_name};
use crate::core::value::Value;
use crate::perform::{embedded_condition_name, evaluate_isolated};

/// Decide whether iteration `spec.next_iteration()` runs.
///
/// The result is a boolean `VALUE`, or a `WARNING` carrying `false` when the
/// loop condition could not be evaluated.
pub(crate) fn evaluate(spec: &LoopSpec, name: &str, root: &Path, ctx: &Context) -> UtilityResult {
    let iteration = spec.next_iteration();
    let again = match spec.condition() {
        LoopCondition::Times(times) => iteration <= *times,
        LoopCondition::Attribute(attribute) => ctx.flag(attribute),
        LoopCondition::Condition(condition) => {
            let condition_name = embedded_condition_name(condition, name);
            match evaluate_isolated(condition, &condition_name, root, ctx) {
                Ok(value) => value,
                Err(err) => {
                    debug!(step = %name, condition = %condition_name, err = %err, "loop condition failed");
                    return UtilityResult::warning_with_error(Some(Value::Bool(false)), err)
                        .with_details(format!("Loop {name} stopped, its condition could not be evaluated"));
                }
            }
        }
    };
    debug!(step = %name, iteration, again, "loop condition evaluated");
    UtilityResult::value(again)
}

/// Create the next iteration of the loop performed as `loop_id`.
///
/// Returns the templated child, attached under the loop as
/// `<loop>-<iteration>-<Type>`, and the loop clone that decides on the
/// iteration after it. The loop clone keeps the loop's name and parent but is
/// not listed among the parent's children.
pub(crate) fn spawn_iteration(template: &mut Template, loop_id: StepId) -> Option<(StepId, StepId)> {
    let node = template.node(loop_id);
    let Body::Loop(spec) = &node.def().body else {
        return None;
    };
    let iteration = spec.next_iteration();
    let child_def = spec.template().clone();
    let child_name = default_name(node.name(), iteration, child_def.type_name());

    let loop_name = node.name().to_string();
    let parent = node.parent();
    let order = node.order();
    let mut next_def = node.def().clone();
    if let Body::Loop(next_spec) = &mut next_def.body {
        next_spec.next_iteration = iteration + 1;
    }

    let child = template.attach_child(loop_id, iteration, child_name, child_def);
    let next = template.attach_detached(parent, order, loop_name, next_def);
    Some((child, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::definition::StepDef;
    use crate::test_support::{CountingUtility, FailingCondition};

    fn spec(condition: LoopCondition) -> LoopSpec {
        let def = StepDef::looping(StepDef::utility(CountingUtility::new()), condition).unwrap();
        match def.body {
            Body::Loop(spec) => spec,
            _ => panic!("not a loop"),
        }
    }

    #[test]
    fn fixed_count_stops_after_last_iteration() {
        let mut spec = spec(LoopCondition::Times(2));
        let ctx = Context::new();
        let root = Path::new("/app");
        assert_eq!(evaluate(&spec, "l", root, &ctx).value_ref(), Some(&Value::Bool(true)));
        spec.next_iteration = 3;
        assert_eq!(evaluate(&spec, "l", root, &ctx).value_ref(), Some(&Value::Bool(false)));
    }

    #[test]
    fn attribute_is_reread_and_non_bool_stops() {
        let spec = spec(LoopCondition::Attribute("again".into()));
        let mut ctx = Context::new();
        let root = Path::new("/app");
        ctx.put("again", true);
        assert_eq!(evaluate(&spec, "l", root, &ctx).value_ref(), Some(&Value::Bool(true)));
        ctx.put("again", "yes");
        assert_eq!(evaluate(&spec, "l", root, &ctx).value_ref(), Some(&Value::Bool(false)));
    }

    #[test]
    fn failing_condition_is_a_warning_with_false() {
        let spec = spec(LoopCondition::Condition(Box::new(StepDef::condition(
            FailingCondition,
        ))));
        let result = evaluate(&spec, "l", Path::new("/app"), &Context::new());
        assert_eq!(result.kind(), crate::core::result::UtilityKind::Warning);
        assert_eq!(result.value_ref(), Some(&Value::Bool(false)));
        assert!(result.error_ref().is_some());
    }

    #[test]
    fn spawn_names_child_after_iteration() {
        let mut template = Template::new("t");
        let id = template
            .add(
                StepDef::looping(StepDef::utility(CountingUtility::new()), LoopCondition::Times(3))
                    .unwrap()
                    .named("L"),
            )
            .unwrap();
        let (child, next) = spawn_iteration(&mut template, id).unwrap();
        assert_eq!(template.node(child).name(), "L-1-CountingUtility");
        assert_eq!(template.children(id), [child]);
        assert_eq!(template.node(next).name(), "L");
        let Body::Loop(next_spec) = &template.node(next).def().body else {
            panic!("not a loop");
        };
        assert_eq!(next_spec.next_iteration(), 2);
        assert!(!template.node(next).has_been_performed());
    }
}
