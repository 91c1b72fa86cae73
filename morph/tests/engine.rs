//! End-to-end runs of templates against temporary folders.

use std::path::PathBuf;

use morph::core::result::{PerformKind, UtilityKind};
use morph::core::value::Value;
use morph::steps::ManualInstruction;
use morph::test_support::{
    AlwaysEqual, CountingUtility, FailingCondition, FailingUtility, FileNamed, TouchOperation,
    temp_tree,
};
use morph::{Engine, LoopCondition, MultiMode, StepDef, Template};

fn bool_value(outcome: &morph::RunOutcome, step: &str) -> Option<bool> {
    outcome.result(step)?.value()?.as_bool()
}

fn error_message(outcome: &morph::RunOutcome, step: &str) -> String {
    outcome
        .result(step)
        .and_then(|result| result.error())
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[test]
fn running_a_template_twice_reports_errors_and_changes_nothing() {
    let tree = temp_tree(&[]);
    let touch = TouchOperation::new();
    let mut template = Template::new("t");
    template
        .add(StepDef::operation(touch.clone()).named("touch").relative("out.txt"))
        .expect("add");

    let first = morph::run::run(&mut template, tree.path());
    assert_eq!(first.statistics().errors(), 0);
    std::fs::remove_file(tree.path().join("out.txt")).expect("remove");

    let second = morph::run::run(&mut template, tree.path());
    let result = second.result("touch").expect("result");
    assert!(matches!(result.kind(), PerformKind::Error(_)));
    assert!(result.error().expect("error").to_string().contains("already been performed"));
    assert!(!tree.path().join("out.txt").exists());
    assert_eq!(touch.touched().len(), 1);
}

#[test]
fn dependency_on_a_later_step_skips_without_executing() {
    let tree = temp_tree(&[]);
    let counter = CountingUtility::new();
    let mut template = Template::new("t");
    template
        .add(StepDef::utility(counter.clone()).named("b").depends_on(["a"]))
        .expect("add b");
    template
        .add(StepDef::utility(CountingUtility::new()).named("a"))
        .expect("add a");

    let outcome = morph::run::run(&mut template, tree.path());
    let b = outcome.result("b").expect("b");
    assert_eq!(b.label(), "SKIPPED_DEPENDENCY");
    assert_eq!(
        b.details(),
        Some("b was skipped because its dependency a has not been executed yet")
    );
    assert_eq!(counter.count(), 0);
}

#[test]
fn double_condition_truth_table() {
    let tree = temp_tree(&[("a.txt", "x"), ("b.txt", "y")]);
    let root = tree.path();
    let cases = [
        ("missing-a.txt", "missing-b.txt", false, true),
        ("a.txt", "missing-b.txt", true, false),
        ("missing-a.txt", "b.txt", true, false),
        ("a.txt", "b.txt", true, true),
        ("a.txt", "b.txt", false, false),
    ];
    for (baseline, other, equal, expected) in cases {
        let mut template = Template::new("t");
        template
            .add(
                StepDef::double_condition(AlwaysEqual::new(equal), "other")
                    .named("cmp")
                    .relative(baseline),
            )
            .expect("add");
        let outcome = Engine::new()
            .with_attribute("other", root.join(other))
            .run(&mut template, root);
        assert_eq!(
            bool_value(&outcome, "cmp"),
            Some(expected),
            "{baseline} vs {other} (equal={equal})"
        );
    }
}

#[test]
fn multiple_conditions_aggregate_per_mode() {
    let tree = temp_tree(&[("a.txt", ""), ("b.txt", "")]);
    let root = tree.path();
    let files: Vec<PathBuf> = vec![root.join("a.txt"), root.join("b.txt")];

    for (mode, expected) in [(MultiMode::AtLeastOne, true), (MultiMode::All, false)] {
        let mut template = Template::new("t");
        template
            .add(
                StepDef::multiple_conditions(StepDef::condition(FileNamed::new("b.txt")))
                    .expect("container")
                    .named("any")
                    .files(["found"])
                    .mode(mode),
            )
            .expect("add");
        let outcome = Engine::new()
            .with_attribute("found", files.clone())
            .run(&mut template, root);
        assert_eq!(bool_value(&outcome, "any"), Some(expected), "{mode:?}");
        assert_eq!(outcome.results.len(), 1);
    }
}

#[test]
fn fixed_count_loop_executes_exactly_that_many_times() {
    let tree = temp_tree(&[]);
    let counter = CountingUtility::new();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::looping(StepDef::utility(counter.clone()), LoopCondition::Times(4))
                .expect("loop")
                .named("repeat"),
        )
        .expect("add");

    let outcome = morph::run::run(&mut template, tree.path());
    assert_eq!(counter.count(), 4);
    assert_eq!(outcome.statistics().errors(), 0);
    assert_eq!(bool_value(&outcome, "repeat"), Some(false));
    assert!(outcome.result("repeat-4-CountingUtility").is_some());
}

#[test]
fn loop_over_a_group_runs_every_child_each_iteration() {
    let tree = temp_tree(&[]);
    let first = CountingUtility::new();
    let second = CountingUtility::new();
    let body = StepDef::group()
        .with_child(StepDef::utility(first.clone()))
        .and_then(|group| group.with_child(StepDef::utility(second.clone()).named("second")))
        .expect("group");
    let mut template = Template::new("t");
    template
        .add(
            StepDef::looping(body, LoopCondition::Times(3))
                .expect("loop")
                .named("L"),
        )
        .expect("add");

    let outcome = morph::run::run(&mut template, tree.path());
    assert_eq!(first.count(), 3);
    assert_eq!(second.count(), 3);
    assert_eq!(outcome.statistics().errors(), 0);
    for iteration in ["L-1-Group", "L-2-Group", "L-3-Group"] {
        let group = template.find(iteration).expect("iteration");
        assert_eq!(template.children(group).len(), 2, "{iteration}");
    }
    assert!(outcome.result("L-3-Group-1-CountingUtility").is_some());
}

#[test]
fn attribute_loop_stops_when_flag_turns_false() {
    let tree = temp_tree(&[]);
    let counter = CountingUtility::new();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::looping(
                StepDef::utility(counter.clone()),
                LoopCondition::Attribute("again".to_string()),
            )
            .expect("loop"),
        )
        .expect("add");

    let outcome = Engine::new()
        .with_attribute("again", false)
        .run(&mut template, tree.path());
    assert_eq!(counter.count(), 0);
    assert_eq!(outcome.results.len(), 1);
}

#[test]
fn fan_out_over_overlapping_collections_touches_each_file_once() {
    let tree = temp_tree(&[("f1", ""), ("f2", ""), ("f3", "")]);
    let root = tree.path();
    let touch = TouchOperation::new();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::multiple_operations(StepDef::operation(touch.clone()))
                .expect("container")
                .named("touch-all")
                .files(["first", "second"]),
        )
        .expect("add");

    let outcome = Engine::new()
        .with_attribute("first", vec![root.join("f1"), root.join("f2")])
        .with_attribute("second", vec![root.join("f2"), root.join("f3")])
        .run(&mut template, root);

    let touched: Vec<PathBuf> = touch.touched().into_iter().map(|(file, _)| file).collect();
    assert_eq!(touched, vec![root.join("f1"), root.join("f2"), root.join("f3")]);
    let container = template.find("touch-all").expect("container");
    assert_eq!(template.children(container).len(), 3);
    assert_eq!(outcome.statistics().operation_success, 3);
}

#[test]
fn property_axis_configures_one_clone_per_value() {
    let tree = temp_tree(&[("f1", "")]);
    let root = tree.path();
    let touch = TouchOperation::new();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::multiple_operations(StepDef::operation(touch.clone()))
                .expect("container")
                .files(["found"])
                .property_values("content", "contents")
                .expect("axis"),
        )
        .expect("add");

    Engine::new()
        .with_attribute("found", vec![root.join("f1")])
        .with_attribute(
            "contents",
            Value::set([Value::from("one"), Value::from("two")]),
        )
        .run(&mut template, root);

    let contents: Vec<String> = touch.touched().into_iter().map(|(_, content)| content).collect();
    assert_eq!(contents, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn property_axis_without_files_configures_the_container_file() {
    let tree = temp_tree(&[("pom.xml", "old")]);
    let root = tree.path();
    let touch = TouchOperation::new();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::multiple_operations(StepDef::operation(touch.clone()))
                .expect("container")
                .named("m")
                .relative("pom.xml")
                .property_values("content", "contents")
                .expect("axis"),
        )
        .expect("add");

    let outcome = Engine::new()
        .with_attribute("contents", Value::set([Value::from("a"), Value::from("b")]))
        .run(&mut template, root);

    assert_eq!(
        touch.touched(),
        vec![
            (root.join("pom.xml"), "a".to_string()),
            (root.join("pom.xml"), "b".to_string()),
        ]
    );
    assert_eq!(outcome.result("m-TouchOperation-template-1").expect("first").label(), "SUCCESS");
    assert_eq!(outcome.result("m-TouchOperation-template-2").expect("second").label(), "SUCCESS");
    assert_eq!(std::fs::read_to_string(root.join("pom.xml")).expect("read"), "b");
}

#[test]
fn fan_out_without_files_or_path_performs_nothing() {
    let tree = temp_tree(&[]);
    let touch = TouchOperation::new();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::multiple_operations(StepDef::operation(touch.clone()))
                .expect("container")
                .named("m")
                .files(["missing"]),
        )
        .expect("add");

    let outcome = morph::run::run(&mut template, tree.path());
    let result = outcome.result("m").expect("m");
    assert_eq!(result.label(), "VALUE");
    assert_eq!(result.value(), Some(&Value::List(Vec::new())));
    assert_eq!(
        result.details(),
        Some("Multiple operation m resulted in 0 operations based on TouchOperation")
    );
    assert!(touch.touched().is_empty());
    assert!(template.children(template.find("m").expect("m")).is_empty());
}

#[test]
fn property_axis_requires_a_non_empty_set() {
    let tree = temp_tree(&[("f1", "")]);
    let root = tree.path();
    let cases = [
        (Value::set(Vec::new()), "contains an empty set of values"),
        (Value::from("one"), "does not contain a set of values"),
    ];
    for (contents, expected) in cases {
        let touch = TouchOperation::new();
        let mut template = Template::new("t");
        template
            .add(
                StepDef::multiple_operations(StepDef::operation(touch.clone()))
                    .expect("container")
                    .named("m")
                    .files(["found"])
                    .property_values("content", "contents")
                    .expect("axis"),
            )
            .expect("add");

        let outcome = Engine::new()
            .with_attribute("found", vec![root.join("f1")])
            .with_attribute("contents", contents)
            .run(&mut template, root);
        assert_eq!(outcome.result("m").expect("m").label(), "ERROR");
        assert!(error_message(&outcome, "m").contains(expected), "{expected}");
        assert!(touch.touched().is_empty());
    }
}

#[test]
fn multiple_conditions_fail_on_the_first_failing_file() {
    let tree = temp_tree(&[("a.txt", ""), ("b.txt", "")]);
    let root = tree.path();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::multiple_conditions(StepDef::condition(FailingCondition))
                .expect("container")
                .named("mc")
                .files(["found"]),
        )
        .expect("add");

    let outcome = Engine::new()
        .with_attribute("found", vec![root.join("a.txt"), root.join("b.txt")])
        .run(&mut template, root);
    assert_eq!(outcome.result("mc").expect("mc").label(), "ERROR");
    let message = error_message(&outcome, "mc");
    assert!(
        message.starts_with("condition mc-FailingCondition-template-1 failed while evaluating"),
        "{message}"
    );
    assert!(message.contains("a.txt"), "{message}");
    assert!(!message.contains("template-2"), "{message}");
}

#[test]
fn multiple_conditions_without_files_fail() {
    let tree = temp_tree(&[]);
    let mut template = Template::new("t");
    template
        .add(
            StepDef::multiple_conditions(StepDef::condition(FileNamed::new("a.txt")))
                .expect("container")
                .named("mc")
                .files(["none"]),
        )
        .expect("add");

    let outcome = morph::run::run(&mut template, tree.path());
    assert_eq!(
        error_message(&outcome, "mc"),
        "multiple condition mc has no files to evaluate"
    );
}

#[test]
fn filter_files_keeps_matching_files() {
    let tree = temp_tree(&[("a.txt", ""), ("b.txt", "")]);
    let root = tree.path();
    let files = vec![root.join("a.txt"), root.join("b.txt")];

    let mut template = Template::new("t");
    template
        .add(
            StepDef::filter_files(StepDef::condition(FileNamed::new("b.txt")))
                .expect("filter")
                .named("only-b")
                .files(["found"]),
        )
        .expect("add");
    template
        .add(
            StepDef::filter_files(StepDef::condition(FileNamed::new("c.txt")))
                .expect("filter")
                .named("none")
                .files(["found"]),
        )
        .expect("add");

    let outcome = Engine::new()
        .with_attribute("found", files)
        .run(&mut template, root);

    let kept = outcome.result("only-b").expect("only-b");
    assert_eq!(kept.value(), Some(&Value::Files(vec![root.join("b.txt")])));
    assert_eq!(
        kept.details(),
        Some("FilterFiles only-b resulted in 1 files based on FileNamed")
    );
    assert_eq!(outcome.context.get("only-b"), kept.value());

    let none = outcome.result("none").expect("none");
    assert_eq!(none.label(), "NULL");
    assert_eq!(
        none.details(),
        Some("FilterFiles none resulted in 0 files based on FileNamed")
    );
}

#[test]
fn filter_files_fails_when_a_condition_fails() {
    let tree = temp_tree(&[("a.txt", "")]);
    let root = tree.path();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::filter_files(StepDef::condition(FailingCondition))
                .expect("filter")
                .named("f")
                .files(["found"]),
        )
        .expect("add");

    let outcome = Engine::new()
        .with_attribute("found", vec![root.join("a.txt")])
        .run(&mut template, root);
    assert!(error_message(&outcome, "f").contains("failed while evaluating"));
}

#[test]
fn manual_instructions_are_collected_in_run_order() {
    let tree = temp_tree(&[("docs/one.md", "1"), ("docs/two.md", "2")]);
    let mut template = Template::new("t");
    template
        .add(ManualInstruction::step("First for {{ app }}", "docs/one.md").named("one"))
        .expect("one");
    template
        .add(
            ManualInstruction::step("Skipped", "docs/two.md")
                .named("skipped")
                .execute_if("never"),
        )
        .expect("skipped");
    template
        .add(ManualInstruction::step("Second", "docs/two.md").named("two"))
        .expect("two");

    let outcome = Engine::new()
        .with_attribute("app", "shop")
        .with_attribute("never", false)
        .run(&mut template, tree.path());

    let recorded: Vec<(&str, PathBuf)> = outcome
        .manual_instructions
        .iter()
        .map(|record| (record.description.as_str(), record.resource.clone()))
        .collect();
    assert_eq!(
        recorded,
        vec![
            ("First for shop", PathBuf::from("docs").join("one.md")),
            ("Second", PathBuf::from("docs").join("two.md")),
        ]
    );
    assert!(outcome.context.get("one").is_none());
}

#[test]
fn missing_property_attribute_names_property_and_attribute() {
    let tree = temp_tree(&[]);
    let mut template = Template::new("t");
    template
        .add(
            StepDef::operation(TouchOperation::new())
                .named("touch")
                .relative("out.txt")
                .set_from_context("content", "ATT")
                .expect("binding"),
        )
        .expect("add");

    let outcome = morph::run::run(&mut template, tree.path());
    let message = outcome
        .result("touch")
        .and_then(|result| result.error())
        .expect("error")
        .to_string();
    assert!(message.contains("'content'"));
    assert!(message.contains("'ATT'"));
    assert!(!tree.path().join("out.txt").exists());
}

#[test]
fn duplicate_sibling_names_are_rejected() {
    let mut template = Template::new("t");
    let group = template.add(StepDef::group().named("g")).expect("group");
    template
        .add_to(group, StepDef::utility(CountingUtility::new()).named("same"))
        .expect("first");
    let err = template
        .add_to(group, StepDef::utility(CountingUtility::new()).named("same"))
        .unwrap_err();
    assert!(err.to_string().contains("already registered"));
    // Same name under a different parent is fine.
    template
        .add(StepDef::utility(CountingUtility::new()).named("same"))
        .expect("top level");
}

#[test]
fn abort_on_failure_stops_the_run() {
    let tree = temp_tree(&[]);
    let after = CountingUtility::new();
    let mut template = Template::new("t");
    template
        .add(
            StepDef::utility(FailingUtility::new("boom"))
                .named("fails")
                .abort_with("cannot continue"),
        )
        .expect("add");
    template
        .add(StepDef::utility(after.clone()).named("after"))
        .expect("add");

    let outcome = morph::run::run(&mut template, tree.path());
    let abort = outcome.abort.as_ref().expect("aborted");
    assert_eq!(abort.step, "fails");
    assert_eq!(abort.message, "cannot continue");
    assert!(abort.error.as_deref().is_some_and(|err| err.contains("boom")));
    assert_eq!(after.count(), 0);
    assert!(outcome.result("after").is_none());
}

#[test]
fn failure_without_abort_lets_the_run_continue() {
    let tree = temp_tree(&[]);
    let after = CountingUtility::new();
    let mut template = Template::new("t");
    template
        .add(StepDef::utility(FailingUtility::new("boom")).named("fails"))
        .expect("add");
    template
        .add(StepDef::utility(after.clone()).named("after"))
        .expect("add");

    let outcome = morph::run::run(&mut template, tree.path());
    assert!(!outcome.is_aborted());
    assert_eq!(after.count(), 1);
    assert_eq!(outcome.statistics().errors(), 1);
}

#[test]
fn skipped_group_skips_its_children() {
    let tree = temp_tree(&[]);
    let inner = CountingUtility::new();
    let mut template = Template::new("t");
    let group = template
        .add(StepDef::group().named("g").execute_if("enabled"))
        .expect("group");
    template
        .add_to(group, StepDef::utility(inner.clone()))
        .expect("child");

    let skipped = Engine::new()
        .with_attribute("enabled", false)
        .run(&mut template.clone(), tree.path());
    assert_eq!(inner.count(), 0);
    assert_eq!(skipped.results.len(), 1);
    assert_eq!(skipped.result("g").expect("g").label(), "SKIPPED_CONDITION");

    let ran = Engine::new()
        .with_attribute("enabled", true)
        .run(&mut template, tree.path());
    assert_eq!(inner.count(), 1);
    assert!(ran.result("g-1-CountingUtility").is_some());
}

#[test]
fn values_flow_between_steps_through_the_context() {
    let tree = temp_tree(&[("src/a.txt", "x")]);
    let mut template = Template::new("t");
    template
        .add(
            StepDef::utility(morph::steps::FindFiles::new(r"\.txt$").expect("pattern").recursive(true))
                .named("find")
                .context_attribute("txt"),
        )
        .expect("find");
    template
        .add(
            StepDef::multiple_conditions(StepDef::condition(morph::steps::FileExists))
                .expect("container")
                .named("all-exist")
                .files(["txt"])
                .mode(MultiMode::All)
                .depends_on(["find"]),
        )
        .expect("condition");

    let outcome = morph::run::run(&mut template, tree.path());
    let found = outcome.context.get("txt").expect("saved");
    assert!(matches!(found, Value::Files(files) if files.len() == 1));
    assert_eq!(bool_value(&outcome, "all-exist"), Some(true));
    let find = outcome.result("find").expect("find");
    assert!(matches!(
        find.execution().and_then(|e| match e {
            morph::core::result::ExecutionResult::Utility(r) => Some(r.kind()),
            morph::core::result::ExecutionResult::Operation(_) => None,
        }),
        Some(UtilityKind::Value)
    ));
}
