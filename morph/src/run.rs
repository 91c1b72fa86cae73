//! Orchestrator: walks a template and performs its steps in order.

use std::ops::ControlFlow;
use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::core::context::Context;
use crate::core::path::relative_to;
use crate::core::result::{ManualInstructionRecord, PerformResult};
use crate::core::stats::RunStatistics;
use crate::core::template::{StepId, Template};
use crate::core::value::Value;
use crate::looping;
use crate::perform::{FollowUp, perform_step};

/// Why and where a run was stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortDetails {
    pub step: String,
    pub message: String,
    /// Rendered fault of the triggering result, if it carried one.
    pub error: Option<String>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Perform results in execution order, run-time clones included.
    pub results: Vec<PerformResult>,
    pub context: Context,
    pub abort: Option<AbortDetails>,
    /// Instructions left to the user, resources relative to the root folder.
    pub manual_instructions: Vec<ManualInstructionRecord>,
}

impl RunOutcome {
    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    pub fn statistics(&self) -> RunStatistics {
        RunStatistics::from_results(&self.results)
    }

    /// Last result recorded for `step`.
    pub fn result(&self, step: &str) -> Option<&PerformResult> {
        self.results.iter().rev().find(|result| result.step() == step)
    }
}

/// Runs templates against a root folder, optionally with a pre-seeded context.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    initial: Context,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an attribute visible to every step of the run.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial.put(key, value);
        self
    }

    /// Perform every step of `template` in definition order.
    ///
    /// Steps already performed by an earlier run are reported as errors rather
    /// than executed again.
    pub fn run(&self, template: &mut Template, root: &Path) -> RunOutcome {
        info!(template = %template.template_name(), root = %root.display(), "run started");
        let mut run = Run {
            template,
            root,
            ctx: self.initial.clone(),
            results: Vec::new(),
            instructions: Vec::new(),
        };
        let top = run.template.top_level().to_vec();
        let abort = match run.steps(&top) {
            ControlFlow::Continue(()) => None,
            ControlFlow::Break(details) => Some(details),
        };
        let outcome = RunOutcome {
            results: run.results,
            context: run.ctx,
            abort,
            manual_instructions: run.instructions,
        };
        let stats = outcome.statistics();
        info!(
            performed = stats.performed,
            errors = stats.errors(),
            aborted = outcome.is_aborted(),
            instructions = outcome.manual_instructions.len(),
            "run finished"
        );
        outcome
    }
}

/// Run `template` with an empty context.
pub fn run(template: &mut Template, root: &Path) -> RunOutcome {
    Engine::new().run(template, root)
}

struct Run<'a> {
    template: &'a mut Template,
    root: &'a Path,
    ctx: Context,
    results: Vec<PerformResult>,
    instructions: Vec<ManualInstructionRecord>,
}

impl Run<'_> {
    fn steps(&mut self, ids: &[StepId]) -> ControlFlow<AbortDetails> {
        for &id in ids {
            self.step(id)?;
        }
        ControlFlow::Continue(())
    }

    fn step(&mut self, id: StepId) -> ControlFlow<AbortDetails> {
        let mut current = id;
        loop {
            let performed = perform_step(self.template, current, self.root, &mut self.ctx);
            let abort = self.abort_details(current, &performed.result);
            if let Some(instruction) = performed.result.instruction() {
                self.instructions.push(ManualInstructionRecord {
                    description: instruction.description.clone(),
                    resource: relative_to(self.root, &instruction.resource),
                });
            }
            self.results.push(performed.result);
            if let Some(details) = abort {
                return ControlFlow::Break(details);
            }

            match performed.follow_up {
                FollowUp::None => return ControlFlow::Continue(()),
                FollowUp::Children => {
                    let children = self.template.children(current).to_vec();
                    return self.steps(&children);
                }
                FollowUp::Iterate => {
                    let Some((child, next)) = looping::spawn_iteration(self.template, current) else {
                        return ControlFlow::Continue(());
                    };
                    self.step(child)?;
                    current = next;
                }
            }
        }
    }

    fn abort_details(&self, id: StepId, result: &PerformResult) -> Option<AbortDetails> {
        let settings = &self.template.node(id).def().settings;
        if !settings.abort_on_failure || !result.is_error() {
            return None;
        }
        let message = settings
            .abort_message
            .clone()
            .unwrap_or_else(|| format!("{} failed and aborted the transformation", result.step()));
        let details = AbortDetails {
            step: result.step().to_string(),
            message,
            error: result.error().map(ToString::to_string),
        };
        error!(step = %details.step, message = %details.message, "run aborted");
        Some(details)
    }
}
