//! Command-line driver: validate a template file or run it against a folder.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use morph::core::result::{ManualInstructionRecord, ResultSummary};
use morph::core::stats::RunStatistics;
use morph::core::value::Value;
use morph::exit_codes;
use morph::io::config::{EngineConfig, load_config};
use morph::io::template_file::load_template;
use morph::logging;
use morph::run::{AbortDetails, Engine, RunOutcome};

#[derive(Parser)]
#[command(name = "morph", version, about = "Apply transformation templates to a folder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a template against a root folder.
    Run {
        /// Folder the template is applied to.
        #[arg(long)]
        root: PathBuf,
        /// Template file (TOML).
        #[arg(long)]
        template: PathBuf,
        /// Driver configuration (TOML). Defaults apply when missing.
        #[arg(long, default_value = "morph.toml")]
        config: PathBuf,
        /// Seed a context attribute, `KEY=VALUE`. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Build a template without running it.
    Validate {
        #[arg(long)]
        template: PathBuf,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    results: Vec<ResultSummary>,
    statistics: RunStatistics,
    abort: Option<&'a AbortDetails>,
    manual_instructions: &'a [ManualInstructionRecord],
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run {
            root,
            template,
            config,
            set,
            json,
        } => cmd_run(&root, &template, &config, &set, json),
        Command::Validate { template } => cmd_validate(&template),
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn cmd_validate(template: &Path) -> i32 {
    match load_template(template) {
        Ok(template) => {
            println!("{}: {} steps", template.template_name(), template.len());
            exit_codes::OK
        }
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    }
}

fn cmd_run(root: &Path, template: &Path, config: &Path, set: &[String], json: bool) -> i32 {
    let cfg = match load_config(config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{err:#}");
            return exit_codes::INVALID;
        }
    };
    logging::init(&cfg.log_filter);

    let prepared = prepare(root, template, set);
    let (root, engine, mut template) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{err:#}");
            return exit_codes::INVALID;
        }
    };

    let outcome = engine.run(&mut template, &root);
    if let Err(err) = print_report(&outcome, &cfg, json) {
        eprintln!("{err:#}");
        return exit_codes::FAILED;
    }
    exit_code(&outcome, &cfg)
}

/// Resolve the root folder, load the template and seed the engine.
fn prepare(root: &Path, template: &Path, set: &[String]) -> Result<(PathBuf, Engine, morph::Template)> {
    if !root.is_dir() {
        bail!("root folder {} does not exist", root.display());
    }
    // Found files are stored as absolute paths, so the root must be too.
    let root = fs::canonicalize(root).with_context(|| format!("resolve {}", root.display()))?;
    let template = load_template(template)?;
    let mut engine = Engine::new();
    for pair in set {
        let (key, value) = parse_assignment(pair)?;
        engine = engine.with_attribute(key, value);
    }
    Ok((root, engine, template))
}

fn parse_assignment(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .with_context(|| format!("expected KEY=VALUE, got {pair}"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("attribute name cannot be blank in {pair}");
    }
    Ok((key.to_string(), Value::parse_literal(raw)))
}

fn print_report(outcome: &RunOutcome, cfg: &EngineConfig, json: bool) -> Result<()> {
    let statistics = outcome.statistics();
    if json {
        let report = Report {
            results: outcome.results.iter().map(|r| r.summary()).collect(),
            statistics,
            abort: outcome.abort.as_ref(),
            manual_instructions: &outcome.manual_instructions,
        };
        let payload = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{payload}");
        return Ok(());
    }

    for result in &outcome.results {
        match (cfg.print_details, result.details()) {
            (true, Some(details)) => println!("{:<22} {} {details}", result.label(), result.step()),
            _ => println!("{:<22} {}", result.label(), result.step()),
        }
        for warning in result.warnings() {
            println!("{:<22} {} {warning}", "", "warning:");
        }
        if let Some(err) = result.error() {
            println!("{:<22} {} {err}", "", "error:");
        }
    }
    println!(
        "performed {} steps: {} errors, {} skipped",
        statistics.performed,
        statistics.errors(),
        statistics.skipped_condition + statistics.skipped_dependency
    );
    if let Some(abort) = &outcome.abort {
        println!("aborted by {}: {}", abort.step, abort.message);
    }
    if !outcome.manual_instructions.is_empty() {
        println!("manual instructions:");
        for (i, instruction) in outcome.manual_instructions.iter().enumerate() {
            println!("{}. {} ({})", i + 1, instruction.description, instruction.resource.display());
        }
    }
    Ok(())
}

fn exit_code(outcome: &RunOutcome, cfg: &EngineConfig) -> i32 {
    let statistics = outcome.statistics();
    if outcome.is_aborted() {
        exit_codes::ABORTED
    } else if statistics.errors() > 0 || (cfg.fail_on_warning && statistics.has_warnings()) {
        exit_codes::FAILED
    } else {
        exit_codes::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_parse_literals() {
        let (key, value) = parse_assignment("enabled=true").expect("parse");
        assert_eq!(key, "enabled");
        assert_eq!(value, Value::Bool(true));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }
}
