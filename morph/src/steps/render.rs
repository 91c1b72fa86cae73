//! Text rendering against context attributes.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::{Context as _, Result};
use minijinja::value::ValueKind;
use minijinja::{Environment, Error, ErrorKind, Output, State};

use crate::core::context::Context;
use crate::core::value::Value;

/// Render `source` as a minijinja template, exposing every context attribute
/// as a top-level variable.
pub fn render(source: &str, ctx: &Context) -> Result<String> {
    let vars: BTreeMap<&str, minijinja::Value> = ctx
        .attributes()
        .iter()
        .map(|(key, value)| (key.as_str(), to_template_value(value)))
        .collect();
    let mut env = Environment::new();
    env.set_formatter(format_value);
    env.render_str(source, vars)
        .with_context(|| format!("render template {source:?}"))
}

/// Booleans print as `true`/`false`, matching attribute literals.
fn format_value(out: &mut Output, state: &State, value: &minijinja::Value) -> Result<(), Error> {
    if value.kind() == ValueKind::Bool {
        let text = if value.is_true() { "true" } else { "false" };
        return out
            .write_str(text)
            .map_err(|_| Error::new(ErrorKind::WriteFailure, "cannot write boolean"));
    }
    minijinja::escape_formatter(out, state, value)
}

fn to_template_value(value: &Value) -> minijinja::Value {
    match value {
        Value::Null => minijinja::Value::from(()),
        Value::Bool(b) => minijinja::Value::from(*b),
        Value::Int(i) => minijinja::Value::from(*i),
        Value::Float(x) => minijinja::Value::from(*x),
        Value::Text(s) => minijinja::Value::from(s.as_str()),
        Value::Path(p) => minijinja::Value::from(p.display().to_string()),
        Value::Files(files) => minijinja::Value::from(
            files
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
        ),
        Value::List(items) | Value::Set(items) => {
            minijinja::Value::from(items.iter().map(to_template_value).collect::<Vec<_>>())
        }
    }
}
