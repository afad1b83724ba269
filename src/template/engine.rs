//! Placeholder rendering for plugin manifest templates
//!
//! Uses minijinja with its default `{{ ... }}` delimiters and strict undefined
//! handling, so every placeholder must be backed by a supplied parameter.

use std::fmt::Write as _;

use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, ErrorKind, Output, State, UndefinedBehavior};
use serde_json::Map;

use crate::Error;

/// Parameter values available to a template
pub type Parameters = Map<String, serde_json::Value>;

/// Template engine for plugin manifests
///
/// Values render in their textual form: strings verbatim, numbers and booleans
/// in their JSON spelling, `null` as empty text, mappings and sequences inline.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine {
    /// Create a new template engine with strict undefined handling
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_formatter(format_value);
        Self { env }
    }

    /// Render a template with the given parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateResolution`] if the template syntax is invalid,
    /// a referenced placeholder has no value, or two parameter keys name the
    /// same placeholder (`a-b` and `a_b`).
    pub fn render(&self, template: &str, params: &Parameters) -> Result<String, Error> {
        // MiniJinja reads `notify-url` as `notify` minus `url`
        let normalized = normalize_template_identifiers(template);
        let mut ctx = Parameters::new();
        for (key, value) in params {
            let name = normalize_key(key);
            if let Some(other) = params.keys().find(|k| *k != key && normalize_key(k) == name) {
                return Err(Error::template_resolution(format!(
                    "parameters {other:?} and {key:?} both fill placeholder {name:?}"
                )));
            }
            ctx.insert(name, value.clone());
        }

        self.env
            .render_str(&normalized, Value::from_serialize(&ctx))
            .map_err(|e| Error::template_resolution(describe(&e)))
    }
}

/// Write values in their JSON spelling. `none` writes nothing, mappings and
/// sequences are written as inline JSON.
fn format_value(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> Result<(), minijinja::Error> {
    let text = match value.kind() {
        ValueKind::None => return Ok(()),
        ValueKind::Bool => value.is_true().to_string(),
        ValueKind::Seq | ValueKind::Map => serde_json::to_string(value)
            .map_err(|e| minijinja::Error::new(ErrorKind::BadSerialization, e.to_string()))?,
        _ => return minijinja::escape_formatter(out, state, value),
    };
    out.write_str(&text)
        .map_err(|_| minijinja::Error::new(ErrorKind::WriteFailure, "could not write rendered value"))
}

fn describe(err: &minijinja::Error) -> String {
    match err.line() {
        Some(line) => format!("{err} (line {line})"),
        None => err.to_string(),
    }
}

fn normalize_key(key: &str) -> String {
    normalize_expression_hyphens(key)
}

/// Normalize hyphens in identifier positions within `{{ ... }}` expressions.
///
/// Converts `{{ notify-url }}` to `{{ notify_url }}`. Quoted strings are kept,
/// so `{{ x | default("a-b") }}` still renders `a-b`.
fn normalize_template_identifiers(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        result.push_str(&remaining[..start + 2]);
        remaining = &remaining[start + 2..];

        if let Some(end) = remaining.find("}}") {
            result.push_str(&normalize_expression_hyphens(&remaining[..end]));
            result.push_str("}}");
            remaining = &remaining[end + 2..];
        } else {
            result.push_str(remaining);
            remaining = "";
        }
    }

    result.push_str(remaining);
    result
}

/// Replace hyphens between identifier characters with underscores, skipping
/// quoted strings.
fn normalize_expression_hyphens(expr: &str) -> String {
    let mut result = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                result.push(ch);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                result.push(ch);
            }
            '-' if !in_single_quote && !in_double_quote => {
                let prev_is_ident = result
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
                let next_is_ident = chars
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || *c == '_');
                result.push(if prev_is_ident && next_is_ident { '_' } else { '-' });
            }
            _ => result.push(ch),
        }
    }

    result
}
