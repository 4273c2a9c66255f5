// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mustache-style template engine (§4.7): a recursive descent over
//! maps/lists rendering only leaf strings. Pure, no I/O besides a
//! best-effort warning log; unresolved references pass through unchanged.

use serde_json::Value;
use std::collections::BTreeMap;

/// The three roots a `{{ path }}` reference may start from.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub trigger: Value,
    pub params: Value,
    pub prev: Value,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self {
            trigger: Value::Null,
            params: Value::Object(Default::default()),
            prev: Value::Object(Default::default()),
        }
    }

    fn root(&self, name: &str) -> Option<&Value> {
        match name {
            "trigger" => Some(&self.trigger),
            "params" => Some(&self.params),
            "prev" => Some(&self.prev),
            _ => None,
        }
    }
}

#[allow(clippy::expect_used)]
fn reference_pattern() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("static pattern is valid"))
}

fn resolve_path(ctx: &TemplateContext, path: &str) -> Option<Value> {
    let mut parts = path.split('.');
    let root = parts.next()?;
    let mut current = ctx.root(root)?.clone();
    for part in parts {
        current = match current {
            Value::Object(mut map) => map.remove(part)?,
            Value::Array(arr) => {
                let idx: usize = part.parse().ok()?;
                arr.into_iter().nth(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render every `{{ path }}` reference in `s`. Idempotent on strings
/// without `{{` (§8 Laws); never raises.
pub fn render_str(s: &str, ctx: &TemplateContext) -> String {
    if !s.contains("{{") {
        return s.to_string();
    }
    reference_pattern()
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let path = caps[1].trim();
            match resolve_path(ctx, path) {
                Some(v) => value_to_string(&v),
                None => {
                    tracing::warn!(path, "template reference could not be resolved");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Recurse through a JSON value, rendering every string leaf.
pub fn render_value(value: &Value, ctx: &TemplateContext) -> Value {
    match value {
        Value::String(s) => Value::String(render_str(s, ctx)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Render every string leaf of a `BTreeMap<String, Value>` (step `params`
/// and `payload_template`, §4.6).
pub fn render_dict(map: &BTreeMap<String, Value>, ctx: &TemplateContext) -> BTreeMap<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), render_value(v, ctx))).collect()
}

/// Extract every `path` referenced by `{{ path }}` in `s`, for validation
/// tooling that wants to know what a template needs without rendering it.
pub fn extract_variables(s: &str) -> Vec<String> {
    reference_pattern()
        .captures_iter(s)
        .map(|c| c[1].trim().to_string())
        .collect()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
