// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sample_context() -> TemplateContext {
    TemplateContext {
        trigger: json!({"payload": {"room": "general"}}),
        params: json!({"msg": "hi", "count": 3}),
        prev: json!({"result": {"status": "ok"}}),
    }
}

#[test]
fn renders_simple_param_reference() {
    let ctx = sample_context();
    assert_eq!(render_str("hello {{ params.msg }}", &ctx), "hello hi");
}

#[test]
fn renders_nested_path_through_trigger_and_prev() {
    let ctx = sample_context();
    assert_eq!(render_str("{{trigger.payload.room}}", &ctx), "general");
    assert_eq!(render_str("{{prev.result.status}}", &ctx), "ok");
}

#[test]
fn unresolved_reference_passes_through_unchanged() {
    let ctx = sample_context();
    assert_eq!(render_str("{{ params.missing }}", &ctx), "{{ params.missing }}");
    assert_eq!(render_str("{{ unknown_root.x }}", &ctx), "{{ unknown_root.x }}");
}

#[test]
fn idempotent_on_strings_without_markers() {
    let ctx = sample_context();
    let plain = "just a plain string";
    assert_eq!(render_str(plain, &ctx), plain);
}

#[test]
fn render_dict_recurses_through_nested_maps_and_lists() {
    let ctx = sample_context();
    let mut input = BTreeMap::new();
    input.insert(
        "greeting".to_string(),
        json!({"text": "hi {{params.msg}}", "tags": ["a", "{{params.count}}"]}),
    );
    let rendered = render_dict(&input, &ctx);
    assert_eq!(rendered["greeting"]["text"], json!("hi hi"));
    assert_eq!(rendered["greeting"]["tags"][1], json!("3"));
}

#[test]
fn extract_variables_finds_every_reference() {
    let vars = extract_variables("{{a.b}} and {{ c }}");
    assert_eq!(vars, vec!["a.b".to_string(), "c".to_string()]);
}
