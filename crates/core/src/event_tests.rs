// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn topic_requires_version_suffix() {
    assert!(Topic::parse("chat.v1").is_ok());
    assert!(Topic::parse("chat").is_err());
    assert!(Topic::parse("chat.v").is_err());
}

#[test]
fn topic_accepts_multi_segment_names() {
    assert!(Topic::parse("system.alerts.v2").is_ok());
}

#[test]
fn event_id_round_trips_through_display_and_parse() {
    let id = EventId::new(1_700_000_000_000, 7);
    let text = id.to_string();
    assert_eq!(text, "1700000000000-7");
    let parsed: EventId = text.parse().unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn event_id_ord_follows_millis_then_seq() {
    let a = EventId::new(100, 9);
    let b = EventId::new(101, 0);
    assert!(a < b);
    let c = EventId::new(100, 10);
    assert!(a < c);
}

#[test]
fn payload_at_exactly_the_limit_is_accepted() {
    // One JSON-escaped byte per char keeps this exact: build a payload
    // whose serialized form is precisely MAX_PAYLOAD_BYTES.
    let mut payload = BTreeMap::new();
    let overhead = serde_json::to_vec(&BTreeMap::<String, Value>::from([(
        "k".to_string(),
        Value::String(String::new()),
    )]))
    .unwrap()
    .len();
    let filler = "a".repeat(MAX_PAYLOAD_BYTES - overhead);
    payload.insert("k".to_string(), Value::String(filler));
    assert_eq!(
        serde_json::to_vec(&payload).unwrap().len(),
        MAX_PAYLOAD_BYTES
    );
    assert!(Event::validate_payload(&payload).is_ok());
}

#[test]
fn payload_one_byte_over_the_limit_is_rejected() {
    let mut payload = BTreeMap::new();
    payload.insert("k".to_string(), Value::String("a".repeat(MAX_PAYLOAD_BYTES)));
    assert!(Event::validate_payload(&payload).is_err());
}

#[test]
fn incrementing_retries_never_mutates_in_place() {
    let event = Event {
        event_id: EventId::new(1, 0),
        schema_version: SCHEMA_VERSION,
        topic: Topic::parse("chat.v1").unwrap(),
        event_type: "message".to_string(),
        timestamp: Utc::now(),
        payload: BTreeMap::new(),
        meta: EventMeta::default(),
    };
    let next = event.with_incremented_retries();
    assert_eq!(event.meta.retries, 0);
    assert_eq!(next.meta.retries, 1);
    assert_eq!(next.event_id, event.event_id);
    assert_eq!(next.topic, event.topic);
}

#[test]
fn priority_weights_match_spec_defaults() {
    assert_eq!(EventPriority::High.default_weight(), 3);
    assert_eq!(EventPriority::Medium.default_weight(), 2);
    assert_eq!(EventPriority::Low.default_weight(), 1);
}
