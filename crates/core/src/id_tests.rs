// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("test");
}

#[test]
fn new_ids_carry_the_declared_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("test"));
    assert_eq!(id.as_str().len(), 23);
}

#[test]
fn new_ids_are_unique() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn from_string_round_trips_through_display() {
    let id = TestId::new();
    let text = id.to_string();
    let parsed = TestId::from_string(&text);
    assert_eq!(parsed, id);
}

#[test]
fn suffix_strips_the_prefix() {
    let id = TestId::from_string("testabcdefghijklmnop12");
    assert_eq!(id.suffix(), "abcdefghijklmnop12");
}

#[test]
fn short_truncates_the_suffix() {
    let id = TestId::from_string("testabcdefghijklmnop12");
    assert_eq!(id.short(4), "abcd");
}

#[test]
fn short_returns_full_suffix_when_shorter_than_n() {
    let id = TestId::from_string("testab");
    assert_eq!(id.short(20), "ab");
}

#[test]
fn ids_are_usable_as_hash_map_keys_by_borrowed_str() {
    let id = TestId::new();
    let key = id.as_str().to_string();
    let mut map = HashMap::new();
    map.insert(id, 42);
    assert_eq!(map.get(key.as_str()), Some(&42));
}

#[test]
fn default_generates_a_fresh_id() {
    let a = TestId::default();
    let b = TestId::default();
    assert_ne!(a, b);
}

#[test]
fn short_fn_on_str_truncates() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn id_buf_deserialize_rejects_oversized_input() {
    let too_long = "x".repeat(ID_MAX_LEN + 1);
    let json = serde_json::to_string(&too_long).unwrap();
    let result: Result<IdBuf, _> = serde_json::from_str(&json);
    assert!(result.is_err());
}
