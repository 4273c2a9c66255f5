// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn append_then_read_group_returns_new_entries_in_order() {
    let sub = FakeSubstrate::new();
    sub.ensure_group("chat.v1", "workers").await.unwrap();
    sub.tick(1);
    sub.append("chat.v1", r#"{"n":1}"#, None).await.unwrap();
    sub.tick(2);
    sub.append("chat.v1", r#"{"n":2}"#, None).await.unwrap();

    let entries = sub.read_group("chat.v1", "workers", "c1", 10, 0).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].event_json, r#"{"n":1}"#);
    assert_eq!(entries[1].event_json, r#"{"n":2}"#);
}

#[tokio::test]
async fn read_group_does_not_redeliver_already_claimed_entries() {
    let sub = FakeSubstrate::new();
    sub.ensure_group("chat.v1", "workers").await.unwrap();
    sub.append("chat.v1", "a", None).await.unwrap();

    let first = sub.read_group("chat.v1", "workers", "c1", 10, 0).await.unwrap();
    assert_eq!(first.len(), 1);
    let second = sub.read_group("chat.v1", "workers", "c1", 10, 0).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn unacked_entries_remain_pending_until_acked() {
    let sub = FakeSubstrate::new();
    sub.ensure_group("chat.v1", "workers").await.unwrap();
    sub.append("chat.v1", "a", None).await.unwrap();
    let entries = sub.read_group("chat.v1", "workers", "c1", 10, 0).await.unwrap();
    let id = entries[0].id;

    let pending = sub.read_pending("chat.v1", "workers", "c1", 10).await.unwrap();
    assert_eq!(pending.len(), 1);

    sub.ack("chat.v1", "workers", id).await.unwrap();
    let pending_after = sub.read_pending("chat.v1", "workers", "c1", 10).await.unwrap();
    assert!(pending_after.is_empty());
}

#[tokio::test]
async fn delivery_count_increments_on_redelivery() {
    let sub = FakeSubstrate::new();
    sub.ensure_group("chat.v1", "workers").await.unwrap();
    sub.append("chat.v1", "a", None).await.unwrap();
    let entries = sub.read_group("chat.v1", "workers", "c1", 10, 0).await.unwrap();
    let id = entries[0].id;
    assert_eq!(sub.delivery_count("chat.v1", "workers", id).await.unwrap(), 1);
}

#[tokio::test]
async fn append_respects_maxlen_by_dropping_oldest() {
    let sub = FakeSubstrate::new();
    sub.tick(1);
    sub.append("chat.v1", "a", Some(2)).await.unwrap();
    sub.tick(2);
    sub.append("chat.v1", "b", Some(2)).await.unwrap();
    sub.tick(3);
    sub.append("chat.v1", "c", Some(2)).await.unwrap();

    let all = sub.range("chat.v1", None, None, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].event_json, "b");
    assert_eq!(all[1].event_json, "c");
}

#[tokio::test]
async fn range_respects_inclusive_bounds_and_limit() {
    let sub = FakeSubstrate::new();
    for ms in 1..=5u64 {
        sub.tick(ms);
        sub.append("chat.v1", &ms.to_string(), None).await.unwrap();
    }
    let all = sub.range("chat.v1", None, None, None).await.unwrap();
    let from = all[1].id;
    let to = all[3].id;
    let bounded = sub.range("chat.v1", Some(from), Some(to), None).await.unwrap();
    assert_eq!(bounded.len(), 3);

    let limited = sub.range("chat.v1", None, None, Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
}
