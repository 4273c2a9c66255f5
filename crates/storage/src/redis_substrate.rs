// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production `LogSubstrate`, backed by Redis Streams via a pooled
//! `ConnectionManager` (auto-reconnecting, cheaply cloneable).

use crate::substrate::{LogSubstrate, RawEntry};
use crate::StorageError;
use async_trait::async_trait;
use core_domain::EventId;
use redis::aio::ConnectionManager;
use redis::streams::{StreamPendingReply, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisError};
use std::str::FromStr;

const EVENT_FIELD: &str = "event";

#[derive(Clone)]
pub struct RedisSubstrate {
    conn: ConnectionManager,
}

impl RedisSubstrate {
    /// Connect and prepare a `ConnectionManager`, which reconnects on its
    /// own and is safe to clone across tasks.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    fn entry_id_of(id_str: &str) -> Result<EventId, StorageError> {
        EventId::from_str(id_str)
            .map_err(|_| StorageError::NotFound(id_str.to_string()))
    }
}

fn is_busygroup(err: &RedisError) -> bool {
    err.code() == Some("BUSYGROUP")
}

#[async_trait]
impl LogSubstrate for RedisSubstrate {
    async fn ensure_group(&self, topic: &str, group: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let result: Result<(), RedisError> = conn
            .xgroup_create_mkstream(topic, group, "$")
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_busygroup(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append(
        &self,
        topic: &str,
        event_json: &str,
        maxlen: Option<u64>,
    ) -> Result<EventId, StorageError> {
        let mut conn = self.conn.clone();
        let id_str: String = match maxlen {
            Some(n) => {
                conn.xadd_maxlen(
                    topic,
                    redis::streams::StreamMaxlen::Approx(n as usize),
                    "*",
                    &[(EVENT_FIELD, event_json)],
                )
                .await?
            }
            None => conn.xadd(topic, "*", &[(EVENT_FIELD, event_json)]).await?,
        };
        Self::entry_id_of(&id_str)
    }

    async fn read_group(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<RawEntry>, StorageError> {
        let mut conn = self.conn.clone();
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .count(count)
            .block(block_ms as usize);
        let reply: StreamReadReply = conn.xread_options(&[topic], &[">"], &opts).await?;
        entries_from_reply(reply)
    }

    async fn read_pending(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<RawEntry>, StorageError> {
        let mut conn = self.conn.clone();
        let pending: StreamPendingReply = conn.xpending_consumer_count(
            topic,
            group,
            "-",
            "+",
            count,
            consumer,
        ).await?;
        let ids: Vec<String> = match pending {
            StreamPendingReply::Empty => return Ok(Vec::new()),
            StreamPendingReply::Data(data) => data.ids.into_iter().map(|p| p.id).collect(),
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // `XREADGROUP` treats a non-`>` id as an exclusive lower bound into
        // the consumer's PEL, so reclaiming from `ids.first()` would skip
        // that very entry; `"0"` is the canonical full-PEL cursor.
        let opts = StreamReadOptions::default().group(group, consumer);
        let reply: StreamReadReply = conn.xread_options(&[topic], &["0"], &opts).await?;
        entries_from_reply(reply)
    }

    async fn ack(&self, topic: &str, group: &str, id: EventId) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.xack(topic, group, &[id.to_string()]).await?;
        Ok(())
    }

    async fn delivery_count(
        &self,
        topic: &str,
        group: &str,
        id: EventId,
    ) -> Result<u64, StorageError> {
        let mut conn = self.conn.clone();
        let id_str = id.to_string();
        let pending: StreamPendingReply = conn
            .xpending_consumer_count(topic, group, &id_str, &id_str, 1, "")
            .await?;
        match pending {
            StreamPendingReply::Empty => Ok(0),
            StreamPendingReply::Data(data) => Ok(data
                .ids
                .first()
                .map(|p| p.times_delivered as u64)
                .unwrap_or(0)),
        }
    }

    async fn range(
        &self,
        topic: &str,
        from: Option<EventId>,
        to: Option<EventId>,
        limit: Option<usize>,
    ) -> Result<Vec<RawEntry>, StorageError> {
        let mut conn = self.conn.clone();
        let start = from.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string());
        let end = to.map(|i| i.to_string()).unwrap_or_else(|| "+".to_string());
        let raw: Vec<(String, Vec<(String, String)>)> = match limit {
            Some(n) => conn.xrange_count(topic, &start, &end, n).await?,
            None => conn.xrange(topic, &start, &end).await?,
        };
        raw.into_iter()
            .map(|(id_str, fields)| {
                let event_json = fields
                    .into_iter()
                    .find(|(k, _)| k == EVENT_FIELD)
                    .map(|(_, v)| v)
                    .ok_or_else(|| StorageError::MissingEventField(id_str.clone()))?;
                Ok(RawEntry { id: RedisSubstrate::entry_id_of(&id_str)?, event_json })
            })
            .collect()
    }
}

fn entries_from_reply(reply: StreamReadReply) -> Result<Vec<RawEntry>, StorageError> {
    let mut out = Vec::new();
    for key in reply.keys {
        for id in key.ids {
            let event_json = id
                .map
                .get(EVENT_FIELD)
                .ok_or_else(|| StorageError::MissingEventField(id.id.clone()))
                .and_then(|v| {
                    redis::from_redis_value::<String>(v).map_err(StorageError::from)
                })?;
            out.push(RawEntry {
                id: RedisSubstrate::entry_id_of(&id.id)?,
                event_json,
            });
        }
    }
    Ok(out)
}
