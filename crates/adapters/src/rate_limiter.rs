// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-bucket rate limiting for the Event Bus consumer loop (§4.1): one
//! global bucket plus one bucket per topic, both must grant a token.

use core_domain::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A single integer-token bucket, refilled lazily on every `try_acquire`
/// based on elapsed time since the last refill (§4.1 rate limiter).
struct Bucket {
    capacity: u32,
    tokens: f64,
    refill_per_sec: f64,
    last_refill_ms: u64,
}

impl Bucket {
    fn new(rate_per_sec: u32, now_ms: u64) -> Self {
        Self {
            capacity: rate_per_sec.max(1),
            tokens: rate_per_sec.max(1) as f64,
            refill_per_sec: rate_per_sec.max(1) as f64,
            last_refill_ms: now_ms,
        }
    }

    fn refill(&mut self, now_ms: u64) {
        let elapsed_sec = now_ms.saturating_sub(self.last_refill_ms) as f64 / 1000.0;
        self.tokens = (self.tokens + elapsed_sec * self.refill_per_sec).min(self.capacity as f64);
        self.last_refill_ms = now_ms;
    }

    fn has_token(&self) -> bool {
        self.tokens >= 1.0
    }

    fn consume(&mut self) {
        self.tokens -= 1.0;
    }
}

/// Global bucket plus one bucket per topic; both must grant a token for
/// an event to proceed (§4.1 step 5).
pub struct RateLimiter<C: Clock> {
    clock: Arc<C>,
    global: Mutex<Bucket>,
    per_topic: Mutex<HashMap<String, Bucket>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: Arc<C>, global_rate_per_sec: u32) -> Self {
        let now_ms = clock.epoch_ms();
        Self {
            clock,
            global: Mutex::new(Bucket::new(global_rate_per_sec, now_ms)),
            per_topic: Mutex::new(HashMap::new()),
        }
    }

    /// Attempt to acquire one token from both the global bucket and
    /// `topic`'s bucket (created on first use with `topic_rate_per_sec`).
    /// Both must have a token available or neither is consumed (§4.1 step
    /// 5: a denial never drops the event, it just isn't acquired yet).
    pub fn try_acquire(&self, topic: &str, topic_rate_per_sec: u32) -> bool {
        let now_ms = self.clock.epoch_ms();

        let mut global = self.global.lock();
        global.refill(now_ms);

        let mut per_topic = self.per_topic.lock();
        let bucket = per_topic
            .entry(topic.to_string())
            .or_insert_with(|| Bucket::new(topic_rate_per_sec, now_ms));
        bucket.refill(now_ms);

        if global.has_token() && bucket.has_token() {
            global.consume();
            bucket.consume();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
