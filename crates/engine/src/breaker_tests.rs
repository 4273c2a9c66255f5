// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use core_domain::FakeClock;
use core_storage::breaker_store::fake::FakeBreakerStore;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Default)]
struct CapturingAlertSink {
    alerts: Mutex<Vec<(String, String, u32)>>,
}

impl CapturingAlertSink {
    fn alerts(&self) -> Vec<(String, String, u32)> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl AlertSink for CapturingAlertSink {
    async fn publish_disabled_alert(&self, plugin: &str, reason: &str, consecutive_failures: u32) {
        self.alerts.lock().push((plugin.to_string(), reason.to_string(), consecutive_failures));
    }
}

fn breaker_with(
    config: BreakerConfig,
) -> (CircuitBreaker<FakeClock>, Arc<CapturingAlertSink>, Arc<FakeClock>) {
    let store = Arc::new(FakeBreakerStore::new());
    let alerts = Arc::new(CapturingAlertSink::default());
    let clock = Arc::new(FakeClock::new());
    let breaker = CircuitBreaker::new(store, alerts.clone(), clock.clone(), config);
    (breaker, alerts, clock)
}

#[tokio::test]
async fn discovery_seeds_a_fresh_plugin_as_active() {
    let (breaker, _alerts, _clock) = breaker_with(BreakerConfig::default());
    breaker.discover(&["p".to_string()]).await.unwrap();
    let health = breaker.health("p").await.unwrap();
    assert_eq!(health.state, BreakerState::Active);
    assert!(breaker.is_healthy("p").await.unwrap());
}

#[tokio::test]
async fn success_resets_the_consecutive_failure_counter() {
    let (breaker, _alerts, _clock) = breaker_with(BreakerConfig::default());
    breaker.record_failure("p", "boom").await.unwrap();
    breaker.record_failure("p", "boom").await.unwrap();
    breaker.record_success("p").await.unwrap();

    let health = breaker.health("p").await.unwrap();
    assert_eq!(health.state, BreakerState::Active);
    assert_eq!(health.consecutive_failures, 0);
    assert_eq!(health.total_failures, 2);
    assert_eq!(health.total_executions, 3);
}

#[tokio::test]
async fn crossing_the_failure_threshold_disables_the_plugin_and_alerts() {
    let config = BreakerConfig { failure_threshold: 5, ..BreakerConfig::default() };
    let (breaker, alerts, _clock) = breaker_with(config);

    for _ in 0..4 {
        breaker.record_failure("p", "boom").await.unwrap();
    }
    assert!(breaker.is_healthy("p").await.unwrap());
    assert!(alerts.alerts().is_empty());

    breaker.record_failure("p", "boom").await.unwrap();

    let health = breaker.health("p").await.unwrap();
    assert_eq!(health.state, BreakerState::Disabled);
    assert_eq!(health.consecutive_failures, 5);
    assert!(!breaker.is_healthy("p").await.unwrap());

    let alerted = alerts.alerts();
    assert_eq!(alerted.len(), 1);
    assert_eq!(alerted[0].0, "p");
    assert_eq!(alerted[0].2, 5);
}

#[tokio::test]
async fn a_disabled_plugin_stays_disabled_past_the_threshold() {
    let config = BreakerConfig { failure_threshold: 2, ..BreakerConfig::default() };
    let (breaker, alerts, _clock) = breaker_with(config);

    breaker.record_failure("p", "a").await.unwrap();
    breaker.record_failure("p", "b").await.unwrap();
    breaker.record_failure("p", "c").await.unwrap();

    let health = breaker.health("p").await.unwrap();
    assert_eq!(health.state, BreakerState::Disabled);
    assert_eq!(health.consecutive_failures, 3);
    // Only the first crossing emits an alert.
    assert_eq!(alerts.alerts().len(), 1);
}

#[tokio::test]
async fn a_disabled_plugin_auto_recovers_once_the_cooldown_elapses() {
    let config = BreakerConfig { failure_threshold: 1, reset_timeout_secs: 300, ..BreakerConfig::default() };
    let (breaker, _alerts, clock) = breaker_with(config);

    breaker.record_failure("p", "boom").await.unwrap();
    assert!(!breaker.is_healthy("p").await.unwrap());

    clock.advance(Duration::from_secs(299));
    assert!(!breaker.is_healthy("p").await.unwrap());

    clock.advance(Duration::from_secs(2));
    assert!(breaker.is_healthy("p").await.unwrap());
}

#[tokio::test]
async fn manual_reset_forces_active_regardless_of_state() {
    let config = BreakerConfig { failure_threshold: 1, ..BreakerConfig::default() };
    let (breaker, _alerts, _clock) = breaker_with(config);

    breaker.record_failure("p", "boom").await.unwrap();
    assert!(!breaker.is_healthy("p").await.unwrap());

    breaker.reset("p").await.unwrap();

    let health = breaker.health("p").await.unwrap();
    assert_eq!(health.state, BreakerState::Active);
    assert_eq!(health.consecutive_failures, 0);
    assert!(breaker.is_healthy("p").await.unwrap());
}

#[tokio::test]
async fn manual_pause_disables_for_the_requested_minutes() {
    let (breaker, _alerts, clock) = breaker_with(BreakerConfig::default());

    breaker.pause("p", 10).await.unwrap();
    let health = breaker.health("p").await.unwrap();
    assert_eq!(health.state, BreakerState::Paused);
    assert!(!breaker.is_healthy("p").await.unwrap());

    clock.advance(Duration::from_secs(9 * 60));
    assert!(!breaker.is_healthy("p").await.unwrap());

    clock.advance(Duration::from_secs(2 * 60));
    assert!(breaker.is_healthy("p").await.unwrap());
}

#[tokio::test]
async fn failure_reasons_are_retained_up_to_the_configured_history() {
    let config = BreakerConfig { failure_history: 2, failure_threshold: 100, ..BreakerConfig::default() };
    let (breaker, _alerts, _clock) = breaker_with(config);

    breaker.record_failure("p", "one").await.unwrap();
    breaker.record_failure("p", "two").await.unwrap();
    breaker.record_failure("p", "three").await.unwrap();

    let health = breaker.health("p").await.unwrap();
    assert_eq!(health.recent_failure_reasons(5), vec!["two".to_string(), "three".to_string()]);
}
