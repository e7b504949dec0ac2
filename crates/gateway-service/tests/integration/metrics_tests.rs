//! Metric emission tests
//!
//! Run admission against a thread-local debugging recorder and check the
//! counters it captured.

use chrono::{Duration, TimeZone, Utc};
use common::clock::SystemClock;
use common::jwt::SigningAlgorithm;
use common::secret::SecretString;
use gateway_service::crypto::TokenAuthority;
use gateway_service::services::rate_limiter::{RateLimitKey, SlidingWindowLimiter};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use metrics_util::MetricKind;
use std::sync::Arc;

/// Sum of a counter across label sets matching `label`.
fn counter_value(
    snapshot: &[(
        metrics_util::CompositeKey,
        Option<metrics::Unit>,
        Option<metrics::SharedString>,
        DebugValue,
    )],
    name: &str,
    label: (&str, &str),
) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| {
            key.key()
                .labels()
                .any(|l| l.key() == label.0 && l.value() == label.1)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => *count,
            _ => 0,
        })
        .sum()
}

#[test]
fn test_rate_limit_decisions_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    metrics::with_local_recorder(&recorder, || {
        let limiter = SlidingWindowLimiter::new(std::time::Duration::from_secs(60), 2);
        let key = RateLimitKey::user("alice");
        for _ in 0..5 {
            let _ = limiter.check_and_record(&key, 3, now);
        }

        // Two more keys force one capacity eviction
        limiter
            .check_and_record(&RateLimitKey::user("bob"), 3, now)
            .unwrap();
        limiter
            .check_and_record(&RateLimitKey::user("carol"), 3, now + Duration::seconds(1))
            .unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_value(&snapshot, "gateway_rate_limit_decisions_total", ("action", "allowed")),
        5
    );
    assert_eq!(
        counter_value(&snapshot, "gateway_rate_limit_decisions_total", ("action", "rejected")),
        2
    );
    assert_eq!(
        counter_value(&snapshot, "gateway_rate_limit_evictions_total", ("reason", "capacity")),
        1
    );
}

#[test]
fn test_token_validation_outcomes_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    metrics::with_local_recorder(&recorder, || {
        let authority = TokenAuthority::new(
            &SecretString::from("metrics-test-secret"),
            SigningAlgorithm::Hs256,
            Duration::minutes(1),
            Arc::new(SystemClock),
        );
        let token = authority.issue_at("alice", None, None, None, now).unwrap();

        authority.verify_at(&token, now).unwrap();
        let _ = authority.verify_at(&token, now + Duration::minutes(2));
        let _ = authority.verify_at("garbage", now);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_value(&snapshot, "gateway_token_issuance_total", ("status", "success")),
        1
    );
    assert_eq!(
        counter_value(&snapshot, "gateway_token_validations_total", ("status", "success")),
        1
    );
    assert_eq!(
        counter_value(
            &snapshot,
            "gateway_token_validations_total",
            ("error_category", "expired")
        ),
        1
    );
    assert_eq!(
        counter_value(
            &snapshot,
            "gateway_token_validations_total",
            ("error_category", "malformed")
        ),
        1
    );
}
