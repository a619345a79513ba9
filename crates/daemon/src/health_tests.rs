// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;

#[test]
fn default_thresholds_match_the_documented_limits() {
    let thresholds = HealthThresholds::default();
    assert_eq!(thresholds.cpu_percent, 80.0);
    assert_eq!(thresholds.rss_bytes, 500 * 1024 * 1024);
    assert_eq!(thresholds.scheduler_lag, Duration::from_millis(100));
}

#[tokio::test]
async fn sample_populates_a_fresh_snapshot() {
    let monitor = HealthMonitor::new(HealthThresholds::default());
    let before = monitor.snapshot();

    monitor.sample().await;

    let after = monitor.snapshot();
    assert!(after.sampled_at >= before.sampled_at);
    assert!(after.rss_bytes > 0, "expected a nonzero RSS for the running test process");
}

#[test]
fn warn_on_thresholds_does_not_panic_for_either_state() {
    let monitor = HealthMonitor::new(HealthThresholds::default());
    monitor.warn_on_thresholds(&HealthSnapshot::default());
    monitor.warn_on_thresholds(&HealthSnapshot {
        cpu_percent: 99.0,
        rss_bytes: 600 * 1024 * 1024,
        scheduler_lag: Duration::from_millis(200),
        sampled_at: Instant::now(),
    });
}
