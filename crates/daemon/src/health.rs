// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Samples the daemon's own resource usage and async scheduling lag on a
//! fixed interval, logging a warning when a threshold is crossed. Purely
//! observational: it never kills or restarts workers.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};
use tracing::warn;

const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    pub cpu_percent: f32,
    pub rss_bytes: u64,
    pub scheduler_lag: Duration,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self { cpu_percent: 80.0, rss_bytes: 500 * 1024 * 1024, scheduler_lag: Duration::from_millis(100) }
    }
}

/// The most recent resource sample, exposed read-only via `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthSnapshot {
    pub cpu_percent: f32,
    pub rss_bytes: u64,
    pub scheduler_lag: Duration,
    pub sampled_at: Instant,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self { cpu_percent: 0.0, rss_bytes: 0, scheduler_lag: Duration::ZERO, sampled_at: Instant::now() }
    }
}

pub struct HealthMonitor {
    system: Mutex<System>,
    pid: Pid,
    thresholds: HealthThresholds,
    snapshot: RwLock<HealthSnapshot>,
}

impl HealthMonitor {
    pub fn new(thresholds: HealthThresholds) -> Arc<Self> {
        Arc::new(Self {
            system: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
            thresholds,
            snapshot: RwLock::new(HealthSnapshot::default()),
        })
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        *self.snapshot.read()
    }

    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SAMPLE_INTERVAL).await;
                monitor.sample().await;
            }
        })
    }

    /// Measures scheduling lag as the delay between asking for a
    /// zero-duration timer and it actually firing, a proxy for how
    /// saturated the tokio runtime's scheduler is.
    async fn sample(&self) {
        let scheduled = Instant::now();
        tokio::time::sleep(Duration::ZERO).await;
        let scheduler_lag = scheduled.elapsed();

        let (cpu_percent, rss_bytes) = {
            let mut system = self.system.lock();
            system.refresh_process(self.pid);
            match system.process(self.pid) {
                Some(process) => (process.cpu_usage(), process.memory()),
                None => (0.0, 0),
            }
        };

        let snapshot = HealthSnapshot { cpu_percent, rss_bytes, scheduler_lag, sampled_at: Instant::now() };
        self.warn_on_thresholds(&snapshot);
        *self.snapshot.write() = snapshot;
    }

    fn warn_on_thresholds(&self, snapshot: &HealthSnapshot) {
        if snapshot.cpu_percent > self.thresholds.cpu_percent {
            warn!(cpu_percent = snapshot.cpu_percent, "daemon CPU usage above threshold");
        }
        if snapshot.rss_bytes > self.thresholds.rss_bytes {
            warn!(rss_bytes = snapshot.rss_bytes, "daemon RSS above threshold");
        }
        if snapshot.scheduler_lag > self.thresholds.scheduler_lag {
            warn!(lag_ms = snapshot.scheduler_lag.as_millis() as u64, "scheduler lag above threshold");
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
