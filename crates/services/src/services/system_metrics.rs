//! Host and request metrics for the status page. Nothing in the pipeline
//! reads these.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tokio::sync::Mutex;
use ts_rs::TS;
use utils::number::round2;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f64,
    pub uptime_secs: u64,
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn snapshot(&self) -> SystemMetrics;
}

/// Host readings through `sysinfo`. CPU usage is relative to the previous
/// snapshot, so the first reading after start-up may be zero.
pub struct SysinfoMetrics {
    system: Mutex<System>,
}

impl SysinfoMetrics {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SysinfoMetrics {
    async fn snapshot(&self) -> SystemMetrics {
        let mut system = self.system.lock().await;
        system.refresh_cpu_usage();
        system.refresh_memory();

        let cpus = system.cpus();
        let cpu_usage_percent = if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|cpu| f64::from(cpu.cpu_usage())).sum::<f64>() / cpus.len() as f64
        };
        let used = system.used_memory();
        let total = system.total_memory();

        SystemMetrics {
            cpu_usage_percent: round2(cpu_usage_percent),
            memory_used_mb: used / BYTES_PER_MB,
            memory_total_mb: total / BYTES_PER_MB,
            memory_usage_percent: if total == 0 {
                0.0
            } else {
                round2(used as f64 * 100.0 / total as f64)
            },
            uptime_secs: System::uptime(),
        }
    }
}

/// Running mean of request latencies
#[derive(Debug, Default)]
pub struct ResponseTimeTracker {
    total_micros: AtomicU64,
    count: AtomicU64,
}

impl ResponseTimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Mean latency in ms, 0 before the first request
    pub fn average_ms(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_micros.load(Ordering::Relaxed);
        round2(total as f64 / count as f64 / 1000.0)
    }
}
