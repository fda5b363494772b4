//! Daemon status surface.
//!
//! One snapshot type summarizing readiness, uptime, and per-operation
//! counters, assembled on demand from the connection tracker and the API
//! statistics. Readiness mirrors the tracker exactly; the not-ready reason
//! names every subsystem still unconnected.

use crate::stats::{ApiStats, StatsSnapshot};
use crate::tracker::ConnectionTracker;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Point-in-time view of the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    /// Host the daemon runs on
    pub hostname: String,
    /// Daemon version
    pub version: String,
    /// Whether every registered subsystem is connected
    pub ready: bool,
    /// Human-readable reason when not ready, empty otherwise
    pub reason: String,
    /// When the daemon started
    pub started_at: DateTime<Utc>,
    /// Seconds since start
    pub uptime_secs: i64,
    /// Per-operation attempt/success counters
    pub counters: StatsSnapshot,
}

/// Builds [`SystemStatus`] snapshots.
pub struct StatusReporter {
    tracker: Arc<ConnectionTracker>,
    stats: Arc<ApiStats>,
    hostname: String,
    started_at: DateTime<Utc>,
}

impl StatusReporter {
    /// Create a reporter; records the start timestamp now
    pub fn new(tracker: Arc<ConnectionTracker>, stats: Arc<ApiStats>) -> Self {
        Self {
            tracker,
            stats,
            hostname: detect_hostname(),
            started_at: Utc::now(),
        }
    }

    /// Override the detected hostname
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Current status snapshot
    pub fn report(&self) -> SystemStatus {
        let unconnected = self.tracker.unconnected();
        let ready = unconnected.is_empty();
        let reason = if ready {
            String::new()
        } else {
            format!("Not connected to {}", unconnected.join(" "))
        };
        SystemStatus {
            hostname: self.hostname.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ready,
            reason,
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
            counters: self.stats.snapshot(),
        }
    }
}

fn detect_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
