//! Per-operation call statistics.
//!
//! Observability output only: attempted is bumped at operation entry,
//! succeeded after the final bookkeeping stage completes. Never part of
//! correctness.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation kinds counted by the orchestrator. Bulk reads count as gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Create,
    Get,
    Update,
    Delete,
    Action,
}

const OP_COUNT: usize = 5;

impl OpKind {
    fn index(self) -> usize {
        match self {
            OpKind::Create => 0,
            OpKind::Get => 1,
            OpKind::Update => 2,
            OpKind::Delete => 3,
            OpKind::Action => 4,
        }
    }
}

/// Atomic attempted/succeeded counters per operation kind.
#[derive(Default)]
pub struct ApiStats {
    attempted: [AtomicU64; OP_COUNT],
    succeeded: [AtomicU64; OP_COUNT],
}

impl ApiStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an operation attempt
    pub fn attempted(&self, op: OpKind) {
        self.attempted[op.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Count an operation success
    pub fn succeeded(&self, op: OpKind) {
        self.succeeded[op.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Counters for one operation kind
    pub fn counters(&self, op: OpKind) -> OpCounters {
        OpCounters {
            total: self.attempted[op.index()].load(Ordering::Relaxed),
            success: self.succeeded[op.index()].load(Ordering::Relaxed),
        }
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            create: self.counters(OpKind::Create),
            get: self.counters(OpKind::Get),
            update: self.counters(OpKind::Update),
            delete: self.counters(OpKind::Delete),
            action: self.counters(OpKind::Action),
        }
    }
}

/// Attempted/succeeded pair for one operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpCounters {
    pub total: u64,
    pub success: u64,
}

impl fmt::Display for OpCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total {} Success {}", self.total, self.success)
    }
}

/// Serializable snapshot of all operation counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub create: OpCounters,
    pub get: OpCounters,
    pub update: OpCounters,
    pub delete: OpCounters,
    pub action: OpCounters,
}
