// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by the pool, the dispatcher and the workers.
#[derive(Debug, Default)]
pub(crate) struct PoolMetrics {
    executed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl PoolMetrics {
    pub(crate) fn job_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn job_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn jobs_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Jobs waiting in the intake queue.
    pub queued: usize,
    /// Worker handles currently resting in the idle registry.
    pub idle_workers: usize,
    /// Workers that have not retired yet.
    pub live_workers: usize,
    /// Jobs that ran to completion, including failed ones.
    pub executed: u64,
    /// Jobs that panicked.
    pub failed: u64,
    /// Jobs accepted or offered but never run because the pool shut down.
    pub dropped: u64,
}
