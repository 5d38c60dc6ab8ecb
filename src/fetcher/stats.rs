//! Fetch counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime fetch counters, written by the scheduler only.
#[derive(Debug, Default)]
pub struct FetchStats {
    api_calls: AtomicU64,
    successful_fetches: AtomicU64,
    failed_fetches: AtomicU64,
    skipped_cycles: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStatsSnapshot {
    pub api_calls_count: u64,
    pub successful_fetches_count: u64,
    pub failed_fetches_count: u64,
    pub skipped_cycles_count: u64,
}

impl FetchStats {
    pub fn record_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successful_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skipped_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            api_calls_count: self.api_calls.load(Ordering::Relaxed),
            successful_fetches_count: self.successful_fetches.load(Ordering::Relaxed),
            failed_fetches_count: self.failed_fetches.load(Ordering::Relaxed),
            skipped_cycles_count: self.skipped_cycles.load(Ordering::Relaxed),
        }
    }
}
