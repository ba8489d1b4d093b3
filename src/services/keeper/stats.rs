// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime counters for the execution loop.
#[derive(Debug, Default)]
pub struct KeeperStats {
    pub ticks: AtomicU64,
    pub ticks_aborted: AtomicU64,
    pub ticks_empty: AtomicU64,
    pub ticks_overrun: AtomicU64,
    pub decisions_skip: AtomicU64,
    pub decisions_execute: AtomicU64,
    pub batches_confirmed: AtomicU64,
    pub batches_failed: AtomicU64,
    pub publish_failures: AtomicU64,
    pub journal_failures: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub ticks_aborted: u64,
    pub ticks_empty: u64,
    pub ticks_overrun: u64,
    pub decisions_skip: u64,
    pub decisions_execute: u64,
    pub batches_confirmed: u64,
    pub batches_failed: u64,
    pub publish_failures: u64,
    pub journal_failures: u64,
}

impl KeeperStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            ticks: load(&self.ticks),
            ticks_aborted: load(&self.ticks_aborted),
            ticks_empty: load(&self.ticks_empty),
            ticks_overrun: load(&self.ticks_overrun),
            decisions_skip: load(&self.decisions_skip),
            decisions_execute: load(&self.decisions_execute),
            batches_confirmed: load(&self.batches_confirmed),
            batches_failed: load(&self.batches_failed),
            publish_failures: load(&self.publish_failures),
            journal_failures: load(&self.journal_failures),
        }
    }
}

impl StatsSnapshot {
    /// Name, help text and value of every counter, in render order.
    pub fn counters(&self) -> [(&'static str, &'static str, u64); 10] {
        [
            ("keeper_ticks_total", "Ticks started", self.ticks),
            ("keeper_ticks_aborted_total", "Ticks aborted by a read failure", self.ticks_aborted),
            ("keeper_ticks_empty_total", "Ticks with no active streams", self.ticks_empty),
            ("keeper_ticks_overrun_total", "Scheduled ticks skipped while busy", self.ticks_overrun),
            ("keeper_decisions_skip_total", "SKIP decisions", self.decisions_skip),
            ("keeper_decisions_execute_total", "EXECUTE decisions", self.decisions_execute),
            ("keeper_batches_confirmed_total", "Batches confirmed on chain", self.batches_confirmed),
            ("keeper_batches_failed_total", "Batches that failed or timed out", self.batches_failed),
            ("keeper_publish_failures_total", "Audit publishes that failed", self.publish_failures),
            ("keeper_journal_failures_total", "Journal writes that failed", self.journal_failures),
        ]
    }
}
