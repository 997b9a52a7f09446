// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Run statistics: operation counters and per-phase wall times.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by all workers during a solve. Counter updates are
/// relaxed; they are read only after the worker pool has joined.
#[derive(Debug, Default)]
pub struct SolverStats {
    discharges: AtomicU64,
    pushes: AtomicU64,
    relabels: AtomicU64,
    global_relabels: AtomicU64,
    aborts: AtomicU64,
    discharge_nanos: AtomicU64,
    global_relabel_nanos: AtomicU64,
}

impl SolverStats {
    pub(crate) fn record_discharge(&self) {
        self.discharges.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_push(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_relabel(&self) {
        self.relabels.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discharge_phase(&self, elapsed: Duration) {
        self.discharge_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_global_relabel(&self, elapsed: Duration) {
        self.global_relabels.fetch_add(1, Ordering::Relaxed);
        self.global_relabel_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            discharges: self.discharges.load(Ordering::Relaxed),
            pushes: self.pushes.load(Ordering::Relaxed),
            relabels: self.relabels.load(Ordering::Relaxed),
            global_relabels: self.global_relabels.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            discharge_time: Duration::from_nanos(self.discharge_nanos.load(Ordering::Relaxed)),
            global_relabel_time: Duration::from_nanos(
                self.global_relabel_nanos.load(Ordering::Relaxed),
            ),
        }
    }
}

/// Plain-value statistics returned in the solve summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Completed discharges (units of work).
    pub discharges: u64,
    /// Individual push operations.
    pub pushes: u64,
    /// Local relabels performed by the discharge kernel.
    pub relabels: u64,
    /// Global relabel passes.
    pub global_relabels: u64,
    /// Aborted speculative iterations (neighborhood contention or
    /// deterministic conflicts).
    pub aborts: u64,
    /// Total wall time spent in discharge phases.
    pub discharge_time: Duration,
    /// Total wall time spent in global relabels.
    pub global_relabel_time: Duration,
}
