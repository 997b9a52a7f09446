// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Speculative worker-pool scheduler.
//!
//! Workers repeatedly pop an active vertex, claim its closed neighborhood,
//! discharge it, and release. Claims are advisory write-intent flags:
//! acquisition walks the neighborhood in ascending id order and aborts back
//! to the start on contention, so the worker holding the lowest contended
//! id always completes. Between discharges a worker may briefly block on
//! the shared bag; it never suspends inside a discharge.
//!
//! Two bag orderings are supported. FIFO keeps per-thread chunked queues
//! that spill to a shared deque; ordering across threads is unspecified.
//! Highest-label is a multi-level bucket keyed by height with a descending
//! top cursor, which makes the commit order weakly descending in height.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::config::{OrderMode, BETA};
use crate::engine::EngineContext;
use crate::graph::{NodeIndex, ResidualGraph};

/// FIFO refill chunk per worker.
const CHUNK: usize = 16;
/// Local FIFO length at which a worker spills back to the shared bag.
const SPILL: usize = 2 * CHUNK;

/// Advisory per-node write-intent flags.
struct NodeClaims {
    flags: Vec<AtomicBool>,
}

impl NodeClaims {
    fn new(node_count: usize) -> Self {
        Self {
            flags: (0..node_count).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    #[inline]
    fn try_claim(&self, u: NodeIndex) -> bool {
        self.flags[u as usize]
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    fn release(&self, u: NodeIndex) {
        self.flags[u as usize].store(false, Ordering::Release);
    }
}

struct LevelBuckets {
    buckets: Vec<VecDeque<NodeIndex>>,
    top: usize,
    len: usize,
}

impl LevelBuckets {
    fn new(node_count: usize) -> Self {
        Self {
            buckets: vec![VecDeque::new(); node_count + 1],
            top: 0,
            len: 0,
        }
    }

    fn push(&mut self, u: NodeIndex, height: u32) {
        let level = (height as usize).min(self.buckets.len() - 1);
        self.buckets[level].push_back(u);
        self.top = self.top.max(level);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<NodeIndex> {
        if self.len == 0 {
            return None;
        }
        while self.top > 0 && self.buckets[self.top].is_empty() {
            self.top -= 1;
        }
        let u = self.buckets[self.top].pop_front()?;
        self.len -= 1;
        Some(u)
    }
}

enum SharedBag {
    Fifo(Mutex<VecDeque<NodeIndex>>),
    HighestLabel(Mutex<LevelBuckets>),
}

impl SharedBag {
    fn new(order: OrderMode, node_count: usize) -> Self {
        match order {
            OrderMode::Fifo => Self::Fifo(Mutex::new(VecDeque::new())),
            OrderMode::HighestLabel => {
                Self::HighestLabel(Mutex::new(LevelBuckets::new(node_count)))
            }
        }
    }

    fn push(&self, graph: &ResidualGraph, u: NodeIndex) {
        match self {
            Self::Fifo(queue) => queue.lock().push_back(u),
            Self::HighestLabel(buckets) => buckets.lock().push(u, graph.height(u)),
        }
    }

    /// Move work into a worker's local queue: a chunk for FIFO, the single
    /// highest vertex for HL (priority would go stale in a local queue).
    fn refill(&self, local: &mut VecDeque<NodeIndex>) {
        match self {
            Self::Fifo(queue) => {
                let mut queue = queue.lock();
                for _ in 0..CHUNK {
                    match queue.pop_front() {
                        Some(u) => local.push_back(u),
                        None => break,
                    }
                }
            }
            Self::HighestLabel(buckets) => {
                if let Some(u) = buckets.lock().pop() {
                    local.push_back(u);
                }
            }
        }
    }
}

/// Per-thread work counter on its own cache line.
#[repr(align(64))]
#[derive(Default)]
struct PaddedCounter(AtomicU64);

impl PaddedCounter {
    fn add(&self, amount: u64) -> u64 {
        self.0.fetch_add(amount, Ordering::Relaxed) + amount
    }
}

/// Drain one discharge phase. Returns whether the phase stopped because the
/// global-relabel counter tripped (as opposed to running out of work).
pub(crate) fn run_phase(
    ctx: &EngineContext<'_>,
    order: OrderMode,
    workers: usize,
    interval: Option<u64>,
    active: &mut Vec<NodeIndex>,
) -> bool {
    let graph = ctx.graph;
    let bag = SharedBag::new(order, graph.node_count());
    // Counts items in any bag plus discharges in flight; zero means done.
    let pending = AtomicUsize::new(active.len());
    for &u in active.iter() {
        bag.push(graph, u);
    }
    active.clear();

    let claims = NodeClaims::new(graph.node_count());
    let stop = AtomicBool::new(false);
    let relabel_requested = AtomicBool::new(false);
    let limit = interval.map(|i| (i / workers as u64).max(1));
    let counters: Vec<PaddedCounter> = (0..workers).map(|_| PaddedCounter::default()).collect();

    thread::scope(|scope| {
        for counter in &counters {
            let bag = &bag;
            let claims = &claims;
            let pending = &pending;
            let stop = &stop;
            let relabel_requested = &relabel_requested;
            scope.spawn(move || {
                worker_loop(
                    ctx,
                    order,
                    bag,
                    claims,
                    pending,
                    stop,
                    relabel_requested,
                    counter,
                    limit,
                );
            });
        }
    });

    relabel_requested.load(Ordering::Acquire)
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    ctx: &EngineContext<'_>,
    order: OrderMode,
    bag: &SharedBag,
    claims: &NodeClaims,
    pending: &AtomicUsize,
    stop: &AtomicBool,
    relabel_requested: &AtomicBool,
    counter: &PaddedCounter,
    limit: Option<u64>,
) {
    let graph = ctx.graph;
    let mut local: VecDeque<NodeIndex> = VecDeque::with_capacity(SPILL);
    let mut neighborhood: Vec<NodeIndex> = Vec::new();

    loop {
        if stop.load(Ordering::Acquire) {
            // Cooperative break: hand local work back and leave.
            for u in local.drain(..) {
                bag.push(graph, u);
            }
            return;
        }

        let next = local.pop_front().or_else(|| {
            bag.refill(&mut local);
            local.pop_front()
        });
        let Some(u) = next else {
            if pending.load(Ordering::Acquire) == 0 {
                return;
            }
            thread::yield_now();
            continue;
        };

        claim_closed_neighborhood(ctx, claims, u, &mut neighborhood);
        let relabeled = ctx.discharge(u, |v| {
            pending.fetch_add(1, Ordering::AcqRel);
            match order {
                OrderMode::Fifo => {
                    local.push_back(v);
                    if local.len() >= SPILL {
                        while local.len() > CHUNK {
                            let Some(spilled) = local.pop_back() else { break };
                            bag.push(graph, spilled);
                        }
                    }
                }
                OrderMode::HighestLabel => bag.push(graph, v),
            }
        });
        for &w in &neighborhood {
            claims.release(w);
        }

        ctx.stats.record_discharge();
        pending.fetch_sub(1, Ordering::AcqRel);

        if let Some(limit) = limit {
            let charge = if relabeled { 1 + BETA } else { 1 };
            if counter.add(charge) >= limit {
                relabel_requested.store(true, Ordering::Release);
                stop.store(true, Ordering::Release);
            }
        }
    }
}

/// Claim `u` and all of its neighbors in ascending id order. On contention
/// every flag acquired so far is released and the acquisition restarts
/// (abort-and-retry); the holder of the lowest contended id never aborts,
/// so some discharge always makes progress.
fn claim_closed_neighborhood(
    ctx: &EngineContext<'_>,
    claims: &NodeClaims,
    u: NodeIndex,
    neighborhood: &mut Vec<NodeIndex>,
) {
    neighborhood.clear();
    let mut placed = false;
    for (_, v) in ctx.graph.neighbors(u) {
        if !placed && u < v {
            neighborhood.push(u);
            placed = true;
        }
        neighborhood.push(v);
    }
    if !placed {
        neighborhood.push(u);
    }

    loop {
        let mut acquired = neighborhood.len();
        for (i, &w) in neighborhood.iter().enumerate() {
            if !claims.try_claim(w) {
                acquired = i;
                break;
            }
        }
        if acquired == neighborhood.len() {
            return;
        }
        for &w in &neighborhood[..acquired] {
            claims.release(w);
        }
        ctx.stats.record_abort();
        thread::yield_now();
    }
}
