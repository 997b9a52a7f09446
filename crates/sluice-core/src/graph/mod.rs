// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Residual graph - dense CSR representation shared by all workers.
//!
//! Topology is built once by the loader and never changes; only the
//! per-node state (`excess`, `height`, `current`) and the per-edge residual
//! capacities mutate during a run. Every arc `(u, v)` has a distinct paired
//! arc `(v, u)` in `v`'s adjacency; the pair represents one undirected edge
//! of the residual graph and the sum of the paired capacities is invariant.
//!
//! All mutable state is stored in atomics so the graph can be shared across
//! worker threads by reference. The atomics are not what makes discharge
//! correct: per-vertex exclusion from the scheduler serializes conflicting
//! discharges, and the only genuinely concurrent mutation is the
//! strictly-smaller height CAS used by the global-relabel BFS.

pub mod builder;
pub mod loader;

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

/// Stable node index. Doubles as the deterministic priority key of the
/// deterministic schedulers.
pub type NodeIndex = u32;

/// Out-degree below which `find_edge` scans linearly instead of binary
/// searching the sorted adjacency.
const LINEAR_SEARCH_LIMIT: usize = 32;

#[derive(Debug)]
pub struct ResidualGraph {
    node_count: usize,

    /// CSR topology: `out_offsets[u]..out_offsets[u + 1]` indexes the
    /// outgoing edges of `u`, sorted by destination.
    out_offsets: Vec<u32>,
    out_dsts: Vec<u32>,

    /// Residual capacity per edge.
    capacities: Vec<AtomicU32>,
    /// Capacities at build time, kept for the verifier and flow extraction.
    initial: Vec<u32>,

    excess: Vec<AtomicI64>,
    height: Vec<AtomicU32>,
    /// Next-edge cursor of the discharge kernel, an offset into the node's
    /// adjacency. Persists across discharges; reset only by global relabel.
    current: Vec<AtomicU32>,
}

impl ResidualGraph {
    pub(crate) fn from_csr(out_offsets: Vec<u32>, out_dsts: Vec<u32>, caps: Vec<u32>) -> Self {
        let node_count = out_offsets.len() - 1;
        let initial = caps.clone();
        let capacities = caps.into_iter().map(AtomicU32::new).collect();

        Self {
            node_count,
            out_offsets,
            out_dsts,
            capacities,
            initial,
            excess: (0..node_count).map(|_| AtomicI64::new(0)).collect(),
            height: (0..node_count).map(|_| AtomicU32::new(0)).collect(),
            current: (0..node_count).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of directed edges (both orientations of every pair).
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.out_dsts.len()
    }

    /// Edge-index range of `u`'s adjacency.
    #[inline]
    pub fn edge_range(&self, u: NodeIndex) -> (usize, usize) {
        (
            self.out_offsets[u as usize] as usize,
            self.out_offsets[u as usize + 1] as usize,
        )
    }

    /// Outbound degree of `u`.
    #[inline]
    pub fn out_degree(&self, u: NodeIndex) -> usize {
        let (start, end) = self.edge_range(u);
        end - start
    }

    /// `(edge_index, destination)` pairs of `u`'s adjacency in ascending
    /// destination order. Stable within a run.
    #[inline]
    pub fn neighbors(&self, u: NodeIndex) -> impl Iterator<Item = (usize, NodeIndex)> + '_ {
        let (start, end) = self.edge_range(u);
        (start..end).map(move |e| (e, self.out_dsts[e]))
    }

    /// Destination of an edge.
    #[inline]
    pub fn dst(&self, edge: usize) -> NodeIndex {
        self.out_dsts[edge]
    }

    /// Current residual capacity of an edge.
    #[inline]
    pub fn capacity(&self, edge: usize) -> u32 {
        self.capacities[edge].load(Ordering::Acquire)
    }

    /// Capacity the edge had at build time.
    #[inline]
    pub fn initial_capacity(&self, edge: usize) -> u32 {
        self.initial[edge]
    }

    /// Index of the unique edge `(u, v)`.
    ///
    /// # Panics
    ///
    /// Panics if the pair does not exist. Every caller asks only for paired
    /// reverse edges, which the builder guarantees; a miss means the input
    /// was not symmetrized and the run cannot continue.
    pub fn find_edge(&self, u: NodeIndex, v: NodeIndex) -> usize {
        let (start, end) = self.edge_range(u);
        let window = &self.out_dsts[start..end];

        let found = if window.len() < LINEAR_SEARCH_LIMIT {
            window.iter().position(|&dst| dst == v)
        } else {
            window.binary_search(&v).ok()
        };

        match found {
            Some(offset) => start + offset,
            None => panic!("paired edge ({u}, {v}) missing: graph is not symmetric"),
        }
    }

    /// Move `amount` units of residual capacity from `(u, v)` to the paired
    /// `(v, u)`. The two updates are not atomic as a pair; the scheduler's
    /// per-vertex exclusion makes a committed discharge appear atomic over
    /// the closed neighborhood of `u`.
    pub fn push(&self, u: NodeIndex, v: NodeIndex, edge: usize, amount: i64) {
        debug_assert_eq!(self.out_dsts[edge], v);
        debug_assert!(amount >= 0 && amount <= self.capacity(edge) as i64);

        let reverse = self.find_edge(v, u);
        self.capacities[edge].fetch_sub(amount as u32, Ordering::AcqRel);
        self.capacities[reverse].fetch_add(amount as u32, Ordering::AcqRel);
    }

    #[inline]
    pub fn excess(&self, u: NodeIndex) -> i64 {
        self.excess[u as usize].load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn add_excess(&self, u: NodeIndex, delta: i64) {
        self.excess[u as usize].fetch_add(delta, Ordering::AcqRel);
    }

    #[inline]
    pub fn height(&self, u: NodeIndex) -> u32 {
        self.height[u as usize].load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_height(&self, u: NodeIndex, height: u32) {
        self.height[u as usize].store(height, Ordering::Release);
    }

    /// Lower `u`'s height to `candidate` iff it is strictly smaller than
    /// the stored value. Returns whether the write happened. The
    /// strictly-smaller rule is what keeps the concurrent reverse BFS
    /// correct: a vertex's height settles at its first (lowest) wave and
    /// every later candidate fails.
    pub(crate) fn lower_height(&self, u: NodeIndex, candidate: u32) -> bool {
        let cell = &self.height[u as usize];
        let mut observed = cell.load(Ordering::Acquire);
        while candidate < observed {
            match cell.compare_exchange_weak(
                observed,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(now) => observed = now,
            }
        }
        false
    }

    #[inline]
    pub(crate) fn current(&self, u: NodeIndex) -> u32 {
        self.current[u as usize].load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_current(&self, u: NodeIndex, offset: u32) {
        self.current[u as usize].store(offset, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::builder::GraphBuilder;
    use super::*;

    fn diamond() -> ResidualGraph {
        // 0 -> 1 (3), 0 -> 2 (2), 1 -> 3 (2), 2 -> 3 (3), 1 -> 2 (1)
        let mut b = GraphBuilder::new(4);
        for &(u, v, c) in &[(0, 1, 3), (0, 2, 2), (1, 3, 2), (2, 3, 3), (1, 2, 1)] {
            b.add_edge(u, v, c).unwrap();
        }
        b.build().unwrap()
    }

    #[test]
    fn test_neighbors_sorted_by_destination() {
        let g = diamond();
        for u in 0..g.node_count() as u32 {
            let dsts: Vec<_> = g.neighbors(u).map(|(_, v)| v).collect();
            let mut sorted = dsts.clone();
            sorted.sort_unstable();
            assert_eq!(dsts, sorted);
        }
    }

    #[test]
    fn test_find_edge_linear_path() {
        let g = diamond();
        let e = g.find_edge(1, 3);
        assert_eq!(g.dst(e), 3);
        assert_eq!(g.capacity(e), 2);
    }

    #[test]
    fn test_find_edge_binary_path() {
        // A star with out-degree above the linear-search threshold.
        let n = 2 * LINEAR_SEARCH_LIMIT as u32;
        let mut b = GraphBuilder::new(n as usize + 1);
        for v in 1..=n {
            b.add_edge(0, v, v).unwrap();
        }
        let g = b.build().unwrap();
        assert!(g.out_degree(0) >= LINEAR_SEARCH_LIMIT);

        for v in 1..=n {
            let e = g.find_edge(0, v);
            assert_eq!(g.dst(e), v);
            assert_eq!(g.capacity(e), v);
        }
    }

    #[test]
    #[should_panic(expected = "paired edge")]
    fn test_find_edge_missing_pair_panics() {
        let g = diamond();
        g.find_edge(0, 3);
    }

    #[test]
    fn test_push_preserves_pair_capacity() {
        let g = diamond();
        let e = g.find_edge(0, 1);
        let r = g.find_edge(1, 0);
        let before = g.capacity(e) + g.capacity(r);

        g.push(0, 1, e, 2);
        assert_eq!(g.capacity(e), 1);
        assert_eq!(g.capacity(r), 2);
        assert_eq!(g.capacity(e) + g.capacity(r), before);
    }

    #[test]
    fn test_lower_height_only_accepts_smaller() {
        let g = diamond();
        g.set_height(2, 5);
        assert!(!g.lower_height(2, 5));
        assert!(!g.lower_height(2, 9));
        assert!(g.lower_height(2, 3));
        assert_eq!(g.height(2), 3);
    }
}
