// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Graph construction and the symmetrize pass.
//!
//! The engine requires every arc `(u, v)` to have a distinct paired arc
//! `(v, u)`; when the input lacks a reverse, the builder inserts one with
//! capacity zero. Self-loops are dropped and duplicate arcs are merged by
//! capacity sum before pairing.

use fxhash::FxHashMap;

use crate::error::{FlowError, Result};
use crate::graph::{NodeIndex, ResidualGraph};

pub struct GraphBuilder {
    node_count: usize,
    /// Merged arc capacities, keyed by `(src, dst)`. u64 so that merged
    /// duplicates survive until the 32-bit check in `build`.
    arcs: FxHashMap<(NodeIndex, NodeIndex), u64>,
    unit_capacity: bool,
    symmetric: bool,
}

impl GraphBuilder {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            arcs: FxHashMap::default(),
            unit_capacity: false,
            symmetric: false,
        }
    }

    /// Treat every input capacity as 1.
    pub fn unit_capacity(mut self, enabled: bool) -> Self {
        self.unit_capacity = enabled;
        self
    }

    /// Assume the input already contains every paired reverse edge and has
    /// unit capacities; `build` validates the pairing instead of inserting
    /// reverses.
    pub fn symmetric(mut self, enabled: bool) -> Self {
        self.symmetric = enabled;
        self
    }

    /// Add one directed arc. Self-loops are dropped; duplicate `(u, v)`
    /// arcs are merged by capacity sum.
    pub fn add_edge(&mut self, u: NodeIndex, v: NodeIndex, capacity: u32) -> Result<()> {
        let n = self.node_count as u32;
        if u >= n || v >= n {
            return Err(FlowError::InvalidInput {
                message: format!("arc ({u}, {v}) references a vertex >= {n}"),
            });
        }
        if u == v {
            return Ok(());
        }

        let capacity = if self.unit_capacity { 1 } else { capacity as u64 };
        *self.arcs.entry((u, v)).or_insert(0) += capacity;
        Ok(())
    }

    /// Pair every arc, check capacity bounds, and materialize the CSR graph.
    pub fn build(mut self) -> Result<ResidualGraph> {
        if self.symmetric {
            for &(u, v) in self.arcs.keys() {
                if !self.arcs.contains_key(&(v, u)) {
                    return Err(FlowError::InvalidInput {
                        message: format!(
                            "symmetric input promised but arc ({u}, {v}) has no reverse"
                        ),
                    });
                }
            }
            for capacity in self.arcs.values_mut() {
                *capacity = 1;
            }
        } else {
            let missing: Vec<(NodeIndex, NodeIndex)> = self
                .arcs
                .keys()
                .filter(|&&(u, v)| !self.arcs.contains_key(&(v, u)))
                .map(|&(u, v)| (v, u))
                .collect();
            for pair in missing {
                self.arcs.insert(pair, 0);
            }
        }

        let mut total: u128 = 0;
        for (&(u, v), &capacity) in &self.arcs {
            if capacity > u32::MAX as u64 {
                return Err(FlowError::InvalidInput {
                    message: format!("arc ({u}, {v}) capacity {capacity} exceeds 32 bits"),
                });
            }
            // The residual capacity of either side of a pair can grow to
            // the pair total, which must stay representable in 32 bits.
            let paired = self.arcs[&(v, u)];
            if capacity + paired > u32::MAX as u64 {
                return Err(FlowError::InvalidInput {
                    message: format!(
                        "pair ({u}, {v}) total capacity {} exceeds 32 bits",
                        capacity + paired
                    ),
                });
            }
            total += capacity as u128;
        }
        if total > i64::MAX as u128 {
            return Err(FlowError::CapacityOverflow { total });
        }

        let mut adjacency: Vec<Vec<(NodeIndex, u32)>> = vec![Vec::new(); self.node_count];
        for (&(u, v), &capacity) in &self.arcs {
            adjacency[u as usize].push((v, capacity as u32));
        }

        let mut out_offsets = Vec::with_capacity(self.node_count + 1);
        let mut out_dsts = Vec::with_capacity(self.arcs.len());
        let mut capacities = Vec::with_capacity(self.arcs.len());

        out_offsets.push(0u32);
        for list in &mut adjacency {
            list.sort_unstable_by_key(|&(v, _)| v);
            debug_assert!(list.windows(2).all(|w| w[0].0 < w[1].0));
            for &(v, capacity) in list.iter() {
                out_dsts.push(v);
                capacities.push(capacity);
            }
            out_offsets.push(out_dsts.len() as u32);
        }

        Ok(ResidualGraph::from_csr(out_offsets, out_dsts, capacities))
    }
}

/// Convenience constructor used by tests and benchmarks.
pub fn from_edges(node_count: usize, edges: &[(NodeIndex, NodeIndex, u32)]) -> Result<ResidualGraph> {
    let mut builder = GraphBuilder::new(node_count);
    for &(u, v, capacity) in edges {
        builder.add_edge(u, v, capacity)?;
    }
    builder.build()
}
