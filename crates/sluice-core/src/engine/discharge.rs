// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Per-vertex discharge: push excess along admissible edges, relabel when
//! stuck, repeat until the excess is gone or the vertex disconnects.

use crate::engine::EngineContext;
use crate::graph::NodeIndex;

impl EngineContext<'_> {
    /// Discharge `u`. `activate` is called once for every neighbor whose
    /// excess transitions from zero (newly active; never the source or
    /// sink). Returns whether a relabel occurred, which the scheduler uses
    /// to charge `1 + BETA` instead of `1` toward the relabel interval.
    ///
    /// The caller must hold exclusive access to `u`'s closed neighborhood.
    pub(crate) fn discharge(&self, u: NodeIndex, mut activate: impl FnMut(NodeIndex)) -> bool {
        let graph = self.graph;
        let n = graph.node_count() as u32;
        let mut relabeled = false;

        if graph.excess(u) == 0 || graph.height(u) >= n {
            return false;
        }

        loop {
            let height = graph.height(u);
            let (start, end) = graph.edge_range(u);
            let mut finished = false;

            for edge in start + graph.current(u) as usize..end {
                let capacity = graph.capacity(edge);
                if capacity == 0 {
                    continue;
                }
                let v = graph.dst(edge);
                if height != graph.height(v) + 1 {
                    continue;
                }

                let amount = graph.excess(u).min(capacity as i64);
                graph.push(u, v, edge, amount);
                self.stats.record_push();

                // Enqueue on the zero-to-positive transition only.
                if v != self.sink && v != self.source && graph.excess(v) == 0 {
                    activate(v);
                }
                graph.add_excess(u, -amount);
                graph.add_excess(v, amount);

                if graph.excess(u) == 0 {
                    graph.set_current(u, (edge - start) as u32);
                    finished = true;
                    break;
                }
            }

            if finished {
                break;
            }

            relabeled = true;
            self.stats.record_relabel();
            if !self.relabel(u) {
                // Disconnected from the sink; any remaining excess stays.
                break;
            }
        }

        relabeled
    }

    /// Set `height(u) = 1 + min{height(v) : capacity(u, v) > 0}` and park
    /// the cursor on the edge achieving the minimum. Returns `false` when
    /// the new height reaches `n` (clamped; the vertex is disconnected from
    /// the sink in the residual graph). An adjacency with no residual
    /// capacity at all cannot happen for a vertex holding excess, but is
    /// clamped the same way rather than trusted.
    fn relabel(&self, u: NodeIndex) -> bool {
        let graph = self.graph;
        let n = graph.node_count() as u32;
        let (start, end) = graph.edge_range(u);

        let mut min_height = u32::MAX;
        let mut min_edge = 0u32;
        for edge in start..end {
            if graph.capacity(edge) == 0 {
                continue;
            }
            let height = graph.height(graph.dst(edge));
            if height < min_height {
                min_height = height;
                min_edge = (edge - start) as u32;
            }
        }

        if min_height == u32::MAX || min_height + 1 >= n {
            graph.set_height(u, n);
            return false;
        }

        graph.set_height(u, min_height + 1);
        graph.set_current(u, min_edge);
        true
    }
}
