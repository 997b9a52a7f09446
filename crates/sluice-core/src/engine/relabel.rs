// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Global relabel: rebuild exact heights as BFS distances from the sink in
//! the residual graph, then re-discover the active set.
//!
//! Runs as a barrier between discharge phases; the graph is quiescent for
//! its whole duration. The reverse BFS is bulk-synchronous: each wave
//! settles one distance level, and the strictly-smaller CAS in
//! [`ResidualGraph::lower_height`] makes the resulting heights independent
//! of which writer wins a same-wave race.

use rayon::prelude::*;

use crate::engine::EngineContext;
use crate::graph::NodeIndex;

pub(crate) fn global_relabel(
    ctx: &EngineContext<'_>,
    pool: &rayon::ThreadPool,
    active: &mut Vec<NodeIndex>,
) {
    let graph = ctx.graph;
    let n = graph.node_count() as u32;

    // Reset: everything unreachable until proven otherwise. The discharge
    // cursor restarts with the new heights, which is what keeps the
    // current-edge amortization sound.
    pool.install(|| {
        (0..n).into_par_iter().for_each(|u| {
            graph.set_height(u, if u == ctx.sink { 0 } else { n });
            graph.set_current(u, 0);
        });
    });

    // Reverse BFS from the sink. `v` precedes `u` iff the residual arc
    // (v, u) has capacity, observed from `u` through the paired edge. The
    // source keeps its height of n no matter what flows back into it.
    let mut frontier = vec![ctx.sink];
    while !frontier.is_empty() {
        let next_height = graph.height(frontier[0]) + 1;
        frontier = pool.install(|| {
            frontier
                .par_iter()
                .flat_map_iter(|&u| {
                    let mut discovered = Vec::new();
                    for (_, v) in graph.neighbors(u) {
                        if v == ctx.source {
                            continue;
                        }
                        let reverse = graph.find_edge(v, u);
                        if graph.capacity(reverse) > 0 && graph.lower_height(v, next_height) {
                            discovered.push(v);
                        }
                    }
                    discovered.into_iter()
                })
                .collect()
        });
    }

    // Re-discover work: vertices still holding excess at a live height.
    active.clear();
    let mut found: Vec<NodeIndex> = pool.install(|| {
        (0..n)
            .into_par_iter()
            .filter(|&u| {
                u != ctx.source
                    && u != ctx.sink
                    && graph.excess(u) > 0
                    && graph.height(u) > 0
                    && graph.height(u) < n
            })
            .collect()
    });
    // Ascending id; the re-seed order is part of the deterministic contract.
    found.sort_unstable();
    *active = found;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::from_edges;
    use crate::stats::SolverStats;

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_heights_become_bfs_distances() {
        // Path 0 -> 1 -> 2 -> 3 with full residual capacity everywhere.
        let graph = from_edges(4, &[(0, 1, 2), (1, 2, 2), (2, 3, 2)]).unwrap();
        let stats = SolverStats::default();
        let ctx = EngineContext {
            graph: &graph,
            source: 0,
            sink: 3,
            stats: &stats,
        };

        let mut active = Vec::new();
        global_relabel(&ctx, &pool(), &mut active);

        assert_eq!(graph.height(3), 0);
        assert_eq!(graph.height(2), 1);
        assert_eq!(graph.height(1), 2);
        assert_eq!(graph.height(0), 4, "source height stays at n");
        assert!(active.is_empty());
    }

    #[test]
    fn test_saturated_edges_block_the_bfs() {
        let graph = from_edges(3, &[(0, 1, 2), (1, 2, 2)]).unwrap();
        let e = graph.find_edge(1, 2);
        graph.push(1, 2, e, 2); // saturate 1 -> 2

        let stats = SolverStats::default();
        let ctx = EngineContext {
            graph: &graph,
            source: 0,
            sink: 2,
            stats: &stats,
        };

        let mut active = Vec::new();
        global_relabel(&ctx, &pool(), &mut active);

        // 1 cannot reach the sink any more; it stays at n.
        assert_eq!(graph.height(1), 3);
    }

    #[test]
    fn test_finds_active_vertices_sorted() {
        let graph = from_edges(5, &[(0, 3, 4), (0, 1, 4), (1, 4, 1), (3, 4, 1)]).unwrap();
        for e in [(0u32, 3u32), (0, 1)] {
            let edge = graph.find_edge(e.0, e.1);
            graph.push(e.0, e.1, edge, 4);
        }
        graph.add_excess(1, 4);
        graph.add_excess(3, 4);

        let stats = SolverStats::default();
        let ctx = EngineContext {
            graph: &graph,
            source: 0,
            sink: 4,
            stats: &stats,
        };

        let mut active = vec![99];
        global_relabel(&ctx, &pool(), &mut active);
        assert_eq!(active, vec![1, 3]);
        for u in [1u32, 3] {
            assert_eq!(graph.height(u), 1);
            assert_eq!(graph.current(u), 0, "cursor reset by global relabel");
        }
    }
}
