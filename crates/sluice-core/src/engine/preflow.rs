// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Preflow initialization: lift the source to `n` and saturate every
//! outgoing source edge.

use crate::engine::EngineContext;
use crate::graph::NodeIndex;

/// Saturate all source-incident edges and collect the initial active set
/// (in adjacency order, which is ascending id). The source's excess goes
/// negative by the total pushed amount.
pub(crate) fn initialize(ctx: &EngineContext<'_>, active: &mut Vec<NodeIndex>) {
    let graph = ctx.graph;
    graph.set_height(ctx.source, graph.node_count() as u32);

    let (start, end) = graph.edge_range(ctx.source);
    for edge in start..end {
        let capacity = graph.capacity(edge) as i64;
        if capacity == 0 {
            continue;
        }
        let v = graph.dst(edge);

        graph.push(ctx.source, v, edge, capacity);
        graph.add_excess(v, capacity);
        graph.add_excess(ctx.source, -capacity);
        ctx.stats.record_push();

        if v != ctx.sink {
            active.push(v);
        }
    }
}
