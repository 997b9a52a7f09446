// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Post-run verification.
//!
//! Three checks against the initial-capacity snapshot, each fatal to the
//! result if violated: the height function property, flow conservation at
//! every non-terminal vertex, and the absence of a residual augmenting
//! path from source to sink.

use std::collections::VecDeque;

use crate::error::{FlowError, Result};
use crate::graph::{NodeIndex, ResidualGraph};

pub fn verify(graph: &ResidualGraph, source: NodeIndex, sink: NodeIndex) -> Result<()> {
    check_heights(graph)?;
    check_conservation(graph, source, sink)?;
    check_augmenting_path(graph, source, sink)
}

/// No residual edge may climb more than one level:
/// `capacity(u, v) > 0` implies `height(u) <= height(v) + 1`.
fn check_heights(graph: &ResidualGraph) -> Result<()> {
    for u in 0..graph.node_count() as NodeIndex {
        let hu = graph.height(u);
        for (edge, v) in graph.neighbors(u) {
            if graph.capacity(edge) > 0 && hu > graph.height(v) + 1 {
                return Err(FlowError::InvariantViolation {
                    message: format!(
                        "height violated at vertex {u} (height {hu}, excess {}): \
                         residual edge to {v} at height {}",
                        graph.excess(u),
                        graph.height(v)
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Every non-terminal vertex must hold exactly the flow it absorbed:
/// `excess(v) = sum over v's edges of (capacity_now - capacity_initial)`.
/// Excess may remain only on vertices lifted to height `n` (preflow trapped
/// at a vertex the sink can no longer be reached from); all vertices
/// together must sum to zero.
fn check_conservation(graph: &ResidualGraph, source: NodeIndex, sink: NodeIndex) -> Result<()> {
    let n = graph.node_count() as u32;
    let mut total: i64 = 0;

    for u in 0..graph.node_count() as NodeIndex {
        let excess = graph.excess(u);
        total += excess;
        if u == source || u == sink {
            continue;
        }

        if excess != 0 && graph.height(u) < n {
            return Err(FlowError::InvariantViolation {
                message: format!(
                    "non-zero excess {excess} at live vertex {u} (height {})",
                    graph.height(u)
                ),
            });
        }

        let absorbed: i64 = graph
            .neighbors(u)
            .map(|(edge, _)| graph.capacity(edge) as i64 - graph.initial_capacity(edge) as i64)
            .sum();
        if excess != absorbed {
            return Err(FlowError::InvariantViolation {
                message: format!(
                    "not a preflow at vertex {u}: excess {excess} != absorbed {absorbed}"
                ),
            });
        }
    }

    if total != 0 {
        return Err(FlowError::InvariantViolation {
            message: format!("excess does not balance: total {total}"),
        });
    }
    Ok(())
}

/// Plain BFS from the source over residual-positive edges; reaching the
/// sink means the flow is not maximum.
fn check_augmenting_path(graph: &ResidualGraph, source: NodeIndex, sink: NodeIndex) -> Result<()> {
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();
    visited[source as usize] = true;
    queue.push_back(source);

    while let Some(u) = queue.pop_front() {
        for (edge, v) in graph.neighbors(u) {
            if graph.capacity(edge) > 0 && !visited[v as usize] {
                if v == sink {
                    return Err(FlowError::InvariantViolation {
                        message: format!("augmenting path exists (reached sink via {u})"),
                    });
                }
                visited[v as usize] = true;
                queue.push_back(v);
            }
        }
    }
    Ok(())
}
