// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Solve orchestration.
//!
//! A run alternates discharge phases with global relabels: the scheduler
//! drains the active-vertex bag until either the bag empties (done) or the
//! accumulated work trips the relabel interval, in which case the heights
//! are rebuilt from the sink and the bag is re-seeded with the surviving
//! active set. Termination is the empty re-seed.

mod det;
mod discharge;
mod nondet;
mod preflow;
mod relabel;

use std::time::Instant;

use tracing::{debug, info};

use crate::config::{DetMode, SolverConfig};
use crate::error::{FlowError, Result};
use crate::graph::{NodeIndex, ResidualGraph};
use crate::stats::{SolverStats, StatsSnapshot};

/// Shared per-run context threaded through every phase.
#[derive(Clone, Copy)]
pub(crate) struct EngineContext<'a> {
    pub(crate) graph: &'a ResidualGraph,
    pub(crate) source: NodeIndex,
    pub(crate) sink: NodeIndex,
    pub(crate) stats: &'a SolverStats,
}

/// Per-vertex `(height, excess)` state captured after a global relabel.
pub type RelabelSnapshot = Vec<(u32, i64)>;

pub struct FlowSummary {
    /// The maximum flow value, `excess(sink)` at termination.
    pub max_flow: i64,
    pub stats: StatsSnapshot,
    /// One snapshot per global relabel when
    /// [`SolverConfig::record_snapshots`] is set; empty otherwise.
    pub snapshots: Vec<RelabelSnapshot>,
}

/// Compute the maximum `source`-`sink` flow of `graph`.
///
/// The graph's mutable state (excess, height, current, residual
/// capacities) is left at its termination values so the flow assignment
/// can be read back edge by edge against
/// [`ResidualGraph::initial_capacity`].
pub fn solve(
    graph: &ResidualGraph,
    source: NodeIndex,
    sink: NodeIndex,
    config: &SolverConfig,
) -> Result<FlowSummary> {
    let n = graph.node_count();
    if source as usize >= n || sink as usize >= n {
        return Err(FlowError::InvalidInput {
            message: format!("source {source} or sink {sink} outside 0..{n}"),
        });
    }
    if source == sink {
        return Err(FlowError::InvalidInput {
            message: format!("source and sink are both {source}"),
        });
    }

    let workers = config.workers.max(1);
    let interval = config.resolved_interval(n, graph.edge_count());
    info!(
        nodes = n,
        edges = graph.edge_count(),
        ?interval,
        workers,
        "starting preflow-push"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| FlowError::InvalidInput {
            message: format!("worker pool: {e}"),
        })?;

    let stats = SolverStats::default();
    let ctx = EngineContext {
        graph,
        source,
        sink,
        stats: &stats,
    };

    let mut active = Vec::new();
    preflow::initialize(&ctx, &mut active);

    let mut snapshots = Vec::new();
    while !active.is_empty() {
        let started = Instant::now();
        let relabel_requested = match config.det {
            DetMode::NonDet => {
                nondet::run_phase(&ctx, config.order, workers, interval, &mut active)
            }
            DetMode::DetBase | DetMode::DetDisjoint => {
                det::run_phase(&ctx, config.det, interval, &pool, &mut active)
            }
        };
        stats.record_discharge_phase(started.elapsed());

        if !relabel_requested {
            break;
        }

        let started = Instant::now();
        relabel::global_relabel(&ctx, &pool, &mut active);
        stats.record_global_relabel(started.elapsed());

        if config.record_snapshots {
            snapshots.push(capture_snapshot(graph));
        }
        info!(flow = graph.excess(sink), "flow after global relabel");
    }

    let summary = FlowSummary {
        max_flow: graph.excess(sink),
        stats: stats.snapshot(),
        snapshots,
    };
    debug!(
        flow = summary.max_flow,
        discharges = summary.stats.discharges,
        global_relabels = summary.stats.global_relabels,
        "solve finished"
    );
    Ok(summary)
}

fn capture_snapshot(graph: &ResidualGraph) -> RelabelSnapshot {
    (0..graph.node_count() as NodeIndex)
        .map(|u| (graph.height(u), graph.excess(u)))
        .collect()
}
