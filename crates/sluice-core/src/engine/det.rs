// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Deterministic schedulers: bulk-synchronous speculate/commit rounds.
//!
//! Each round speculates every pending iteration by gathering its write set
//! (the closed neighborhood of the vertex), then commits a conflict-free
//! subset chosen greedily by ascending vertex id. Conflicting iterations
//! abort and retry in the next round; newly activated vertices join it.
//! The committed sequence is a function of the input and the relabel
//! interval only, independent of worker count, so runs are bit-identical.
//!
//! `det_base` applies committed discharges serially in selection order;
//! `det_disjoint` applies them in parallel. Their write sets are disjoint,
//! so the two produce identical state.

use rayon::prelude::*;

use crate::config::{DetMode, BETA};
use crate::engine::EngineContext;
use crate::graph::NodeIndex;

pub(crate) fn run_phase(
    ctx: &EngineContext<'_>,
    mode: DetMode,
    interval: Option<u64>,
    pool: &rayon::ThreadPool,
    round: &mut Vec<NodeIndex>,
) -> bool {
    debug_assert!(round.windows(2).all(|w| w[0] < w[1]));

    let mut claimed = vec![false; ctx.graph.node_count()];
    let mut work: u64 = 0;

    while !round.is_empty() {
        // Speculate: gather write sets without touching shared state.
        let write_sets: Vec<Vec<NodeIndex>> = pool.install(|| {
            round
                .par_iter()
                .map(|&u| closed_neighborhood(ctx, u))
                .collect()
        });

        // Commit selection, greedy in id order: an iteration wins iff its
        // write set is untouched by every earlier winner of this round.
        let mut selected: Vec<usize> = Vec::new();
        let mut retry: Vec<NodeIndex> = Vec::new();
        for (i, &u) in round.iter().enumerate() {
            if write_sets[i].iter().any(|&w| claimed[w as usize]) {
                retry.push(u);
                ctx.stats.record_abort();
            } else {
                for &w in &write_sets[i] {
                    claimed[w as usize] = true;
                }
                selected.push(i);
            }
        }

        let committed: Vec<(Vec<NodeIndex>, bool)> = match mode {
            DetMode::DetBase => selected.iter().map(|&i| apply(ctx, round[i])).collect(),
            DetMode::DetDisjoint => pool.install(|| {
                selected
                    .par_iter()
                    .map(|&i| apply(ctx, round[i]))
                    .collect()
            }),
            DetMode::NonDet => unreachable!("nondet runs in the speculative scheduler"),
        };

        for &i in &selected {
            for &w in &write_sets[i] {
                claimed[w as usize] = false;
            }
        }

        // Aborted iterations keep their excess (commits only add to their
        // neighbors), and activations are fresh zero-to-positive vertices,
        // so the union is duplicate-free.
        let mut next = retry;
        for (activations, relabeled) in committed {
            ctx.stats.record_discharge();
            work += if relabeled { 1 + BETA } else { 1 };
            next.extend(activations);
        }
        next.sort_unstable();
        *round = next;

        if let Some(interval) = interval {
            if work >= interval {
                round.clear();
                return true;
            }
        }
    }

    false
}

fn closed_neighborhood(ctx: &EngineContext<'_>, u: NodeIndex) -> Vec<NodeIndex> {
    let mut set: Vec<NodeIndex> = ctx.graph.neighbors(u).map(|(_, v)| v).collect();
    set.push(u);
    set
}

fn apply(ctx: &EngineContext<'_>, u: NodeIndex) -> (Vec<NodeIndex>, bool) {
    let mut activations = Vec::new();
    let relabeled = ctx.discharge(u, |v| activations.push(v));
    (activations, relabeled)
}
