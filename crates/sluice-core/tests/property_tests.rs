// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Property-based tests for the max-flow engine.
//!
//! Uses proptest to check the solver against a sequential Edmonds-Karp
//! reference and to verify the structural invariants across randomly
//! generated capacitated networks.

use std::collections::VecDeque;

use proptest::prelude::*;
use sluice_core::{from_edges, solve, verify, DetMode, OrderMode, SolverConfig};

// -----------------------------------------------------------------------------
// Sequential reference: Edmonds-Karp on an adjacency matrix
// -----------------------------------------------------------------------------

fn edmonds_karp(n: usize, edges: &[(u32, u32, u32)], source: usize, sink: usize) -> i64 {
    let mut cap = vec![vec![0i64; n]; n];
    for &(u, v, c) in edges {
        if u != v {
            cap[u as usize][v as usize] += c as i64;
        }
    }

    let mut flow = 0i64;
    loop {
        let mut parent = vec![usize::MAX; n];
        parent[source] = source;
        let mut queue = VecDeque::from([source]);
        while let Some(u) = queue.pop_front() {
            for v in 0..n {
                if parent[v] == usize::MAX && cap[u][v] > 0 {
                    parent[v] = u;
                    queue.push_back(v);
                }
            }
        }
        if parent[sink] == usize::MAX {
            return flow;
        }

        let mut bottleneck = i64::MAX;
        let mut v = sink;
        while v != source {
            let u = parent[v];
            bottleneck = bottleneck.min(cap[u][v]);
            v = u;
        }
        let mut v = sink;
        while v != source {
            let u = parent[v];
            cap[u][v] -= bottleneck;
            cap[v][u] += bottleneck;
            v = u;
        }
        flow += bottleneck;
    }
}

// -----------------------------------------------------------------------------
// Strategies
// -----------------------------------------------------------------------------

/// Random capacitated network: vertex count plus an arbitrary arc list
/// (self-loops and duplicates included; the builder normalizes both).
fn network_strategy() -> impl Strategy<Value = (usize, Vec<(u32, u32, u32)>)> {
    (3usize..10).prop_flat_map(|n| {
        let arc = (0..n as u32, 0..n as u32, 0u32..40);
        (Just(n), proptest::collection::vec(arc, 0..30))
    })
}

fn scheduler_cases() -> [(DetMode, OrderMode, usize); 5] {
    [
        (DetMode::NonDet, OrderMode::Fifo, 1),
        (DetMode::NonDet, OrderMode::Fifo, 4),
        (DetMode::NonDet, OrderMode::HighestLabel, 2),
        (DetMode::DetBase, OrderMode::Fifo, 2),
        (DetMode::DetDisjoint, OrderMode::Fifo, 4),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The computed value equals the sequential reference for every
    /// scheduler mode, ordering, and worker count, and the terminal state
    /// passes the full verifier (heights, conservation, no augmenting
    /// path).
    #[test]
    fn flow_matches_edmonds_karp((n, edges) in network_strategy()) {
        let source = 0u32;
        let sink = n as u32 - 1;
        let expected = edmonds_karp(n, &edges, 0, n - 1);

        for (det, order, workers) in scheduler_cases() {
            let graph = from_edges(n, &edges).unwrap();
            let config = SolverConfig {
                det,
                order,
                workers,
                ..SolverConfig::default()
            };
            let summary = solve(&graph, source, sink, &config).unwrap();
            prop_assert_eq!(
                summary.max_flow, expected,
                "{:?}/{:?}/{} workers", det, order, workers
            );
            verify(&graph, source, sink).unwrap();
        }
    }

    /// The sum of paired residual capacities never changes.
    #[test]
    fn pair_capacity_is_invariant((n, edges) in network_strategy()) {
        let graph = from_edges(n, &edges).unwrap();
        let sink = n as u32 - 1;
        solve(&graph, 0, sink, &SolverConfig::default()).unwrap();

        for u in 0..n as u32 {
            for (edge, v) in graph.neighbors(u) {
                if u < v {
                    let reverse = graph.find_edge(v, u);
                    prop_assert_eq!(
                        graph.capacity(edge) as u64 + graph.capacity(reverse) as u64,
                        graph.initial_capacity(edge) as u64
                            + graph.initial_capacity(reverse) as u64
                    );
                }
            }
        }
    }

    /// Deterministic modes produce identical relabel snapshot sequences
    /// regardless of worker count and of base-versus-disjoint execution.
    #[test]
    fn deterministic_snapshots_are_stable(
        (n, edges) in network_strategy(),
        interval in 1i64..6,
    ) {
        let sink = n as u32 - 1;
        let cases = [
            (DetMode::DetBase, 1),
            (DetMode::DetBase, 4),
            (DetMode::DetDisjoint, 1),
            (DetMode::DetDisjoint, 4),
        ];

        let mut results = Vec::new();
        for (det, workers) in cases {
            let graph = from_edges(n, &edges).unwrap();
            let config = SolverConfig {
                det,
                workers,
                relabel_interval: interval,
                record_snapshots: true,
                ..SolverConfig::default()
            };
            let summary = solve(&graph, 0, sink, &config).unwrap();
            results.push((summary.max_flow, summary.snapshots));
        }

        for (result, (det, workers)) in results.iter().zip(cases).skip(1) {
            prop_assert_eq!(
                &results[0], result,
                "{:?} with {} workers diverged", det, workers
            );
        }
    }

    /// At termination every live non-terminal is drained, and all excess
    /// in the system balances to zero.
    #[test]
    fn terminal_excess_balances((n, edges) in network_strategy()) {
        let graph = from_edges(n, &edges).unwrap();
        let sink = n as u32 - 1;
        solve(&graph, 0, sink, &SolverConfig::default()).unwrap();

        let height_n = graph.node_count() as u32;
        let mut total = 0i64;
        for u in 0..n as u32 {
            total += graph.excess(u);
            if u != 0 && u != sink {
                prop_assert!(graph.excess(u) == 0 || graph.height(u) == height_n);
            }
        }
        prop_assert_eq!(total, 0);
    }
}
