// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! End-to-end scenarios through the DIMACS loader.

use std::io::Write;

use sluice_core::{load_dimacs, solve, verify, DetMode, OrderMode, SolverConfig};

fn write_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const DIAMOND: &str = "c diamond network\n\
                       p max 4 5\n\
                       n 1 s\n\
                       n 4 t\n\
                       a 1 2 3\n\
                       a 1 3 2\n\
                       a 2 4 2\n\
                       a 3 4 3\n\
                       a 2 3 1\n";

#[test]
fn diamond_flows_five_in_every_mode() {
    let file = write_file(DIAMOND);

    for (det, order, workers) in [
        (DetMode::NonDet, OrderMode::Fifo, 1),
        (DetMode::NonDet, OrderMode::Fifo, 4),
        (DetMode::NonDet, OrderMode::HighestLabel, 2),
        (DetMode::DetBase, OrderMode::Fifo, 2),
        (DetMode::DetDisjoint, OrderMode::Fifo, 4),
    ] {
        let config = SolverConfig {
            det,
            order,
            workers,
            ..SolverConfig::default()
        };
        let network = load_dimacs(file.path(), &config).unwrap();
        let source = network.source.unwrap();
        let sink = network.sink.unwrap();

        let summary = solve(&network.graph, source, sink, &config).unwrap();
        assert_eq!(summary.max_flow, 5, "{det:?}/{order:?}/{workers}");
        verify(&network.graph, source, sink).unwrap();

        // Nothing is trapped in this network, so the sink's gain is
        // exactly the source's loss.
        assert_eq!(network.graph.excess(source), -5);
        assert_eq!(network.graph.excess(sink), 5);
    }
}

#[test]
fn bottleneck_keeps_trapped_excess_off_the_flow_value() {
    let file = write_file(
        "p max 4 3\n\
         n 1 s\n\
         n 4 t\n\
         a 1 2 10\n\
         a 2 3 1\n\
         a 3 4 10\n",
    );
    let config = SolverConfig::default();
    let network = load_dimacs(file.path(), &config).unwrap();
    let summary = solve(&network.graph, 0, 3, &config).unwrap();

    assert_eq!(summary.max_flow, 1);
    // Nine units never reach the sink; they sit at vertex 1 at height n.
    assert_eq!(network.graph.excess(1), 9);
    assert_eq!(network.graph.height(1), 4);
    verify(&network.graph, 0, 3).unwrap();
}

#[test]
fn unit_capacity_bipartite_matching() {
    // K_{3,3}: source 1, left {2,3,4}, right {5,6,7}, sink 8 (DIMACS ids).
    let mut contents = String::from("p max 8 15\nn 1 s\nn 8 t\n");
    for left in 2..=4 {
        contents.push_str(&format!("a 1 {left} 9\n"));
        for right in 5..=7 {
            contents.push_str(&format!("a {left} {right} 9\n"));
        }
    }
    for right in 5..=7 {
        contents.push_str(&format!("a {right} 8 9\n"));
    }
    let file = write_file(&contents);

    // --unit-capacity turns the 9s into 1s: a perfect matching of size 3.
    let config = SolverConfig {
        unit_capacity: true,
        ..SolverConfig::default()
    };
    let network = load_dimacs(file.path(), &config).unwrap();
    let summary = solve(&network.graph, 0, 7, &config).unwrap();
    assert_eq!(summary.max_flow, 3);
    verify(&network.graph, 0, 7).unwrap();
}

#[test]
fn disconnected_sink_flows_zero() {
    let file = write_file("p max 3 1\nn 1 s\nn 3 t\na 1 2 4\n");
    let config = SolverConfig::default();
    let network = load_dimacs(file.path(), &config).unwrap();

    let summary = solve(&network.graph, 0, 2, &config).unwrap();
    assert_eq!(summary.max_flow, 0);
    verify(&network.graph, 0, 2).unwrap();
}

#[test]
fn explicit_terminals_override_file_hints() {
    let file = write_file(DIAMOND);
    let config = SolverConfig::default();
    let network = load_dimacs(file.path(), &config).unwrap();

    // Solve the sub-problem from vertex 1 instead of the declared source.
    let summary = solve(&network.graph, 1, 3, &config).unwrap();
    assert_eq!(summary.max_flow, 3); // 2 direct + 1 through vertex 2
    verify(&network.graph, 1, 3).unwrap();
}

#[test]
fn relabel_interval_of_one_still_converges() {
    let file = write_file(DIAMOND);
    let config = SolverConfig {
        relabel_interval: 1,
        workers: 2,
        ..SolverConfig::default()
    };
    let network = load_dimacs(file.path(), &config).unwrap();
    let summary = solve(&network.graph, 0, 3, &config).unwrap();

    assert_eq!(summary.max_flow, 5);
    assert!(summary.stats.global_relabels > 0);
    verify(&network.graph, 0, 3).unwrap();
}
