// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use std::path::PathBuf;

use sluice_core::{
    load_dimacs, solve, verify, DetMode, NodeIndex, OrderMode, SolverConfig,
};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Parallel preflow-push maximum flow", long_about = None)]
struct Cli {
    /// DIMACS max-flow input file
    input: PathBuf,

    /// Source vertex (zero-based; defaults to the file's 'n ... s' line)
    source: Option<NodeIndex>,

    /// Sink vertex (zero-based; defaults to the file's 'n ... t' line)
    sink: Option<NodeIndex>,

    /// Use the highest-label ordering heuristic instead of FIFO
    #[arg(long)]
    hl_order: bool,

    /// Treat every edge capacity as 1
    #[arg(long)]
    unit_capacity: bool,

    /// Assume the input is already symmetric with unit capacities
    #[arg(long)]
    symmetric: bool,

    /// Relabel interval: < 0 disables global relabeling, 0 uses the
    /// default interval, > 0 relabels every N work units
    #[arg(long, default_value_t = 0)]
    relabel: i64,

    /// Scheduler execution mode
    #[arg(long, value_enum, default_value = "nondet")]
    det: DetArg,

    /// Worker thread count (defaults to available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    /// Skip result verification
    #[arg(long)]
    skip_verify: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DetArg {
    /// Non-deterministic speculative execution
    Nondet,
    /// Deterministic, serial commit order
    Base,
    /// Deterministic, disjoint parallel commits
    Disjoint,
}

impl From<DetArg> for DetMode {
    fn from(arg: DetArg) -> Self {
        match arg {
            DetArg::Nondet => DetMode::NonDet,
            DetArg::Base => DetMode::DetBase,
            DetArg::Disjoint => DetMode::DetDisjoint,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let mut config = SolverConfig {
        order: if cli.hl_order {
            OrderMode::HighestLabel
        } else {
            OrderMode::Fifo
        },
        det: cli.det.into(),
        relabel_interval: cli.relabel,
        unit_capacity: cli.unit_capacity,
        symmetric_input: cli.symmetric,
        ..SolverConfig::default()
    };
    if let Some(threads) = cli.threads {
        config.workers = threads;
    }

    let network = load_dimacs(&cli.input, &config)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    let source = cli
        .source
        .or(network.source)
        .context("no source: pass it on the command line or add an 'n <id> s' line")?;
    let sink = cli
        .sink
        .or(network.sink)
        .context("no sink: pass it on the command line or add an 'n <id> t' line")?;

    let graph = &network.graph;
    println!("number of nodes: {}", graph.node_count());
    match config.resolved_interval(graph.node_count(), graph.edge_count()) {
        Some(interval) => println!("global relabel interval: {interval}"),
        None => println!("global relabel disabled"),
    }

    let summary = solve(graph, source, sink, &config)?;
    println!("Flow is {}", summary.max_flow);
    println!(
        "{} discharges, {} relabels, {} global relabels, {} aborts",
        summary.stats.discharges,
        summary.stats.relabels,
        summary.stats.global_relabels,
        summary.stats.aborts,
    );
    println!(
        "discharge time {:?}, global relabel time {:?}",
        summary.stats.discharge_time, summary.stats.global_relabel_time,
    );

    if !cli.skip_verify {
        verify(graph, source, sink).context("result verification failed")?;
        println!("{} flow verified", "Success:".green());
    }

    Ok(())
}
