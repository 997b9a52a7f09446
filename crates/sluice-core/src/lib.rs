// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Parallel preflow-push maximum flow.
//!
//! Computes the maximum s-t flow of a directed capacitated graph with the
//! push-relabel method and the Goldberg-Tarjan global-relabel heuristic.
//! Concurrent workers speculatively discharge active vertices under
//! per-vertex exclusion; two deterministic schedulers trade throughput for
//! run-to-run reproducibility.

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod stats;
pub mod verify;

pub use config::{DetMode, OrderMode, SolverConfig, ALPHA, BETA};
pub use engine::{solve, FlowSummary, RelabelSnapshot};
pub use error::{FlowError, Result};
pub use graph::builder::{from_edges, GraphBuilder};
pub use graph::loader::{load_dimacs, LoadedNetwork};
pub use graph::{NodeIndex, ResidualGraph};
pub use stats::StatsSnapshot;
pub use verify::verify;
