// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! DIMACS max-flow file loader.
//!
//! The on-disk format is the classic DIMACS network flow exchange format:
//!
//! ```text
//! c  comment
//! p max <nodes> <arcs>
//! n <id> s            (optional source descriptor)
//! n <id> t            (optional sink descriptor)
//! a <src> <dst> <capacity>
//! ```
//!
//! DIMACS vertex ids are one-based; they are mapped to zero-based node
//! indices here, and the returned source/sink hints are already mapped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::SolverConfig;
use crate::error::{FlowError, Result};
use crate::graph::builder::GraphBuilder;
use crate::graph::{NodeIndex, ResidualGraph};

/// A loaded, symmetrized graph plus any terminal descriptors found in the
/// file. Callers may override the hints with explicit ids.
#[derive(Debug)]
pub struct LoadedNetwork {
    pub graph: ResidualGraph,
    pub source: Option<NodeIndex>,
    pub sink: Option<NodeIndex>,
}

pub fn load_dimacs(path: &Path, config: &SolverConfig) -> Result<LoadedNetwork> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut builder: Option<GraphBuilder> = None;
    let mut node_count = 0usize;
    let mut source = None;
    let mut sink = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let mut fields = line.split_ascii_whitespace();

        match fields.next() {
            None | Some("c") => continue,

            Some("p") => {
                if builder.is_some() {
                    return Err(parse_error(line_no, "duplicate problem line"));
                }
                if fields.next() != Some("max") {
                    return Err(parse_error(line_no, "expected 'p max <nodes> <arcs>'"));
                }
                node_count = parse_field(line_no, fields.next(), "node count")?;
                let _declared_arcs: usize = parse_field(line_no, fields.next(), "arc count")?;
                if node_count == 0 {
                    return Err(parse_error(line_no, "graph has no vertices"));
                }
                builder = Some(
                    GraphBuilder::new(node_count)
                        .unit_capacity(config.unit_capacity)
                        .symmetric(config.symmetric_input),
                );
            }

            Some("n") => {
                if builder.is_none() {
                    return Err(parse_error(line_no, "node descriptor before problem line"));
                }
                let id = parse_vertex(line_no, fields.next(), node_count)?;
                match fields.next() {
                    Some("s") => source = Some(id),
                    Some("t") => sink = Some(id),
                    other => {
                        return Err(parse_error(
                            line_no,
                            format!("expected 's' or 't', got {other:?}"),
                        ));
                    }
                }
            }

            Some("a") => {
                let Some(builder) = builder.as_mut() else {
                    return Err(parse_error(line_no, "arc before problem line"));
                };
                let u = parse_vertex(line_no, fields.next(), node_count)?;
                let v = parse_vertex(line_no, fields.next(), node_count)?;
                let capacity: u32 = parse_field(line_no, fields.next(), "capacity")?;
                builder.add_edge(u, v, capacity)?;
            }

            Some(other) => {
                return Err(parse_error(
                    line_no,
                    format!("unknown line designator '{other}'"),
                ));
            }
        }
    }

    let Some(builder) = builder else {
        return Err(FlowError::InvalidInput {
            message: "file contains no problem line".into(),
        });
    };

    Ok(LoadedNetwork {
        graph: builder.build()?,
        source,
        sink,
    })
}

fn parse_error(line: usize, message: impl Into<String>) -> FlowError {
    FlowError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    field: Option<&str>,
    what: &str,
) -> Result<T> {
    let raw = field.ok_or_else(|| parse_error(line, format!("missing {what}")))?;
    raw.parse()
        .map_err(|_| parse_error(line, format!("invalid {what} '{raw}'")))
}

/// Parse a one-based DIMACS vertex id into a zero-based node index.
fn parse_vertex(line: usize, field: Option<&str>, node_count: usize) -> Result<NodeIndex> {
    let id: u64 = parse_field(line, field, "vertex id")?;
    if id == 0 || id > node_count as u64 {
        return Err(parse_error(
            line,
            format!("vertex id {id} outside 1..={node_count}"),
        ));
    }
    Ok((id - 1) as NodeIndex)
}
