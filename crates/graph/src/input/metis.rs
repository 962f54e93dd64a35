//! The adjacency text format shared by METIS-style graph partitioners.
//!
//! The first content line is `n m [fmt]`, where `fmt` is a bit string:
//! `1` marks interleaved edge weights, `10` marks leading node weights,
//! `11` both. Each of the following `n` lines lists the neighbors of node
//! `i` with 1-based ids; `%` starts a comment line. Every undirected edge
//! appears in the adjacency list of both endpoints.

use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use super::{map_file, parse_number, tokens, LineScanner};
use crate::{CsrGraph, Error};

/// Reads a graph from an adjacency file, including weights if present.
pub fn read_graph<P: AsRef<Path>>(path: P) -> Result<CsrGraph, Error> {
    let start = std::time::Instant::now();
    let mmap = map_file(path.as_ref())?;
    let graph = parse_graph(&mmap)?;
    info!(
        "Read graph from {:?} in {:?}",
        path.as_ref(),
        start.elapsed()
    );
    Ok(graph)
}

pub fn parse_graph(bytes: &[u8]) -> Result<CsrGraph, Error> {
    let mut scanner = LineScanner::new(bytes);

    let header = scanner
        .next_content_line()
        .ok_or_else(|| Error::MalformedGraph {
            line: 0,
            message: "missing header line".to_string(),
        })?;
    let mut fields = tokens(header);
    let node_count = expect_number(fields.next(), &scanner, "node count")?;
    let undirected_edges = expect_number(fields.next(), &scanner, "edge count")?;
    let format = match fields.next() {
        Some(token) => parse_number(token, scanner.line())?,
        None => 0,
    };
    let has_edge_weights = format % 10 == 1;
    let has_node_weights = (format / 10) % 10 == 1;

    let edge_count = 2 * undirected_edges;
    let mut builder = CsrGraph::start_construction(node_count, edge_count);
    let mut edges_read = 0;

    for _ in 0..node_count {
        let line = scanner.next_data_line().ok_or_else(|| Error::MalformedGraph {
            line: scanner.line(),
            message: format!("expected {node_count} adjacency lines"),
        })?;
        let line_number = scanner.line();
        let node = builder.new_node();

        let mut fields = tokens(line);
        if has_node_weights {
            let weight = expect_number(fields.next(), &scanner, "node weight")?;
            builder.set_node_weight(node, weight as i64);
        }

        while let Some(token) = fields.next() {
            let target = parse_number(token, line_number)?;
            if target == 0 || target > node_count {
                return Err(Error::MalformedGraph {
                    line: line_number,
                    message: format!("neighbor id {target} is out of range"),
                });
            }
            if edges_read == edge_count {
                return Err(Error::MalformedGraph {
                    line: line_number,
                    message: format!("more than {undirected_edges} edges listed"),
                });
            }
            let edge = builder.new_edge(node, target - 1);
            edges_read += 1;

            if has_edge_weights {
                let weight = expect_number(fields.next(), &scanner, "edge weight")?;
                builder.set_edge_weight(edge, weight as i64);
            }
        }
    }

    if edges_read != edge_count {
        return Err(Error::MalformedGraph {
            line: scanner.line(),
            message: format!(
                "header declares {undirected_edges} edges but {edges_read} directed entries were listed"
            ),
        });
    }

    Ok(builder.finish_construction())
}

fn expect_number(
    token: Option<&[u8]>,
    scanner: &LineScanner<'_>,
    what: &str,
) -> Result<usize, Error> {
    match token {
        Some(token) => parse_number(token, scanner.line()),
        None => Err(Error::MalformedGraph {
            line: scanner.line(),
            message: format!("missing {what}"),
        }),
    }
}

/// Writes the topology of `graph` without weights.
pub fn write_graph<P: AsRef<Path>>(graph: &CsrGraph, path: P) -> Result<(), Error> {
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    writeln!(writer, "{} {}", graph.node_count(), graph.edge_count() / 2)?;
    for node in 0..graph.node_count() {
        let mut separator = "";
        for &neighbor in graph.neighbors(node) {
            write!(writer, "{separator}{}", neighbor + 1)?;
            separator = " ";
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `graph` with node and edge weights (`fmt` 11).
pub fn write_graph_weighted<P: AsRef<Path>>(graph: &CsrGraph, path: P) -> Result<(), Error> {
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    writeln!(writer, "{} {} 11", graph.node_count(), graph.edge_count() / 2)?;
    for node in 0..graph.node_count() {
        write!(writer, "{}", graph.node_weight(node))?;
        for edge in graph.first_edge(node)..graph.first_invalid_edge(node) {
            write!(
                writer,
                " {} {}",
                graph.edge_target(edge) + 1,
                graph.edge_weight(edge)
            )?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
