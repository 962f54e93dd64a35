//! Loader for the `rmf` edge-list format.
//!
//! The first line is `d ghct <nodes> <edges>`; every following line holds
//! one directed edge entry `e <source> <target> <weight>` with 1-based
//! node ids. Entries must be sorted by source, and both directions of an
//! undirected edge must be present.

use std::path::Path;

use super::{map_file, parse_number, tokens, LineScanner};
use crate::{CsrGraph, Error};

pub fn read_graph<P: AsRef<Path>>(path: P) -> Result<CsrGraph, Error> {
    let mmap = map_file(path.as_ref())?;
    parse_graph(&mmap)
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
    if fields.next() != Some(&b"d"[..]) {
        return Err(Error::MalformedGraph {
            line: scanner.line(),
            message: "first line must start with 'd'".to_string(),
        });
    }
    // problem name, unused
    fields.next();
    let node_count = expect(fields.next(), &scanner, "node count")?;
    let edge_count = expect(fields.next(), &scanner, "edge count")?;

    let mut builder = CsrGraph::start_construction(node_count, edge_count);
    for _ in 0..node_count {
        builder.new_node();
    }

    let mut edges_read = 0;
    let mut last_source = 0;
    while let Some(line) = scanner.next_content_line() {
        let line_number = scanner.line();
        let mut fields = tokens(line);
        if fields.next() != Some(&b"e"[..]) {
            return Err(Error::MalformedGraph {
                line: line_number,
                message: "edge line must start with 'e'".to_string(),
            });
        }
        let source = expect(fields.next(), &scanner, "edge source")?;
        let target = expect(fields.next(), &scanner, "edge target")?;
        if source == 0 || source > node_count || target == 0 || target > node_count {
            return Err(Error::MalformedGraph {
                line: line_number,
                message: format!("edge ({source}, {target}) is out of range"),
            });
        }
        if source < last_source {
            return Err(Error::MalformedGraph {
                line: line_number,
                message: "edges must be sorted by source".to_string(),
            });
        }
        if edges_read == edge_count {
            return Err(Error::MalformedGraph {
                line: line_number,
                message: format!("more than {edge_count} edges listed"),
            });
        }

        // ids start at 1
        let edge = builder.new_edge(source - 1, target - 1);
        if let Some(weight) = fields.next() {
            builder.set_edge_weight(edge, parse_number(weight, line_number)? as i64);
        }
        last_source = source;
        edges_read += 1;
    }

    if edges_read != edge_count {
        return Err(Error::MalformedGraph {
            line: scanner.line(),
            message: format!("header declares {edge_count} edges but {edges_read} were listed"),
        });
    }

    Ok(builder.finish_construction())
}

fn expect(token: Option<&[u8]>, scanner: &LineScanner<'_>, what: &str) -> Result<usize, Error> {
    match token {
        Some(token) => parse_number(token, scanner.line()),
        None => Err(Error::MalformedGraph {
            line: scanner.line(),
            message: format!("missing {what}"),
        }),
    }
}
