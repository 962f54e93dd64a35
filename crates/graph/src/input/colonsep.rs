//! Loader for colon-separated edge lists.
//!
//! Every line holds one undirected edge `source:target` with 1-based node
//! ids; the reverse direction is inserted automatically. The node count is
//! the largest id that appears.

use std::path::Path;

use super::{map_file, LineScanner};
use crate::{CsrGraph, Error, NodeId};

pub fn read_graph<P: AsRef<Path>>(path: P) -> Result<CsrGraph, Error> {
    let mmap = map_file(path.as_ref())?;
    parse_graph(&mmap)
}

pub fn parse_graph(bytes: &[u8]) -> Result<CsrGraph, Error> {
    let mut scanner = LineScanner::new(bytes);

    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
    let mut node_count = 0;
    while let Some(line) = scanner.next_content_line() {
        let line_number = scanner.line();
        let separator = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| Error::MalformedGraph {
                line: line_number,
                message: "expected 'source:target'".to_string(),
            })?;
        let source = parse_id(&line[..separator], line_number)?;
        let target = parse_id(&line[separator + 1..], line_number)?;

        // ids start at 1
        edges.push((source - 1, target - 1));
        node_count = node_count.max(source).max(target);
    }

    let mut adjacency = vec![Vec::new(); node_count];
    for &(source, target) in &edges {
        adjacency[source].push(target);
        adjacency[target].push(source);
    }

    let mut builder = CsrGraph::start_construction(node_count, 2 * edges.len());
    for (node, neighbors) in adjacency.iter().enumerate() {
        let new_node = builder.new_node();
        debug_assert_eq!(new_node, node);
        for &neighbor in neighbors {
            builder.new_edge(node, neighbor);
        }
    }
    Ok(builder.finish_construction())
}

fn parse_id(token: &[u8], line: usize) -> Result<NodeId, Error> {
    match atoi::atoi::<NodeId>(token) {
        Some(id) if id > 0 => Ok(id),
        _ => Err(Error::MalformedGraph {
            line,
            message: format!("invalid node id '{}'", String::from_utf8_lossy(token)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_both_directions() {
        let graph = parse_graph(b"1:2\n2:3\n").unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.neighbors(0), &[1]);
        assert_eq!(graph.neighbors(1), &[0, 2]);
        assert_eq!(graph.neighbors(2), &[1]);
    }

    #[test]
    fn node_count_is_the_largest_id() {
        let graph = parse_graph(b"1:5\n").unwrap();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.degree(2), 0);
    }

    #[test]
    fn rejects_zero_ids() {
        assert!(matches!(
            parse_graph(b"0:1\n"),
            Err(Error::MalformedGraph { line: 1, .. })
        ));
    }

    #[test]
    fn rejects_lines_without_separator() {
        assert!(matches!(
            parse_graph(b"1 2\n"),
            Err(Error::MalformedGraph { line: 1, .. })
        ));
    }
}
