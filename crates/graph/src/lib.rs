//! Data structures for compression-oriented graph reordering.
//!
//! The crate provides two building blocks: a Compressed-Sparse-Row graph
//! ([`CsrGraph`]) with a mutable per-node partition assignment, and a
//! [`QueryGraph`] wrapper that keeps "external" connectivity visible while a
//! graph is recursively bisected into smaller and smaller pieces.
//!
//! A graph is built in two phases. The first phase declares the node and
//! edge counts, the second phase appends nodes and their outgoing edges in
//! order:
//!
//! ```
//! use minloggap_graph::CsrGraph;
//!
//! // a triangle, every undirected edge is stored twice
//! let mut builder = CsrGraph::start_construction(3, 6);
//! for v in 0..3 {
//!     let node = builder.new_node();
//!     builder.new_edge(node, (v + 1) % 3);
//!     builder.new_edge(node, (v + 2) % 3);
//! }
//! let graph = builder.finish_construction();
//!
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.edge_count(), 6);
//! assert_eq!(graph.neighbors(0), &[1, 2]);
//! ```
//!
//! Graphs are read and written in the text format used by common graph
//! partitioners (see [`input::metis`]); additional loaders and graph
//! generators live in [`input`] and [`gen`].

pub mod gen;
mod graph;
pub mod input;
mod layout;
mod query_graph;

pub use crate::graph::{CsrBuilder, CsrGraph};
pub use crate::layout::{
    apply_linear_layout, create_identity_layout, create_random_layout, invert_linear_layout,
};
pub use crate::query_graph::QueryGraph;

/// Identifies a node within a graph. Nodes are numbered `0..node_count`.
pub type NodeId = usize;

/// Identifies a directed edge entry within a graph's target array.
pub type EdgeId = usize;

/// A block of a bisection; always `0` or `1`.
pub type PartitionId = usize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error while reading input")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error("malformed graph input at line {line}: {message}")]
    MalformedGraph { line: usize, message: String },
    #[error("malformed partition file at line {line}: {message}")]
    MalformedPartition { line: usize, message: String },
    #[error("malformed layout file at line {line}: {message}")]
    MalformedLayout { line: usize, message: String },
}

pub mod prelude {
    pub use crate::gen;
    pub use crate::input;
    pub use crate::{
        apply_linear_layout, create_identity_layout, create_random_layout, invert_linear_layout,
    };
    pub use crate::{CsrBuilder, CsrGraph, QueryGraph};
    pub use crate::{EdgeId, Error, NodeId, PartitionId};
}
