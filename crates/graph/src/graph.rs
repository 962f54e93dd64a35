use log::info;

use crate::{EdgeId, NodeId, PartitionId};

/// A Compressed-Sparse-Row graph with a mutable two-way partition.
///
/// The data structure is composed of two arrays: `offsets` and `targets`.
/// For a graph with node count `n`, `offsets` has exactly `n + 1` entries.
/// For a given node `u`, `offsets[u]` stores the start index of the
/// neighbor list of `u` in `targets`; the neighbor list of `u` is the slice
/// `&targets[offsets[u]..offsets[u + 1]]`.
///
/// Graphs are undirected: every edge `{u, v}` is stored as the two directed
/// entries `(u, v)` and `(v, u)`, and [`CsrGraph::edge_count`] counts both.
/// The topology is fixed once [`CsrBuilder::finish_construction`] ran; the
/// only state that mutates afterwards is the per-node partition index.
#[derive(Debug, Clone)]
pub struct CsrGraph {
    offsets: Vec<EdgeId>,
    targets: Vec<NodeId>,
    node_weights: Vec<i64>,
    edge_weights: Vec<i64>,
    partition: Vec<PartitionId>,
}

impl CsrGraph {
    /// Starts the two-phase construction of a graph with `node_count` nodes
    /// and `edge_count` directed edge entries.
    pub fn start_construction(node_count: usize, edge_count: usize) -> CsrBuilder {
        CsrBuilder::new(node_count, edge_count)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Returns the number of directed edge entries, i.e. twice the number
    /// of undirected edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn degree(&self, node: NodeId) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    #[inline]
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        &self.targets[self.offsets[node]..self.offsets[node + 1]]
    }

    #[inline]
    pub fn first_edge(&self, node: NodeId) -> EdgeId {
        self.offsets[node]
    }

    #[inline]
    pub fn first_invalid_edge(&self, node: NodeId) -> EdgeId {
        self.offsets[node + 1]
    }

    #[inline]
    pub fn edge_target(&self, edge: EdgeId) -> NodeId {
        self.targets[edge]
    }

    #[inline]
    pub fn node_weight(&self, node: NodeId) -> i64 {
        self.node_weights[node]
    }

    #[inline]
    pub fn edge_weight(&self, edge: EdgeId) -> i64 {
        self.edge_weights[edge]
    }

    pub fn total_node_weight(&self) -> i64 {
        self.node_weights.iter().sum()
    }

    /// Returns `true` if any node or edge carries a non-unit weight.
    pub fn is_weighted(&self) -> bool {
        self.node_weights.iter().any(|&w| w != 1) || self.edge_weights.iter().any(|&w| w != 1)
    }

    #[inline]
    pub fn partition_index(&self, node: NodeId) -> PartitionId {
        self.partition[node]
    }

    #[inline]
    pub fn set_partition_index(&mut self, node: NodeId, partition: PartitionId) {
        debug_assert!(partition < 2);
        self.partition[node] = partition;
    }

    /// Number of undirected edges whose endpoints lie in different blocks.
    pub fn edge_cut(&self) -> usize {
        let mut cut = 0;
        for node in 0..self.node_count() {
            let partition = self.partition[node];
            cut += self
                .neighbors(node)
                .iter()
                .filter(|&&neighbor| self.partition[neighbor] != partition)
                .count();
        }
        // every cut edge is counted once per direction
        cut / 2
    }
}

/// Second phase of the [`CsrGraph`] construction protocol.
///
/// Nodes are appended with [`new_node`](CsrBuilder::new_node). Edges may be
/// appended for any node that already exists, as long as the edge sources
/// are non-decreasing across calls; gaps between sources are closed by
/// replicating the current offset, so the offsets array is never revisited.
/// All weights default to `1`.
#[derive(Debug)]
pub struct CsrBuilder {
    declared_nodes: usize,
    declared_edges: usize,
    offsets: Vec<EdgeId>,
    targets: Vec<NodeId>,
    node_weights: Vec<i64>,
    edge_weights: Vec<i64>,
    nodes_created: usize,
    last_source: NodeId,
}

impl CsrBuilder {
    fn new(node_count: usize, edge_count: usize) -> Self {
        Self {
            declared_nodes: node_count,
            declared_edges: edge_count,
            offsets: vec![0; node_count + 1],
            targets: Vec::with_capacity(edge_count),
            node_weights: vec![1; node_count],
            edge_weights: Vec::with_capacity(edge_count),
            nodes_created: 0,
            last_source: 0,
        }
    }

    /// Appends a node and returns its id.
    pub fn new_node(&mut self) -> NodeId {
        assert!(
            self.nodes_created < self.declared_nodes,
            "more nodes created than declared ({})",
            self.declared_nodes
        );
        self.nodes_created += 1;
        self.nodes_created - 1
    }

    /// Appends a directed edge entry `(source, target)` and returns its id.
    ///
    /// `source` must already have been created and must not be smaller than
    /// the source of the previously appended edge.
    pub fn new_edge(&mut self, source: NodeId, target: NodeId) -> EdgeId {
        assert!(source < self.nodes_created, "unknown source node {source}");
        assert!(
            self.last_source <= source,
            "edge sources must be non-decreasing"
        );
        assert!(
            self.targets.len() < self.declared_edges,
            "more edges created than declared ({})",
            self.declared_edges
        );

        self.targets.push(target);
        self.edge_weights.push(1);
        self.offsets[source + 1] = self.targets.len();

        // nodes skipped since the last source have empty neighbor lists
        if self.last_source + 1 < source {
            let fill = self.offsets[self.last_source + 1];
            for offset in &mut self.offsets[self.last_source + 2..=source] {
                *offset = fill;
            }
        }
        self.last_source = source;

        self.targets.len() - 1
    }

    pub fn set_node_weight(&mut self, node: NodeId, weight: i64) {
        assert!(node < self.nodes_created, "unknown node {node}");
        self.node_weights[node] = weight;
    }

    pub fn set_edge_weight(&mut self, edge: EdgeId, weight: i64) {
        self.edge_weights[edge] = weight;
    }

    /// Seals the graph. All declared nodes and edges must have been created.
    pub fn finish_construction(mut self) -> CsrGraph {
        assert_eq!(
            self.nodes_created, self.declared_nodes,
            "fewer nodes created than declared"
        );
        assert_eq!(
            self.targets.len(),
            self.declared_edges,
            "fewer edges created than declared"
        );

        // nodes after the last source have empty neighbor lists
        if self.declared_nodes > 0 {
            let fill = self.offsets[self.last_source + 1];
            for offset in &mut self.offsets[self.last_source + 2..] {
                *offset = fill;
            }
        }

        let partition = vec![0; self.declared_nodes];
        let graph = CsrGraph {
            offsets: self.offsets,
            targets: self.targets,
            node_weights: self.node_weights,
            edge_weights: self.edge_weights,
            partition,
        };
        info!(
            "Created graph (node_count = {}, edge_count = {})",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }
}
