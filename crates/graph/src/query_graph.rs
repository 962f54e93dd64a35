use log::debug;

use crate::{CsrGraph, EdgeId, NodeId};

/// Wrapper around [`CsrGraph`] that manages query nodes.
///
/// Query nodes represent connectivity that must stay visible while a graph
/// is cut into smaller pieces: when a bisection drops a cut edge from the
/// induced subgraphs, the edge survives as a query edge pointing into the
/// side that contains its endpoint. Query-side adjacency is stored
/// CSR-style, with one offset slot per query node.
///
/// A root query graph is created with [`QueryGraph::new`] followed by
/// either [`construct_query_edges`](QueryGraph::construct_query_edges)
/// (one query node per data node, one query edge per directed data edge)
/// or the manual protocol
/// [`start_construction`](QueryGraph::start_construction) /
/// [`add_query_edge`](QueryGraph::add_query_edge) /
/// [`finish_construction`](QueryGraph::finish_construction).
///
/// [`build_partition_induced_subgraphs`](QueryGraph::build_partition_induced_subgraphs)
/// derives two child query graphs that borrow their parent; the borrow is
/// what lets [`adjacent_query_nodes`](QueryGraph::adjacent_query_nodes)
/// resolve the query nodes next to a data node at any recursion depth.
pub struct QueryGraph<'p> {
    data: CsrGraph,
    /// `query_offsets[q]` is the first outgoing query edge of query node `q`.
    query_offsets: Vec<EdgeId>,
    query_targets: Vec<NodeId>,
    parent: Option<Parent<'p>>,
    constructing: bool,
    last_source: NodeId,
}

struct Parent<'p> {
    graph: &'p QueryGraph<'p>,
    /// `map_to_parent[new id] = old id` in the parent's data graph.
    map_to_parent: Vec<NodeId>,
}

impl<'p> QueryGraph<'p> {
    pub fn new(data: CsrGraph) -> Self {
        Self {
            data,
            query_offsets: vec![0],
            query_targets: Vec::new(),
            parent: None,
            constructing: false,
            last_source: 0,
        }
    }

    #[inline]
    pub fn data(&self) -> &CsrGraph {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut CsrGraph {
        &mut self.data
    }

    #[inline]
    pub fn number_of_query_nodes(&self) -> usize {
        self.query_offsets.len() - 1
    }

    #[inline]
    pub fn number_of_query_edges(&self) -> usize {
        self.query_targets.len()
    }

    #[inline]
    pub fn first_query_edge(&self, query_node: NodeId) -> EdgeId {
        self.query_offsets[query_node]
    }

    #[inline]
    pub fn first_invalid_query_edge(&self, query_node: NodeId) -> EdgeId {
        self.query_offsets[query_node + 1]
    }

    #[inline]
    pub fn query_edge_target(&self, edge: EdgeId) -> NodeId {
        self.query_targets[edge]
    }

    /// The data nodes adjacent to `query_node`.
    #[inline]
    pub fn query_neighbors(&self, query_node: NodeId) -> &[NodeId] {
        &self.query_targets[self.query_offsets[query_node]..self.query_offsets[query_node + 1]]
    }

    /// Begins query-edge construction with one query node per data node.
    pub fn start_construction(&mut self, number_of_query_nodes: usize) {
        assert!(number_of_query_nodes >= self.data.node_count());
        assert!(!self.constructing);

        self.constructing = true;
        self.last_source = 0;
        self.query_targets.clear();
        self.query_offsets.clear();
        self.query_offsets.resize(number_of_query_nodes + 1, 0);
    }

    /// Adds a query edge from `source` (a query node) to `target` (a data
    /// node). Sources must be non-decreasing across calls; skipped sources
    /// end up with empty edge lists.
    pub fn add_query_edge(&mut self, source: NodeId, target: NodeId) {
        assert!(self.constructing);
        assert!(source < self.number_of_query_nodes());
        assert!(target < self.data.node_count());
        assert!(self.last_source <= source);

        self.query_targets.push(target);
        self.query_offsets[source + 1] = self.query_targets.len();

        if self.last_source + 1 < source {
            let fill = self.query_offsets[self.last_source + 1];
            for offset in &mut self.query_offsets[self.last_source + 2..=source] {
                *offset = fill;
            }
        }
        self.last_source = source;
    }

    pub fn finish_construction(&mut self) {
        assert!(self.constructing);

        if self.last_source != self.query_offsets.len() - 1 {
            let fill = self.query_offsets[self.last_source + 1];
            for offset in &mut self.query_offsets[self.last_source + 2..] {
                *offset = fill;
            }
        }

        self.constructing = false;
    }

    /// Creates one query node per data node and one query edge per directed
    /// data edge, i.e. query node `i` mirrors data node `i`.
    pub fn construct_query_edges(&mut self) {
        self.start_construction(self.data.node_count());

        for node in 0..self.data.node_count() {
            for edge in self.data.first_edge(node)..self.data.first_invalid_edge(node) {
                let neighbor = self.data.edge_target(edge);
                self.add_query_edge(node, neighbor);
            }
        }

        self.finish_construction();
    }

    /// Counts the number of data nodes in each block.
    pub fn count_partition_sizes(&self) -> [usize; 2] {
        let mut sizes = [0, 0];
        for node in 0..self.data.node_count() {
            sizes[self.data.partition_index(node)] += 1;
        }
        sizes
    }

    /// Counts the number of a query node's neighbors in each block.
    pub fn count_query_node_degrees(&self, query_node: NodeId) -> [usize; 2] {
        let mut degrees = [0, 0];
        for &neighbor in self.query_neighbors(query_node) {
            degrees[self.data.partition_index(neighbor)] += 1;
        }
        degrees
    }

    /// The query nodes adjacent to the data node `data_node`.
    ///
    /// On the root this equals the data neighbors of `data_node` (query ids
    /// and data ids coincide there); on a derived subgraph the lookup
    /// delegates to the parent, which keeps cut edges from earlier
    /// recursion levels visible as external neighbors.
    pub fn adjacent_query_nodes(&self, data_node: NodeId) -> &[NodeId] {
        match &self.parent {
            Some(parent) => parent
                .graph
                .adjacent_query_nodes(parent.map_to_parent[data_node]),
            None => self.data.neighbors(data_node),
        }
    }

    /// Splits the graph along its current partition into two induced query
    /// subgraphs with compacted node ids.
    ///
    /// Intra-block data edges are kept (with translated endpoints), cut
    /// edges are dropped from the data graphs, and every query edge is
    /// re-emitted into the subgraph whose block contains its target. Both
    /// children replicate the full query node set, start with all nodes in
    /// partition 0, and borrow `self` as their parent. The second element
    /// of the result maps new ids back to the ids of `self`.
    pub fn build_partition_induced_subgraphs(&self) -> ([QueryGraph<'_>; 2], [Vec<NodeId>; 2]) {
        let node_count = self.data.node_count();

        let mut block_nodes = [0usize; 2];
        let mut block_edges = [0usize; 2];
        for node in 0..node_count {
            let partition = self.data.partition_index(node);
            block_nodes[partition] += 1;

            for &neighbor in self.data.neighbors(node) {
                if partition == self.data.partition_index(neighbor) {
                    block_edges[partition] += 1;
                }
            }
        }

        let mut map_old_to_new = vec![0; node_count];
        let mut map_new_to_old = [vec![0; block_nodes[0]], vec![0; block_nodes[1]]];

        let mut builders = [
            CsrGraph::start_construction(block_nodes[0], block_edges[0]),
            CsrGraph::start_construction(block_nodes[1], block_edges[1]),
        ];

        for node in 0..node_count {
            let partition = self.data.partition_index(node);
            let new_node = builders[partition].new_node();
            map_old_to_new[node] = new_node;
            map_new_to_old[partition][new_node] = node;
        }

        for node in 0..node_count {
            let partition = self.data.partition_index(node);
            for &neighbor in self.data.neighbors(node) {
                // cut edges are dropped here and re-added as query edges
                if partition != self.data.partition_index(neighbor) {
                    continue;
                }
                builders[partition].new_edge(map_old_to_new[node], map_old_to_new[neighbor]);
            }
        }

        let [builder0, builder1] = builders;
        let mut subgraphs = [
            QueryGraph::new(builder0.finish_construction()),
            QueryGraph::new(builder1.finish_construction()),
        ];

        for subgraph in &mut subgraphs {
            subgraph.start_construction(self.number_of_query_nodes());
        }
        for query_node in 0..self.number_of_query_nodes() {
            for &target in self.query_neighbors(query_node) {
                let partition = self.data.partition_index(target);
                subgraphs[partition].add_query_edge(query_node, map_old_to_new[target]);
            }
        }
        for (subgraph, map) in subgraphs.iter_mut().zip(map_new_to_old.iter()) {
            subgraph.finish_construction();
            subgraph.parent = Some(Parent {
                graph: self,
                map_to_parent: map.clone(),
            });
        }

        assert_eq!(self.number_of_query_nodes(), subgraphs[0].number_of_query_nodes());
        assert_eq!(self.number_of_query_nodes(), subgraphs[1].number_of_query_nodes());
        assert_eq!(
            self.number_of_query_edges(),
            subgraphs[0].number_of_query_edges() + subgraphs[1].number_of_query_edges()
        );
        assert_eq!(
            self.data.node_count(),
            subgraphs[0].data.node_count() + subgraphs[1].data.node_count()
        );
        assert!(
            self.data.edge_count()
                >= subgraphs[0].data.edge_count() + subgraphs[1].data.edge_count()
        );

        debug!(
            "Split graph with {} nodes into blocks of {} and {} nodes",
            node_count,
            block_nodes[0],
            block_nodes[1]
        );

        (subgraphs, map_new_to_old)
    }
}
