use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::f64::consts::{E, PI};

use float_ord::FloatOrd;

use minloggap_graph::{CsrGraph, NodeId, PartitionId, QueryGraph};

use super::Refiner;
use crate::cost::{get_partition, is_boundary_node, set_partition};
use crate::report::Reporter;

#[derive(Clone, Default)]
struct NodeState {
    num_edges_to: [usize; 2],
    gain: f64,
    marked: bool,
}

/// Priority-queue variant of the FM pass, driven by a quadtree-size
/// estimate of the partitioned adjacency matrix instead of the partition
/// cost function.
///
/// Two max-heaps keyed on gain, one per block, are polled strictly
/// alternately for `2·min(|Q0|, |Q1|)` moves without any balance
/// heuristic; since every move changes the gain of every other node, the
/// heaps are rebuilt rather than decrease-keyed. The partition is mutated
/// while the move sequence is assembled and restored before the
/// prefix-maximum is committed. Kept for experimental comparison against
/// [`FmRefiner`](super::FmRefiner).
pub struct FmQuadtreeRefiner {
    imbalance: u32,
    imbalance_level: usize,
    partition_sizes: [usize; 2],
    edges_between: [[usize; 2]; 2],
}

impl FmQuadtreeRefiner {
    pub fn new(imbalance: u32, imbalance_level: usize) -> Self {
        Self {
            imbalance,
            imbalance_level,
            partition_sizes: [0, 0],
            edges_between: [[0, 0], [0, 0]],
        }
    }

    /// Rebuilds block sizes, the block-to-block edge counts and all gains
    /// from the current partition.
    fn init_partition_info(&mut self, graph: &CsrGraph) -> Vec<NodeState> {
        let mut nodes = vec![NodeState::default(); graph.node_count()];

        self.partition_sizes = [0, 0];
        self.edges_between = [[0, 0], [0, 0]];

        for node in 0..graph.node_count() {
            let partition = graph.partition_index(node);
            self.partition_sizes[partition] += 1;

            for &neighbor in graph.neighbors(node) {
                let neighbor_partition = graph.partition_index(neighbor);
                nodes[node].num_edges_to[neighbor_partition] += 1;
                self.edges_between[partition][neighbor_partition] += 1;
            }
        }

        self.update_gain_values(graph, &mut nodes);
        nodes
    }

    /// Recomputes the gain of every unmarked node by tentatively applying
    /// its move to the block totals and evaluating the cost estimate.
    fn update_gain_values(&mut self, graph: &CsrGraph, nodes: &mut [NodeState]) {
        let old_cost = self.evaluate_cost_function();

        for node in 0..graph.node_count() {
            if nodes[node].marked {
                continue;
            }
            let from = graph.partition_index(node);
            let to = 1 - from;

            self.apply_virtual_move(&nodes[node], from, to);
            let new_cost = self.evaluate_cost_function();
            self.apply_virtual_move(&nodes[node], to, from);

            nodes[node].gain = old_cost - new_cost;
        }
    }

    /// Shifts the block totals as if a node with the given per-block edge
    /// counts moved `from` → `to`. Applying the inverse move undoes it.
    fn apply_virtual_move(&mut self, node: &NodeState, from: PartitionId, to: PartitionId) {
        let edges = node.num_edges_to;

        self.partition_sizes[from] -= 1;
        self.partition_sizes[to] += 1;

        // the node's outgoing entries
        self.edges_between[from][from] -= edges[from];
        self.edges_between[from][to] -= edges[to];
        self.edges_between[to][from] += edges[from];
        self.edges_between[to][to] += edges[to];

        // the incoming entries of its neighbors
        self.edges_between[from][from] -= edges[from];
        self.edges_between[from][to] += edges[from];
        self.edges_between[to][from] -= edges[to];
        self.edges_between[to][to] += edges[to];
    }

    /// Actually moves `node`, marks it and refreshes all gains.
    fn move_and_update(&mut self, graph: &mut CsrGraph, nodes: &mut [NodeState], node: NodeId) {
        let from = graph.partition_index(node);
        let to = 1 - from;
        graph.set_partition_index(node, to);
        nodes[node].marked = true;

        self.partition_sizes[from] -= 1;
        self.partition_sizes[to] += 1;

        for edge in graph.first_edge(node)..graph.first_invalid_edge(node) {
            let neighbor = graph.edge_target(edge);
            let neighbor_partition = graph.partition_index(neighbor);

            self.edges_between[from][neighbor_partition] -= 1;
            self.edges_between[to][neighbor_partition] += 1;
            self.edges_between[neighbor_partition][from] -= 1;
            self.edges_between[neighbor_partition][to] += 1;
            nodes[neighbor].num_edges_to[from] -= 1;
            nodes[neighbor].num_edges_to[to] += 1;
        }

        self.update_gain_values(graph, nodes);
    }

    /// Quadtree size estimate from the block totals alone.
    fn evaluate_cost_function(&self) -> f64 {
        let mut cost = 0.0;
        for from in 0..2 {
            for to in 0..2 {
                cost += approx_log_binom(
                    (self.partition_sizes[from] * self.partition_sizes[to]) as f64,
                    self.edges_between[from][to] as f64,
                );
            }
        }
        cost
    }
}

impl Default for FmQuadtreeRefiner {
    fn default() -> Self {
        Self::new(super::DEFAULT_IMBALANCE, 1)
    }
}

/// Stirling estimate of `log2(n!)`.
fn approx_log_faculty(n: f64) -> f64 {
    (1.0 / 2f64.ln()) * (0.5 * (2.0 * PI * n).ln() + n * (n / E).ln())
}

/// Stirling estimate of `log2(binom(n, k))`; degenerate coefficients are
/// exactly one and contribute zero bits.
fn approx_log_binom(n: f64, k: f64) -> f64 {
    if n <= 0.0 || k <= 0.0 || k >= n {
        return 0.0;
    }
    approx_log_faculty(n) - approx_log_faculty(k) - approx_log_faculty(n - k)
}

impl Refiner for FmQuadtreeRefiner {
    fn imbalance(&self) -> u32 {
        self.imbalance
    }

    fn imbalance_level(&self) -> usize {
        self.imbalance_level
    }

    fn perform_refinement_iteration(
        &mut self,
        qg: &mut QueryGraph<'_>,
        _nth_iteration: usize,
        _imbalance: u32,
        reporter: &mut dyn Reporter,
    ) -> usize {
        let graph = qg.data_mut();
        let mut nodes = self.init_partition_info(graph);

        let limit = self.partition_sizes[0].min(self.partition_sizes[1]);
        let saved_partition = get_partition(graph);

        // assemble the move sequence, polling the two queues alternately
        let mut selection: Vec<NodeId> = Vec::new();
        let mut queues = build_queues(graph, &nodes);
        for step in 0..2 * limit {
            let Some((_, Reverse(node))) = queues[step % 2].pop() else {
                break;
            };
            self.move_and_update(graph, &mut nodes, node);
            selection.push(node);
            queues = build_queues(graph, &nodes);
        }
        set_partition(graph, &saved_partition);

        let mut best_index = 0;
        let mut best_sum = f64::MIN;
        let mut sum = 0.0;
        for (index, &node) in selection.iter().enumerate() {
            sum += nodes[node].gain;
            if sum > best_sum {
                best_sum = sum;
                best_index = index;
            }
        }

        if selection.is_empty() || best_sum <= 0.0 {
            return 0;
        }

        #[cfg(debug_assertions)]
        let pre_iteration_cost = {
            self.init_partition_info(qg.data());
            self.evaluate_cost_function()
        };

        for &node in &selection[..=best_index] {
            let from = qg.data().partition_index(node);
            let boundary = is_boundary_node(qg.data(), node);
            let gain = nodes[node].gain;

            qg.data_mut().set_partition_index(node, 1 - from);
            reporter.refinement_move_node(qg, node, from, gain, 0.0, 0.0, boundary);
        }

        #[cfg(debug_assertions)]
        {
            self.init_partition_info(qg.data());
            let post_iteration_cost = self.evaluate_cost_function();
            debug_assert!(
                (pre_iteration_cost - post_iteration_cost - best_sum).abs() < 0.05,
                "committed gain {} deviates from the observed cost change {}",
                best_sum,
                pre_iteration_cost - post_iteration_cost
            );
        }

        best_index + 1
    }
}

fn build_queues(
    graph: &CsrGraph,
    nodes: &[NodeState],
) -> [BinaryHeap<(FloatOrd<f64>, Reverse<NodeId>)>; 2] {
    let mut queues = [BinaryHeap::new(), BinaryHeap::new()];
    for node in 0..graph.node_count() {
        if nodes[node].marked {
            continue;
        }
        queues[graph.partition_index(node)].push((FloatOrd(nodes[node].gain), Reverse(node)));
    }
    queues
}
