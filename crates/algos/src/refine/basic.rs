use std::cmp::Reverse;

use float_ord::FloatOrd;

use minloggap_graph::{NodeId, QueryGraph};

use super::Refiner;
use crate::cost::{encoding_bits, is_boundary_node};
use crate::report::Reporter;

/// Gain-greedy pair swapping.
///
/// Every iteration computes, for each data node, the partition cost saved
/// by moving it to the other side, sorts both sides by decreasing gain and
/// swaps the top pairs while the summed gain of a pair is positive. Swaps
/// exchange one node per side, so the iteration preserves the partition
/// sizes exactly; the configured imbalance is never consulted.
pub struct BasicRefiner {
    imbalance: u32,
    imbalance_level: usize,
}

impl BasicRefiner {
    pub fn new(imbalance: u32, imbalance_level: usize) -> Self {
        Self {
            imbalance,
            imbalance_level,
        }
    }

    /// The gain of a node decomposes per query node into the contribution
    /// for adjacent nodes (the query node loses one neighbor on this side
    /// and gains one on the other) and a base contribution that applies to
    /// every non-adjacent node on a side (only the partition sizes shift).
    /// The base is accumulated once per side and the adjacent term is
    /// corrected at the query node's own neighbors.
    fn calculate_gain_values(&self, qg: &QueryGraph<'_>, partition_sizes: [usize; 2]) -> Vec<f64> {
        let graph = qg.data();
        let mut gains = vec![0.0; graph.node_count()];
        let mut nonadjacent_base = [0.0, 0.0];

        for query_node in 0..qg.number_of_query_nodes() {
            let degrees = qg.count_query_node_degrees(query_node);
            let cost = node_cost(partition_sizes, degrees);

            let mut adjacent = [0.0, 0.0];
            let mut nonadjacent = [0.0, 0.0];

            if degrees[0] > 0 {
                adjacent[0] = cost
                    - node_cost(
                        [partition_sizes[0] - 1, partition_sizes[1] + 1],
                        [degrees[0] - 1, degrees[1] + 1],
                    );
            }
            if degrees[1] > 0 {
                adjacent[1] = cost
                    - node_cost(
                        [partition_sizes[0] + 1, partition_sizes[1] - 1],
                        [degrees[0] + 1, degrees[1] - 1],
                    );
            }
            if partition_sizes[0] > 0 && degrees[0] < partition_sizes[0] {
                nonadjacent[0] = cost
                    - node_cost([partition_sizes[0] - 1, partition_sizes[1] + 1], degrees);
                nonadjacent_base[0] += nonadjacent[0];
            }
            if partition_sizes[1] > 0 && degrees[1] < partition_sizes[1] {
                nonadjacent[1] = cost
                    - node_cost([partition_sizes[0] + 1, partition_sizes[1] - 1], degrees);
                nonadjacent_base[1] += nonadjacent[1];
            }

            for &node in qg.query_neighbors(query_node) {
                let partition = graph.partition_index(node);
                gains[node] += adjacent[partition] - nonadjacent[partition];
            }
        }

        for (node, gain) in gains.iter_mut().enumerate() {
            *gain += nonadjacent_base[graph.partition_index(node)];
        }

        gains
    }
}

impl Default for BasicRefiner {
    fn default() -> Self {
        Self::new(super::DEFAULT_IMBALANCE, 1)
    }
}

fn node_cost(partition_sizes: [usize; 2], degrees: [usize; 2]) -> f64 {
    let mut cost = 0.0;
    for partition in 0..2 {
        debug_assert!(degrees[partition] <= partition_sizes[partition]);

        // an empty block has no neighbors in it and contributes nothing
        if partition_sizes[partition] > 0 {
            cost += degrees[partition] as f64
                * encoding_bits(
                    partition_sizes[partition] as f64 / (degrees[partition] + 1) as f64,
                );
        }
    }
    cost
}

impl Refiner for BasicRefiner {
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
        let partition_sizes = qg.count_partition_sizes();
        let gains = self.calculate_gain_values(qg, partition_sizes);

        let mut sides: [Vec<NodeId>; 2] = [Vec::new(), Vec::new()];
        for node in 0..qg.data().node_count() {
            sides[qg.data().partition_index(node)].push(node);
        }
        for side in &mut sides {
            side.sort_unstable_by_key(|&node| Reverse(FloatOrd(gains[node])));
        }

        let limit = sides[0].len().min(sides[1].len());

        // boundary status is recorded before any swap disturbs it
        let mut boundary: [Vec<bool>; 2] = [Vec::new(), Vec::new()];
        for pair in 0..limit {
            if gains[sides[0][pair]] + gains[sides[1][pair]] <= 0.0 {
                break;
            }
            for partition in 0..2 {
                boundary[partition].push(is_boundary_node(qg.data(), sides[partition][pair]));
            }
        }

        let mut nodes_moved = 0;
        for pair in 0..limit {
            if gains[sides[0][pair]] + gains[sides[1][pair]] <= 0.0 {
                break;
            }
            debug_assert_eq!(qg.data().partition_index(sides[0][pair]), 0);
            debug_assert_eq!(qg.data().partition_index(sides[1][pair]), 1);

            nodes_moved += 2;
            for partition in 0..2 {
                let node = sides[partition][pair];
                qg.data_mut().set_partition_index(node, 1 - partition);
                reporter.refinement_move_node(
                    qg,
                    node,
                    partition,
                    gains[node],
                    0.0,
                    0.0,
                    boundary[partition][pair],
                );
            }
        }

        nodes_moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::calculate_partition_cost;
    use crate::report::CliReporter;
    use minloggap_graph::gen;
    use nanorand::{Rng, WyRand};

    fn randomly_partitioned(graph: minloggap_graph::CsrGraph, seed: u64) -> QueryGraph<'static> {
        let mut qg = QueryGraph::new(graph);
        qg.construct_query_edges();

        let node_count = qg.data().node_count();
        let mut blocks: Vec<_> = (0..node_count).map(|v| v % 2).collect();
        WyRand::new_seed(seed).shuffle(&mut blocks);
        for (node, &block) in blocks.iter().enumerate() {
            qg.data_mut().set_partition_index(node, block);
        }
        qg
    }

    #[test]
    fn iterations_preserve_partition_sizes() {
        let mut qg = randomly_partitioned(gen::biclique(6, 6, true), 5);
        let sizes_before = qg.count_partition_sizes();

        let mut refiner = BasicRefiner::default();
        let mut reporter = CliReporter::new();
        for nth in 0..3 {
            refiner.perform_refinement_iteration(&mut qg, nth, 3, &mut reporter);
            assert_eq!(qg.count_partition_sizes(), sizes_before);
        }
    }

    #[test]
    fn gains_match_direct_cost_differences() {
        let cases = [
            (gen::biclique(4, 3, true), 1),
            (gen::cycle(7), 2),
            (gen::rectangle(3), 3),
        ];
        for (graph, seed) in cases {
            let mut qg = randomly_partitioned(graph, seed);
            let sizes = qg.count_partition_sizes();

            let refiner = BasicRefiner::default();
            let gains = refiner.calculate_gain_values(&qg, sizes);
            let cost = calculate_partition_cost(&qg);

            for node in 0..qg.data().node_count() {
                let partition = qg.data().partition_index(node);
                qg.data_mut().set_partition_index(node, 1 - partition);
                let moved_cost = calculate_partition_cost(&qg);
                qg.data_mut().set_partition_index(node, partition);

                assert!(
                    (gains[node] - (cost - moved_cost)).abs() < 1e-6,
                    "decomposed gain {} of node {node} deviates from direct difference {}",
                    gains[node],
                    cost - moved_cost
                );
            }
        }
    }

    #[test]
    fn swaps_a_misplaced_pair_back_into_its_cliques() {
        // two triangles with nodes 2 and 5 on the wrong sides
        let mut qg = QueryGraph::new(gen::biclique(3, 3, false));
        qg.construct_query_edges();
        for node in [2, 3, 4] {
            qg.data_mut().set_partition_index(node, 1);
        }
        qg.data_mut().set_partition_index(2, 1);
        qg.data_mut().set_partition_index(5, 0);

        let mut refiner = BasicRefiner::default();
        let moved = refiner.perform_refinement_iteration(&mut qg, 0, 3, &mut CliReporter::new());

        assert_eq!(moved, 2);
        let partition: Vec<_> = (0..6).map(|v| qg.data().partition_index(v)).collect();
        assert_eq!(partition, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn an_alternating_path_is_a_local_optimum() {
        // on a path the objective rewards concentrating each node's
        // neighbors in one block, which the alternating split does best
        let mut builder = minloggap_graph::CsrGraph::start_construction(4, 6);
        for v in 0..4 {
            let node = builder.new_node();
            if v > 0 {
                builder.new_edge(node, v - 1);
            }
            if v < 3 {
                builder.new_edge(node, v + 1);
            }
        }
        let mut qg = QueryGraph::new(builder.finish_construction());
        qg.construct_query_edges();
        qg.data_mut().set_partition_index(1, 1);
        qg.data_mut().set_partition_index(3, 1);

        let mut refiner = BasicRefiner::default();
        let moved = refiner.perform_refinement_iteration(&mut qg, 0, 3, &mut CliReporter::new());

        assert_eq!(moved, 0);
    }

    #[test]
    fn converged_partitions_report_zero_moves() {
        let mut qg = QueryGraph::new(gen::biclique(4, 4, false));
        qg.construct_query_edges();
        for node in 4..8 {
            qg.data_mut().set_partition_index(node, 1);
        }

        let mut refiner = BasicRefiner::default();
        let moved =
            refiner.perform_refinement_iteration(&mut qg, 0, 3, &mut CliReporter::new());
        assert_eq!(moved, 0);
    }
}
