use std::time::{Duration, Instant};

use fxhash::FxHashMap;
use log::{debug, info};
use nanorand::{Rng, WyRand};

use minloggap_graph::{CsrGraph, NodeId, PartitionId, QueryGraph};

use super::{validate_bisection, InitialPartitioner};
use crate::report::Reporter;
use crate::Error;

const DEFAULT_IMBALANCE: u32 = 3;

/// Tuning presets named after the configurations of multilevel graph
/// partitioners: the social variants expect power-law degree
/// distributions and coarsen more aggressively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Standard,
    Eco,
    FastSocial,
    EcoSocial,
    StrongSocial,
}

struct Tuning {
    coarsest_size: usize,
    refinement_passes: usize,
    tries: usize,
}

impl Preset {
    fn tuning(self) -> Tuning {
        match self {
            Preset::Standard => Tuning {
                coarsest_size: 32,
                refinement_passes: 3,
                tries: 2,
            },
            Preset::Eco => Tuning {
                coarsest_size: 64,
                refinement_passes: 2,
                tries: 1,
            },
            Preset::FastSocial => Tuning {
                coarsest_size: 160,
                refinement_passes: 1,
                tries: 1,
            },
            Preset::EcoSocial => Tuning {
                coarsest_size: 96,
                refinement_passes: 2,
                tries: 1,
            },
            Preset::StrongSocial => Tuning {
                coarsest_size: 32,
                refinement_passes: 4,
                tries: 3,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct MultilevelConfig {
    pub preset: Preset,
    /// Allowed imbalance in percent on levels selected by `imbalance_level`.
    pub imbalance: u32,
    /// The configured imbalance applies on every `imbalance_level`-th
    /// recursion level; other levels use the default of 3 percent.
    pub imbalance_level: usize,
    pub seed: u64,
    /// When set, partitioning is repeated with fresh shuffles until the
    /// limit expires and the smallest edge cut wins.
    pub time_limit: Option<Duration>,
}

impl MultilevelConfig {
    pub fn new(preset: Preset, seed: u64) -> Self {
        Self {
            preset,
            imbalance: DEFAULT_IMBALANCE,
            imbalance_level: 1,
            seed,
            time_limit: None,
        }
    }
}

impl Default for MultilevelConfig {
    fn default() -> Self {
        Self::new(Preset::Standard, 0)
    }
}

/// A self-contained multilevel bisector: heavy-edge matching contracts the
/// graph to a few dozen nodes, the coarsest graph is split greedily by
/// node weight, and the split is projected back level by level with a
/// cut-improving local search after every projection.
pub struct MultilevelInitialPartitioner {
    config: MultilevelConfig,
    rng: WyRand,
}

impl MultilevelInitialPartitioner {
    pub fn new(config: MultilevelConfig) -> Self {
        assert!(config.imbalance <= 100);
        assert!(config.imbalance_level > 0);

        let rng = WyRand::new_seed(config.seed);
        Self { config, rng }
    }

    fn bisect(&mut self, graph: &CsrGraph, imbalance: u32) -> Vec<PartitionId> {
        let tuning = self.config.preset.tuning();

        let mut best = self.bisect_once(graph, imbalance, &tuning);
        let mut best_cut = cut_weight(graph, &best);
        for _ in 1..tuning.tries {
            let candidate = self.bisect_once(graph, imbalance, &tuning);
            let cut = cut_weight(graph, &candidate);
            if cut < best_cut {
                best_cut = cut;
                best = candidate;
            }
        }
        best
    }

    fn bisect_once(
        &mut self,
        graph: &CsrGraph,
        imbalance: u32,
        tuning: &Tuning,
    ) -> Vec<PartitionId> {
        // coarsening: (contracted graph, fine id -> coarse id) per level
        let mut hierarchy: Vec<(CsrGraph, Vec<NodeId>)> = Vec::new();
        loop {
            let current = hierarchy.last().map(|(coarse, _)| coarse).unwrap_or(graph);
            if current.node_count() <= tuning.coarsest_size {
                break;
            }
            match contract(current, &mut self.rng) {
                Some(level) => hierarchy.push(level),
                None => break,
            }
        }
        debug!(
            "Contracted {} nodes through {} levels",
            graph.node_count(),
            hierarchy.len()
        );

        let coarsest = hierarchy.last().map(|(coarse, _)| coarse).unwrap_or(graph);
        let mut partition = initial_bisection(coarsest, &mut self.rng);
        refine_cut(coarsest, &mut partition, imbalance, tuning.refinement_passes, &mut self.rng);

        // uncoarsening: project and locally improve on every finer level
        for index in (0..hierarchy.len()).rev() {
            let finer = if index == 0 {
                graph
            } else {
                &hierarchy[index - 1].0
            };
            let map = &hierarchy[index].1;

            let projected = (0..finer.node_count())
                .map(|node| partition[map[node]])
                .collect::<Vec<_>>();
            partition = projected;
            refine_cut(finer, &mut partition, imbalance, tuning.refinement_passes, &mut self.rng);
        }

        partition
    }
}

impl InitialPartitioner for MultilevelInitialPartitioner {
    fn perform_partitioning(
        &mut self,
        qg: &mut QueryGraph<'_>,
        level: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<(), Error> {
        reporter.initial_partitioning_start(qg);

        if qg.data().node_count() == 0 {
            reporter.initial_partitioning_finish(qg);
            return Ok(());
        }

        let imbalance = if level % self.config.imbalance_level == 0 {
            self.config.imbalance
        } else {
            DEFAULT_IMBALANCE
        };

        info!(
            "Partitioning graph with {} nodes and {} edges (imbalance {}%)",
            qg.data().node_count(),
            qg.data().edge_count(),
            imbalance
        );

        let partition = match self.config.time_limit {
            None => self.bisect(qg.data(), imbalance),
            Some(limit) => {
                let start = Instant::now();
                let mut best = self.bisect(qg.data(), imbalance);
                let mut best_cut = cut_weight(qg.data(), &best);
                while start.elapsed() < limit {
                    let candidate = self.bisect(qg.data(), imbalance);
                    let cut = cut_weight(qg.data(), &candidate);
                    if cut < best_cut {
                        best_cut = cut;
                        best = candidate;
                    }
                }
                best
            }
        };

        for (node, &block) in partition.iter().enumerate() {
            qg.data_mut().set_partition_index(node, block);
        }

        validate_bisection(qg)?;
        reporter.initial_partitioning_finish(qg);
        Ok(())
    }
}

fn cut_weight(graph: &CsrGraph, partition: &[PartitionId]) -> i64 {
    let mut cut = 0;
    for node in 0..graph.node_count() {
        for edge in graph.first_edge(node)..graph.first_invalid_edge(node) {
            if partition[node] != partition[graph.edge_target(edge)] {
                cut += graph.edge_weight(edge);
            }
        }
    }
    cut / 2
}

/// One round of randomized heavy-edge matching plus contraction. Returns
/// `None` when no two nodes can be matched anymore.
fn contract(graph: &CsrGraph, rng: &mut WyRand) -> Option<(CsrGraph, Vec<NodeId>)> {
    let node_count = graph.node_count();

    let mut order: Vec<NodeId> = (0..node_count).collect();
    rng.shuffle(&mut order);

    let mut partner: Vec<Option<NodeId>> = vec![None; node_count];
    let mut matched = 0;
    for &node in &order {
        if partner[node].is_some() {
            continue;
        }
        let mut heaviest: Option<(i64, NodeId)> = None;
        for edge in graph.first_edge(node)..graph.first_invalid_edge(node) {
            let neighbor = graph.edge_target(edge);
            if neighbor == node || partner[neighbor].is_some() {
                continue;
            }
            let weight = graph.edge_weight(edge);
            if heaviest.map_or(true, |(best, _)| weight > best) {
                heaviest = Some((weight, neighbor));
            }
        }
        if let Some((_, neighbor)) = heaviest {
            partner[node] = Some(neighbor);
            partner[neighbor] = Some(node);
            matched += 1;
        }
    }
    if matched == 0 {
        return None;
    }

    let mut map = vec![usize::MAX; node_count];
    let mut coarse_count = 0;
    for node in 0..node_count {
        if map[node] != usize::MAX {
            continue;
        }
        map[node] = coarse_count;
        if let Some(neighbor) = partner[node] {
            map[neighbor] = coarse_count;
        }
        coarse_count += 1;
    }

    let mut weights = vec![0i64; coarse_count];
    for node in 0..node_count {
        weights[map[node]] += graph.node_weight(node);
    }

    // merge parallel edges; edges inside a coarse node disappear
    let mut adjacency: Vec<FxHashMap<NodeId, i64>> = vec![FxHashMap::default(); coarse_count];
    for node in 0..node_count {
        for edge in graph.first_edge(node)..graph.first_invalid_edge(node) {
            let target = map[graph.edge_target(edge)];
            if map[node] == target {
                continue;
            }
            *adjacency[map[node]].entry(target).or_insert(0) += graph.edge_weight(edge);
        }
    }

    let edge_count = adjacency.iter().map(|neighbors| neighbors.len()).sum();
    let mut builder = CsrGraph::start_construction(coarse_count, edge_count);
    for coarse in 0..coarse_count {
        let node = builder.new_node();
        builder.set_node_weight(node, weights[coarse]);
    }
    for (coarse, neighbors) in adjacency.iter().enumerate() {
        let mut targets: Vec<(NodeId, i64)> =
            neighbors.iter().map(|(&target, &weight)| (target, weight)).collect();
        targets.sort_unstable_by_key(|&(target, _)| target);
        for (target, weight) in targets {
            let edge = builder.new_edge(coarse, target);
            builder.set_edge_weight(edge, weight);
        }
    }

    Some((builder.finish_construction(), map))
}

/// Grows a weight-balanced split by assigning shuffled nodes to the
/// lighter block.
fn initial_bisection(graph: &CsrGraph, rng: &mut WyRand) -> Vec<PartitionId> {
    let mut order: Vec<NodeId> = (0..graph.node_count()).collect();
    rng.shuffle(&mut order);

    let mut partition = vec![0; graph.node_count()];
    let mut weights = [0i64; 2];
    for &node in &order {
        let block = if weights[0] <= weights[1] { 0 } else { 1 };
        partition[node] = block;
        weights[block] += graph.node_weight(node);
    }
    partition
}

/// Greedy cut-improving passes: move a node when that strictly reduces the
/// weighted cut, keeps the heavier block under the imbalance budget and
/// does not empty a block.
fn refine_cut(
    graph: &CsrGraph,
    partition: &mut [PartitionId],
    imbalance: u32,
    passes: usize,
    rng: &mut WyRand,
) {
    let total_weight = graph.total_node_weight();
    let max_block_weight =
        ((total_weight as f64 / 2.0) * (1.0 + imbalance as f64 / 100.0)).ceil() as i64;

    let mut weights = [0i64; 2];
    let mut sizes = [0usize; 2];
    for node in 0..graph.node_count() {
        weights[partition[node]] += graph.node_weight(node);
        sizes[partition[node]] += 1;
    }

    let mut order: Vec<NodeId> = (0..graph.node_count()).collect();
    for _ in 0..passes {
        rng.shuffle(&mut order);

        let mut moved = 0;
        for &node in &order {
            let from = partition[node];
            let to = 1 - from;
            if sizes[from] == 1 || weights[to] + graph.node_weight(node) > max_block_weight {
                continue;
            }

            let mut gain = 0;
            for edge in graph.first_edge(node)..graph.first_invalid_edge(node) {
                let weight = graph.edge_weight(edge);
                if partition[graph.edge_target(edge)] == from {
                    gain -= weight;
                } else {
                    gain += weight;
                }
            }
            if gain > 0 {
                partition[node] = to;
                weights[from] -= graph.node_weight(node);
                weights[to] += graph.node_weight(node);
                sizes[from] -= 1;
                sizes[to] += 1;
                moved += 1;
            }
        }
        if moved == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CliReporter;
    use minloggap_graph::gen;

    fn partition_with(preset: Preset, seed: u64, graph: CsrGraph) -> Vec<PartitionId> {
        let mut qg = QueryGraph::new(graph);
        qg.construct_query_edges();

        let mut partitioner =
            MultilevelInitialPartitioner::new(MultilevelConfig::new(preset, seed));
        partitioner
            .perform_partitioning(&mut qg, 1, &mut CliReporter::new())
            .unwrap();

        (0..qg.data().node_count())
            .map(|node| qg.data().partition_index(node))
            .collect()
    }

    #[test]
    fn produces_a_valid_balanced_bisection() {
        let partition = partition_with(Preset::Standard, 42, gen::cycle(16));

        let ones = partition.iter().filter(|&&block| block == 1).count();
        assert!(ones > 0 && ones < 16);
        // 3% imbalance on 16 unit weights allows at most 9 nodes per block
        assert!(ones.max(16 - ones) <= 9);
    }

    #[test]
    fn coarsening_path_handles_larger_graphs() {
        // 64 nodes force at least one contraction level for every preset
        for preset in [Preset::Standard, Preset::Eco, Preset::StrongSocial] {
            let partition = partition_with(preset, 7, gen::rectangle(8));
            let ones = partition.iter().filter(|&&block| block == 1).count();
            assert!(ones > 0 && ones < 64);
        }
    }

    #[test]
    fn is_deterministic_for_a_fixed_seed() {
        let first = partition_with(Preset::FastSocial, 5, gen::cycle_with_chords(32));
        let second = partition_with(Preset::FastSocial, 5, gen::cycle_with_chords(32));
        assert_eq!(first, second);
    }

    #[test]
    fn handles_tiny_graphs() {
        let partition = partition_with(Preset::Standard, 1, gen::clique(2));
        assert_eq!(partition.len(), 2);
        assert_ne!(partition[0], partition[1]);
    }

    #[test]
    fn contraction_merges_matched_nodes() {
        let graph = gen::cycle(8);
        let mut rng = WyRand::new_seed(11);
        let (coarse, map) = contract(&graph, &mut rng).unwrap();

        assert!(coarse.node_count() < graph.node_count());
        assert_eq!(map.len(), 8);
        assert_eq!(coarse.total_node_weight(), 8);
        assert!(map.iter().all(|&c| c < coarse.node_count()));
    }

    #[test]
    fn time_limited_runs_keep_a_partition() {
        let mut config = MultilevelConfig::new(Preset::FastSocial, 3);
        config.time_limit = Some(Duration::from_millis(5));
        let mut partitioner = MultilevelInitialPartitioner::new(config);

        let mut qg = QueryGraph::new(gen::biclique(6, 6, true));
        qg.construct_query_edges();
        partitioner
            .perform_partitioning(&mut qg, 1, &mut CliReporter::new())
            .unwrap();

        let sizes = qg.count_partition_sizes();
        assert!(sizes[0] > 0 && sizes[1] > 0);
    }
}
