use std::path::{Path, PathBuf};

use log::info;
use nanorand::{Rng, WyRand};

use minloggap_graph::{
    apply_linear_layout, create_identity_layout, input, invert_linear_layout, NodeId, QueryGraph,
};

use crate::cost::{
    calculate_log, calculate_loggap, calculate_partition_cost, calculate_quadtree_size,
    partition_balance,
};
use crate::partitioner::InitialPartitioner;
use crate::refine::Refiner;
use crate::report::Reporter;
use crate::Error;

/// Iteration budget handed to the refiner on every recursion level.
const MAX_REFINEMENT_ITERATIONS: usize = 20;

/// Recursively computes the inverse of a linear arrangement: position `i`
/// of the result names the node placed there.
///
/// Every level bisects the data graph, refines the bisection against the
/// partition cost, splits off the two induced query subgraphs and
/// concatenates their recursively computed orders through the id maps.
/// When the level budget is spent or a single node remains, the leaf is
/// ordered randomly.
pub fn find_linear_arrangement(
    qg: &mut QueryGraph<'_>,
    level: usize,
    partitioner: &mut dyn InitialPartitioner,
    refiner: &mut dyn Refiner,
    reporter: &mut dyn Reporter,
    rng: &mut WyRand,
) -> Result<Vec<NodeId>, Error> {
    let node_count = qg.data().node_count();
    if level == 0 || node_count <= 1 {
        let mut inverted: Vec<NodeId> = (0..node_count).collect();
        rng.shuffle(&mut inverted);
        return Ok(inverted);
    }

    reporter.bisection_start(qg);

    partitioner.perform_partitioning(qg, level, reporter)?;
    info!(
        "Edge cut on level {}: {} (balance {:.3})",
        level,
        qg.data().edge_cut(),
        partition_balance(qg.data())
    );

    refiner.perform_refinement(qg, MAX_REFINEMENT_ITERATIONS, level, reporter);
    info!(
        "Edge cut after refinement: {} (balance {:.3})",
        qg.data().edge_cut(),
        partition_balance(qg.data())
    );

    let ([mut first, mut second], [map_first, map_second]) =
        qg.build_partition_induced_subgraphs();
    reporter.bisection_finish(qg, &first, &second);

    reporter.enter_first_branch();
    let lower = find_linear_arrangement(&mut first, level - 1, partitioner, refiner, reporter, rng)?;
    reporter.leave_first_branch();

    reporter.enter_second_branch();
    let higher =
        find_linear_arrangement(&mut second, level - 1, partitioner, refiner, reporter, rng)?;
    reporter.leave_second_branch();

    // lower block first, then the higher one, both through their id maps
    let offset = first.data().node_count();
    let mut inverted = vec![0; node_count];
    for position in 0..node_count {
        inverted[position] = if position < offset {
            map_first[lower[position]]
        } else {
            map_second[higher[position - offset]]
        };
    }
    Ok(inverted)
}

#[derive(Clone, Debug, Default)]
pub struct ProcessConfig {
    /// Free-form note stored with the report, e.g. the chosen backends.
    pub remark: String,
    /// Cap on the recursion depth; `0` means no cap beyond `⌊ln n⌋`.
    pub max_levels: usize,
    pub seed: u64,
    /// Also compute the quadtree sizes of the input and output orders.
    pub compute_quadtree: bool,
    /// Write the top-level bisection as a partition file.
    pub partition_output: Option<PathBuf>,
    /// Write the reordered graph in adjacency format.
    pub ordered_output: Option<PathBuf>,
}

/// Loads a graph, reorders it and reports the before/after metrics.
/// Returns the computed linear arrangement.
pub fn process_graph(
    graph_path: &Path,
    config: &ProcessConfig,
    partitioner: &mut dyn InitialPartitioner,
    refiner: &mut dyn Refiner,
    reporter: &mut dyn Reporter,
) -> Result<Vec<NodeId>, Error> {
    let graph = input::metis::read_graph(graph_path)?;
    let mut qg = QueryGraph::new(graph);
    qg.construct_query_edges();

    let identity = create_identity_layout(qg.data());
    let initial_loggap = calculate_loggap(qg.data(), &identity);
    let initial_log = calculate_log(qg.data(), &identity);
    let initial_quadtree = if config.compute_quadtree {
        calculate_quadtree_size(qg.data()) as i64
    } else {
        -1
    };
    reporter.start(
        &qg,
        &graph_path.display().to_string(),
        &config.remark,
        initial_loggap,
        initial_log,
        initial_quadtree,
    );

    let node_count = qg.data().node_count();
    let mut levels = if node_count > 0 {
        (node_count as f64).ln() as usize
    } else {
        0
    };
    if config.max_levels > 0 {
        levels = levels.min(config.max_levels);
    }
    info!("Reordering {node_count} nodes through {levels} recursion levels");

    let mut rng = WyRand::new_seed(config.seed);
    let inverted =
        find_linear_arrangement(&mut qg, levels, partitioner, refiner, reporter, &mut rng)?;
    let layout = invert_linear_layout(&inverted);

    if let Some(path) = &config.partition_output {
        input::write_partition(qg.data(), path)?;
    }
    if let Some(path) = &config.ordered_output {
        input::metis::write_graph(&apply_linear_layout(qg.data(), &layout), path)?;
    }

    let resulting_loggap = calculate_loggap(qg.data(), &layout);
    let resulting_log = calculate_log(qg.data(), &layout);
    let resulting_quadtree = if config.compute_quadtree {
        calculate_quadtree_size(&apply_linear_layout(qg.data(), &layout)) as i64
    } else {
        -1
    };
    reporter.finish(
        &qg,
        &layout,
        resulting_loggap,
        resulting_log,
        resulting_quadtree,
    );

    Ok(layout)
}
