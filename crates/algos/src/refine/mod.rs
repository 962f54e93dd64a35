//! Partition refinement: local search that lowers the partition cost of a
//! bisection before the recursion descends.

mod basic;
mod fm;
mod quadtree;

pub use basic::BasicRefiner;
pub use fm::FmRefiner;
pub use quadtree::FmQuadtreeRefiner;

use minloggap_graph::QueryGraph;

use crate::cost::calculate_partition_cost;
use crate::report::Reporter;

pub(crate) const DEFAULT_IMBALANCE: u32 = 3;

/// A refinement algorithm. Implementations provide a single iteration;
/// the provided [`perform_refinement`](Refiner::perform_refinement) drives
/// iterations until no vertex moves anymore or the iteration budget is
/// spent.
pub trait Refiner {
    /// Allowed imbalance in percent on levels selected by
    /// [`imbalance_level`](Refiner::imbalance_level).
    fn imbalance(&self) -> u32;

    /// The configured imbalance applies on every `imbalance_level`-th
    /// recursion level; other levels fall back to the default of 3
    /// percent.
    fn imbalance_level(&self) -> usize;

    /// Runs one refinement iteration and returns the number of vertices
    /// that changed sides. Returning zero signals convergence, never an
    /// error.
    fn perform_refinement_iteration(
        &mut self,
        qg: &mut QueryGraph<'_>,
        nth_iteration: usize,
        imbalance: u32,
        reporter: &mut dyn Reporter,
    ) -> usize;

    fn perform_refinement(
        &mut self,
        qg: &mut QueryGraph<'_>,
        max_iterations: usize,
        level: usize,
        reporter: &mut dyn Reporter,
    ) {
        let initial_cost = calculate_partition_cost(qg);
        reporter.refinement_start(qg, initial_cost);

        let mut cost = initial_cost;
        let mut iterations_executed = 0;
        for nth_iteration in 0..max_iterations {
            let imbalance = if level % self.imbalance_level() == 0 {
                self.imbalance()
            } else {
                DEFAULT_IMBALANCE
            };

            reporter.refinement_iteration_start(qg, nth_iteration, cost);
            let nodes_moved =
                self.perform_refinement_iteration(qg, nth_iteration, imbalance, reporter);
            cost = calculate_partition_cost(qg);
            reporter.refinement_iteration_finish(qg, nodes_moved, cost);

            if nodes_moved == 0 {
                iterations_executed = nth_iteration;
                break;
            }
            iterations_executed = nth_iteration + 1;
        }

        reporter.refinement_finish(qg, iterations_executed, cost);
    }
}
