//! Initial partitioners: everything that produces the first bisection of a
//! recursion level before a refiner takes over.

mod multilevel;
mod random;

pub use multilevel::{MultilevelConfig, MultilevelInitialPartitioner, Preset};
pub use random::RandomInitialPartitioner;

use minloggap_graph::QueryGraph;

use crate::report::Reporter;
use crate::Error;

/// Computes a bisection of the underlying data graph of `qg` by assigning
/// every node a partition index of `0` or `1`.
pub trait InitialPartitioner {
    fn perform_partitioning(
        &mut self,
        qg: &mut QueryGraph<'_>,
        level: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<(), Error>;
}

/// A bisection that leaves one side empty on a non-trivial graph cannot be
/// recursed on and is treated as a partitioner failure.
pub(crate) fn validate_bisection(qg: &QueryGraph<'_>) -> Result<(), Error> {
    let sizes = qg.count_partition_sizes();
    if qg.data().node_count() > 1 && (sizes[0] == 0 || sizes[1] == 0) {
        return Err(Error::InvalidPartitioning);
    }
    Ok(())
}
