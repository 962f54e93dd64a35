use nanorand::{Rng, WyRand};

use minloggap_graph::{PartitionId, QueryGraph};

use super::{validate_bisection, InitialPartitioner};
use crate::report::Reporter;
use crate::Error;

/// Assigns exactly `⌊n/2⌋` nodes to partition 1, uniformly at random.
///
/// The generator is seeded once at construction, so a fixed seed makes the
/// whole recursion deterministic while different levels still see
/// different shuffles.
pub struct RandomInitialPartitioner {
    rng: WyRand,
}

impl RandomInitialPartitioner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: WyRand::new_seed(seed),
        }
    }
}

impl InitialPartitioner for RandomInitialPartitioner {
    fn perform_partitioning(
        &mut self,
        qg: &mut QueryGraph<'_>,
        _level: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<(), Error> {
        reporter.initial_partitioning_start(qg);

        let node_count = qg.data().node_count();
        let mut blocks: Vec<PartitionId> = vec![0; node_count];
        for block in blocks.iter_mut().take(node_count / 2) {
            *block = 1;
        }
        self.rng.shuffle(&mut blocks);

        for (node, &block) in blocks.iter().enumerate() {
            qg.data_mut().set_partition_index(node, block);
        }

        validate_bisection(qg)?;
        reporter.initial_partitioning_finish(qg);
        Ok(())
    }
}
