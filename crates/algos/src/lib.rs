//! Recursive-bisection graph reordering.
//!
//! The crate computes a linear arrangement, i.e. a bijection from the nodes
//! of an undirected graph to the positions `0..n`, that makes delta-encoded
//! adjacency lists cheap to compress. It does so by recursively bisecting
//! the graph: every level asks an [initial partitioner](partitioner) for a
//! balanced two-way split, improves the split with a
//! [refiner](refine) that minimizes the partition cost function from
//! [`cost`], extracts the two partition-induced query subgraphs and
//! recurses. The concatenated leaf orders form the arrangement.
//!
//! ```
//! use minloggap::prelude::*;
//!
//! let graph = gen::biclique(8, 8, true);
//! let mut qg = QueryGraph::new(graph);
//! qg.construct_query_edges();
//!
//! let mut partitioner = RandomInitialPartitioner::new(42);
//! let mut refiner = FmRefiner::default();
//! let mut reporter = CliReporter::new();
//! let mut rng = nanorand::WyRand::new_seed(42);
//!
//! let inverted =
//!     find_linear_arrangement(&mut qg, 3, &mut partitioner, &mut refiner, &mut reporter, &mut rng)
//!         .unwrap();
//! let layout = invert_linear_layout(&inverted);
//!
//! assert!(calculate_loggap(qg.data(), &layout) >= 0.0);
//! ```

mod arrangement;
pub mod cost;
pub mod partitioner;
pub mod refine;
pub mod report;

pub use crate::arrangement::{find_linear_arrangement, process_graph, ProcessConfig};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] minloggap_graph::Error),
    #[error("initial partitioning produced an invalid bisection")]
    InvalidPartitioning,
    #[error("error while writing report")]
    Report {
        #[from]
        source: rusqlite::Error,
    },
}

pub mod prelude {
    pub use crate::arrangement::{find_linear_arrangement, process_graph, ProcessConfig};
    pub use crate::cost::{
        calculate_log, calculate_loggap, calculate_mla_cost, calculate_partition_cost,
        calculate_quadtree_size, is_boundary_node, partition_balance,
    };
    pub use crate::partitioner::{
        InitialPartitioner, MultilevelConfig, MultilevelInitialPartitioner, Preset,
        RandomInitialPartitioner,
    };
    pub use crate::refine::{BasicRefiner, FmQuadtreeRefiner, FmRefiner, Refiner};
    pub use crate::report::{CliReporter, Reporter, SqliteReporter};
    pub use crate::Error;
    pub use minloggap_graph::prelude::*;
}
