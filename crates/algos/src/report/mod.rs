//! Progress and result reporting for reordering runs.
//!
//! The driver emits a fixed set of events while it walks the bisection
//! tree; a [`Reporter`] turns them into console output ([`CliReporter`])
//! or rows in a relational database ([`SqliteReporter`]). The shared
//! bookkeeping (branch path, phase timers) lives in [`ReportContext`],
//! which every implementation embeds.

mod cli;
mod sqlite;

pub use cli::CliReporter;
pub use sqlite::SqliteReporter;

use std::time::Instant;

use minloggap_graph::{NodeId, PartitionId, QueryGraph};

pub trait Reporter {
    fn start(
        &mut self,
        qg: &QueryGraph<'_>,
        filename: &str,
        remark: &str,
        initial_loggap: f64,
        initial_log: f64,
        initial_quadtree: i64,
    );

    fn finish(
        &mut self,
        qg: &QueryGraph<'_>,
        layout: &[NodeId],
        resulting_loggap: f64,
        resulting_log: f64,
        resulting_quadtree: i64,
    );

    fn enter_first_branch(&mut self);

    fn leave_first_branch(&mut self);

    fn enter_second_branch(&mut self);

    fn leave_second_branch(&mut self);

    fn bisection_start(&mut self, qg: &QueryGraph<'_>);

    fn bisection_finish(
        &mut self,
        qg: &QueryGraph<'_>,
        first_subgraph: &QueryGraph<'_>,
        second_subgraph: &QueryGraph<'_>,
    );

    fn initial_partitioning_start(&mut self, qg: &QueryGraph<'_>);

    fn initial_partitioning_finish(&mut self, qg: &QueryGraph<'_>);

    fn refinement_start(&mut self, qg: &QueryGraph<'_>, initial_partition_cost: f64);

    fn refinement_finish(
        &mut self,
        qg: &QueryGraph<'_>,
        iterations_executed: usize,
        resulting_partition_cost: f64,
    );

    fn refinement_iteration_start(
        &mut self,
        qg: &QueryGraph<'_>,
        nth_iteration: usize,
        initial_partition_cost: f64,
    );

    #[allow(clippy::too_many_arguments)]
    fn refinement_move_node(
        &mut self,
        qg: &QueryGraph<'_>,
        node: NodeId,
        from_partition: PartitionId,
        gain_total: f64,
        gain_adjacent: f64,
        gain_nonadjacent: f64,
        is_boundary: bool,
    );

    fn refinement_iteration_finish(
        &mut self,
        qg: &QueryGraph<'_>,
        num_nodes_exchanged: usize,
        resulting_partition_cost: f64,
    );
}

/// Bookkeeping shared by all reporter implementations.
pub struct ReportContext {
    pub(crate) filename: String,
    pub(crate) branch: String,
    pub(crate) recursion_level: usize,
    pub(crate) nth_iteration: usize,
    pub(crate) initial_loggap: f64,
    pub(crate) initial_log: f64,
    pub(crate) initial_quadtree: i64,
    pub(crate) refinement_initial_cost: f64,
    pub(crate) iteration_initial_cost: f64,
    pub(crate) global_timer: Instant,
    pub(crate) branch_timer: Instant,
    pub(crate) partitioning_timer: Instant,
    pub(crate) refinement_timer: Instant,
}

impl ReportContext {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            filename: String::new(),
            branch: String::new(),
            recursion_level: 0,
            nth_iteration: 0,
            initial_loggap: 0.0,
            initial_log: 0.0,
            initial_quadtree: -1,
            refinement_initial_cost: 0.0,
            iteration_initial_cost: 0.0,
            global_timer: now,
            branch_timer: now,
            partitioning_timer: now,
            refinement_timer: now,
        }
    }

    pub(crate) fn on_start(
        &mut self,
        filename: &str,
        initial_loggap: f64,
        initial_log: f64,
        initial_quadtree: i64,
    ) {
        self.filename = filename.to_string();
        self.initial_loggap = initial_loggap;
        self.initial_log = initial_log;
        self.initial_quadtree = initial_quadtree;
        self.global_timer = Instant::now();
    }

    pub(crate) fn on_enter_branch(&mut self, branch: char) {
        self.recursion_level += 1;
        self.branch.push(branch);
        self.branch_timer = Instant::now();
    }

    pub(crate) fn on_leave_branch(&mut self) {
        assert!(self.recursion_level > 0);
        assert!(!self.branch.is_empty());

        self.recursion_level -= 1;
        self.branch.pop();
    }

    pub(crate) fn on_partitioning_start(&mut self) {
        self.partitioning_timer = Instant::now();
    }

    pub(crate) fn on_refinement_start(&mut self, initial_partition_cost: f64) {
        self.refinement_initial_cost = initial_partition_cost;
        self.refinement_timer = Instant::now();
    }

    pub(crate) fn on_iteration_start(&mut self, nth_iteration: usize, initial_partition_cost: f64) {
        self.nth_iteration = nth_iteration;
        self.iteration_initial_cost = initial_partition_cost;
    }
}

impl Default for ReportContext {
    fn default() -> Self {
        Self::new()
    }
}
