use log::{debug, info};

use minloggap_graph::{NodeId, PartitionId, QueryGraph};

use super::{ReportContext, Reporter};

/// Prints the graph metrics to standard output and narrates the recursion
/// through the log.
#[derive(Default)]
pub struct CliReporter {
    ctx: ReportContext,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            ctx: ReportContext::new(),
        }
    }
}

impl Reporter for CliReporter {
    fn start(
        &mut self,
        _qg: &QueryGraph<'_>,
        filename: &str,
        remark: &str,
        initial_loggap: f64,
        initial_log: f64,
        initial_quadtree: i64,
    ) {
        self.ctx
            .on_start(filename, initial_loggap, initial_log, initial_quadtree);

        info!("Processing {filename} ({remark})");
        println!("initial_loggap = {initial_loggap}");
        println!("initial_log = {initial_log}");
        println!("initial_quadtree = {initial_quadtree}");
    }

    fn finish(
        &mut self,
        _qg: &QueryGraph<'_>,
        _layout: &[NodeId],
        resulting_loggap: f64,
        resulting_log: f64,
        resulting_quadtree: i64,
    ) {
        info!(
            "Reordered {} in {:.3}s: loggap {:.4} -> {:.4}, log {:.4} -> {:.4}, quadtree {} -> {}",
            self.ctx.filename,
            self.ctx.global_timer.elapsed().as_secs_f64(),
            self.ctx.initial_loggap,
            resulting_loggap,
            self.ctx.initial_log,
            resulting_log,
            self.ctx.initial_quadtree,
            resulting_quadtree
        );
        println!("resulting_loggap = {resulting_loggap}");
        println!("resulting_log = {resulting_log}");
        println!("resulting_quadtree = {resulting_quadtree}");
    }

    fn enter_first_branch(&mut self) {
        self.ctx.on_enter_branch('0');
    }

    fn leave_first_branch(&mut self) {
        self.ctx.on_leave_branch();
    }

    fn enter_second_branch(&mut self) {
        self.ctx.on_enter_branch('1');
    }

    fn leave_second_branch(&mut self) {
        self.ctx.on_leave_branch();
    }

    fn bisection_start(&mut self, qg: &QueryGraph<'_>) {
        debug!(
            "Bisecting branch \"{}\" ({} nodes)",
            self.ctx.branch,
            qg.data().node_count()
        );
    }

    fn bisection_finish(
        &mut self,
        _qg: &QueryGraph<'_>,
        first_subgraph: &QueryGraph<'_>,
        second_subgraph: &QueryGraph<'_>,
    ) {
        debug!(
            "Branch \"{}\" split into {} and {} nodes in {:.3}s",
            self.ctx.branch,
            first_subgraph.data().node_count(),
            second_subgraph.data().node_count(),
            self.ctx.branch_timer.elapsed().as_secs_f64()
        );
    }

    fn initial_partitioning_start(&mut self, _qg: &QueryGraph<'_>) {
        self.ctx.on_partitioning_start();
    }

    fn initial_partitioning_finish(&mut self, qg: &QueryGraph<'_>) {
        debug!(
            "Initial partitioning cut {} edges in {:.3}s",
            qg.data().edge_cut(),
            self.ctx.partitioning_timer.elapsed().as_secs_f64()
        );
    }

    fn refinement_start(&mut self, _qg: &QueryGraph<'_>, initial_partition_cost: f64) {
        self.ctx.on_refinement_start(initial_partition_cost);
    }

    fn refinement_finish(
        &mut self,
        _qg: &QueryGraph<'_>,
        iterations_executed: usize,
        resulting_partition_cost: f64,
    ) {
        debug!(
            "Refined partition cost {:.3} -> {:.3} in {} iterations ({:.3}s)",
            self.ctx.refinement_initial_cost,
            resulting_partition_cost,
            iterations_executed,
            self.ctx.refinement_timer.elapsed().as_secs_f64()
        );
    }

    fn refinement_iteration_start(
        &mut self,
        _qg: &QueryGraph<'_>,
        nth_iteration: usize,
        initial_partition_cost: f64,
    ) {
        self.ctx
            .on_iteration_start(nth_iteration, initial_partition_cost);
    }

    fn refinement_move_node(
        &mut self,
        _qg: &QueryGraph<'_>,
        _node: NodeId,
        _from_partition: PartitionId,
        _gain_total: f64,
        _gain_adjacent: f64,
        _gain_nonadjacent: f64,
        _is_boundary: bool,
    ) {
    }

    fn refinement_iteration_finish(
        &mut self,
        _qg: &QueryGraph<'_>,
        num_nodes_exchanged: usize,
        resulting_partition_cost: f64,
    ) {
        debug!(
            "Iteration {} moved {} nodes (cost {:.3} -> {:.3})",
            self.ctx.nth_iteration,
            num_nodes_exchanged,
            self.ctx.iteration_initial_cost,
            resulting_partition_cost
        );
    }
}
