use std::path::Path;

use log::warn;
use rusqlite::{params, Connection};

use minloggap_graph::{NodeId, PartitionId, QueryGraph};

use super::{ReportContext, Reporter};
use crate::Error;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS `report` (
    `id` INTEGER PRIMARY KEY AUTOINCREMENT,
    `filename` TEXT,
    `remark` TEXT,
    `nodes` INTEGER,
    `edges` INTEGER,
    `initial_loggap` REAL,
    `initial_log` REAL,
    `initial_quadtree` INTEGER,
    `time` REAL,
    `resulting_loggap` REAL,
    `resulting_log` REAL,
    `resulting_quadtree` INTEGER,
    `creation_date` DATE DEFAULT (datetime('now', 'localtime'))
);
CREATE TABLE IF NOT EXISTS `bisection` (
    `id` INTEGER PRIMARY KEY AUTOINCREMENT,
    `rid` INTEGER,
    `branch` TEXT,
    `nodes` INTEGER,
    `edges` INTEGER,
    `p0_nodes` INTEGER,
    `p0_edges` INTEGER,
    `p1_nodes` INTEGER,
    `p1_edges` INTEGER,
    `initial_cut` INTEGER,
    `cut` INTEGER,
    `imbalance` INTEGER,
    `initial_partition_cost` REAL,
    `resulting_partition_cost` REAL,
    `partitioning_time` REAL,
    `refinement_time` REAL,
    FOREIGN KEY (rid) REFERENCES report(id)
);
CREATE TABLE IF NOT EXISTS `iteration` (
    `id` INTEGER PRIMARY KEY AUTOINCREMENT,
    `bid` INTEGER,
    `nth` INTEGER,
    `initial_partition_cost` REAL,
    `resulting_partition_cost` REAL,
    `num_moved_0to1` INTEGER,
    `num_moved_1to0` INTEGER,
    FOREIGN KEY (bid) REFERENCES bisection(id)
);
CREATE TABLE IF NOT EXISTS `movement` (
    `id` INTEGER PRIMARY KEY AUTOINCREMENT,
    `iid` INTEGER,
    `nodes0` INTEGER,
    `nodes1` INTEGER,
    `from` INTEGER,
    `to` INTEGER,
    `gain_total` REAL,
    `gain_adjacent` REAL,
    `gain_nonadjacent` REAL,
    `boundary` INTEGER,
    `deg_data0` INTEGER,
    `deg_data1` INTEGER,
    `deg_query` INTEGER,
    `deg_query0` INTEGER,
    `deg_query1` INTEGER,
    FOREIGN KEY (iid) REFERENCES iteration(id)
);
";

/// Records a run into the `report` / `bisection` / `iteration` /
/// `movement` tables of an SQLite database.
///
/// All rows of a run are written inside a single transaction that is
/// committed by [`close`](SqliteReporter::close) (or on drop). Statement
/// failures are latched: subsequent events are skipped and the first
/// error surfaces from `close`, so a broken sink never interrupts the
/// reordering itself.
pub struct SqliteReporter {
    ctx: ReportContext,
    connection: Connection,
    report_id: i64,
    bisection_id: i64,
    iteration_id: i64,
    num_moved_0to1: i64,
    num_moved_1to0: i64,
    committed: bool,
    failure: Option<rusqlite::Error>,
}

impl SqliteReporter {
    pub fn new<P: AsRef<Path>>(database: P) -> Result<Self, Error> {
        let connection = Connection::open(database)?;
        connection.execute_batch(SCHEMA)?;
        connection.execute_batch("BEGIN TRANSACTION;")?;

        Ok(Self {
            ctx: ReportContext::new(),
            connection,
            report_id: 0,
            bisection_id: 0,
            iteration_id: 0,
            num_moved_0to1: 0,
            num_moved_1to0: 0,
            committed: false,
            failure: None,
        })
    }

    /// Commits the run and surfaces the first statement failure, if any.
    pub fn close(mut self) -> Result<(), Error> {
        self.commit();
        match self.failure.take() {
            Some(failure) => Err(failure.into()),
            None => Ok(()),
        }
    }

    fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;
        if let Err(error) = self.connection.execute_batch("COMMIT TRANSACTION;") {
            warn!("Failed to commit report transaction: {error}");
            self.failure.get_or_insert(error);
        }
    }

    fn record(&mut self, operation: impl FnOnce(&Connection) -> rusqlite::Result<()>) {
        if self.failure.is_some() {
            return;
        }
        if let Err(error) = operation(&self.connection) {
            warn!("Failed to record report event: {error}");
            self.failure = Some(error);
        }
    }
}

impl Drop for SqliteReporter {
    fn drop(&mut self) {
        self.commit();
    }
}

impl Reporter for SqliteReporter {
    fn start(
        &mut self,
        qg: &QueryGraph<'_>,
        filename: &str,
        remark: &str,
        initial_loggap: f64,
        initial_log: f64,
        initial_quadtree: i64,
    ) {
        self.ctx
            .on_start(filename, initial_loggap, initial_log, initial_quadtree);

        let nodes = qg.data().node_count() as i64;
        let edges = qg.data().edge_count() as i64;
        self.record(|connection| {
            connection.execute(
                "INSERT INTO `report` (`filename`, `remark`, `nodes`, `edges`, \
                 `initial_loggap`, `initial_log`, `initial_quadtree`) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![filename, remark, nodes, edges, initial_loggap, initial_log, initial_quadtree],
            )?;
            Ok(())
        });
        self.report_id = self.connection.last_insert_rowid();
    }

    fn finish(
        &mut self,
        _qg: &QueryGraph<'_>,
        _layout: &[NodeId],
        resulting_loggap: f64,
        resulting_log: f64,
        resulting_quadtree: i64,
    ) {
        let elapsed = self.ctx.global_timer.elapsed().as_secs_f64();
        let report_id = self.report_id;
        self.record(|connection| {
            connection.execute(
                "UPDATE `report` SET `time` = ?1, `resulting_loggap` = ?2, \
                 `resulting_log` = ?3, `resulting_quadtree` = ?4 WHERE `id` = ?5;",
                params![elapsed, resulting_loggap, resulting_log, resulting_quadtree, report_id],
            )?;
            Ok(())
        });
        self.commit();
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
        let report_id = self.report_id;
        let branch = self.ctx.branch.clone();
        let nodes = qg.data().node_count() as i64;
        let edges = qg.data().edge_count() as i64;
        self.record(|connection| {
            connection.execute(
                "INSERT INTO `bisection` (`rid`, `branch`, `nodes`, `edges`) \
                 VALUES (?1, ?2, ?3, ?4);",
                params![report_id, branch, nodes, edges],
            )?;
            Ok(())
        });
        self.bisection_id = self.connection.last_insert_rowid();
    }

    fn bisection_finish(
        &mut self,
        qg: &QueryGraph<'_>,
        first_subgraph: &QueryGraph<'_>,
        second_subgraph: &QueryGraph<'_>,
    ) {
        let first_nodes = first_subgraph.data().node_count();
        let second_nodes = second_subgraph.data().node_count();
        let imbalance = 100.0 * first_nodes.abs_diff(second_nodes) as f64
            / (first_nodes + second_nodes) as f64;

        let cut = qg.data().edge_cut() as i64;
        let bisection_id = self.bisection_id;
        self.record(|connection| {
            connection.execute(
                "UPDATE `bisection` SET `p0_nodes` = ?1, `p0_edges` = ?2, `p1_nodes` = ?3, \
                 `p1_edges` = ?4, `cut` = ?5, `imbalance` = ?6 WHERE `id` = ?7;",
                params![
                    first_nodes as i64,
                    first_subgraph.data().edge_count() as i64,
                    second_nodes as i64,
                    second_subgraph.data().edge_count() as i64,
                    cut,
                    imbalance as i64,
                    bisection_id
                ],
            )?;
            Ok(())
        });
    }

    fn initial_partitioning_start(&mut self, _qg: &QueryGraph<'_>) {
        self.ctx.on_partitioning_start();
    }

    fn initial_partitioning_finish(&mut self, qg: &QueryGraph<'_>) {
        let elapsed = self.ctx.partitioning_timer.elapsed().as_secs_f64();
        let cut = qg.data().edge_cut() as i64;
        let bisection_id = self.bisection_id;
        self.record(|connection| {
            connection.execute(
                "UPDATE `bisection` SET `partitioning_time` = ?1, `initial_cut` = ?2 \
                 WHERE `id` = ?3;",
                params![elapsed, cut, bisection_id],
            )?;
            Ok(())
        });
    }

    fn refinement_start(&mut self, _qg: &QueryGraph<'_>, initial_partition_cost: f64) {
        self.ctx.on_refinement_start(initial_partition_cost);
        let bisection_id = self.bisection_id;
        self.record(|connection| {
            connection.execute(
                "UPDATE `bisection` SET `initial_partition_cost` = ?1 WHERE `id` = ?2;",
                params![initial_partition_cost, bisection_id],
            )?;
            Ok(())
        });
    }

    fn refinement_finish(
        &mut self,
        _qg: &QueryGraph<'_>,
        _iterations_executed: usize,
        resulting_partition_cost: f64,
    ) {
        let elapsed = self.ctx.refinement_timer.elapsed().as_secs_f64();
        let bisection_id = self.bisection_id;
        self.record(|connection| {
            connection.execute(
                "UPDATE `bisection` SET `resulting_partition_cost` = ?1, `refinement_time` = ?2 \
                 WHERE `id` = ?3;",
                params![resulting_partition_cost, elapsed, bisection_id],
            )?;
            Ok(())
        });
    }

    fn refinement_iteration_start(
        &mut self,
        _qg: &QueryGraph<'_>,
        nth_iteration: usize,
        initial_partition_cost: f64,
    ) {
        self.ctx
            .on_iteration_start(nth_iteration, initial_partition_cost);

        let bisection_id = self.bisection_id;
        self.record(|connection| {
            connection.execute(
                "INSERT INTO `iteration` (`bid`, `nth`, `initial_partition_cost`) \
                 VALUES (?1, ?2, ?3);",
                params![bisection_id, nth_iteration as i64, initial_partition_cost],
            )?;
            Ok(())
        });
        self.iteration_id = self.connection.last_insert_rowid();
        self.num_moved_0to1 = 0;
        self.num_moved_1to0 = 0;
    }

    fn refinement_move_node(
        &mut self,
        qg: &QueryGraph<'_>,
        node: NodeId,
        from_partition: PartitionId,
        gain_total: f64,
        gain_adjacent: f64,
        gain_nonadjacent: f64,
        is_boundary: bool,
    ) {
        // the node has already switched sides when the move is reported;
        // the recorded degrees and sizes describe the state just before
        let mut data_degrees = [0i64; 2];
        for &neighbor in qg.data().neighbors(node) {
            data_degrees[qg.data().partition_index(neighbor)] += 1;
        }

        let adjacent_query_nodes = qg.adjacent_query_nodes(node);
        let mut query_degrees = [0i64; 2];
        for &query_node in adjacent_query_nodes {
            let degrees = qg.count_query_node_degrees(query_node);
            query_degrees[0] += degrees[0] as i64;
            query_degrees[1] += degrees[1] as i64;
        }
        query_degrees[from_partition] += adjacent_query_nodes.len() as i64;
        query_degrees[1 - from_partition] -= adjacent_query_nodes.len() as i64;

        let mut partition_sizes = qg.count_partition_sizes();
        partition_sizes[from_partition] += 1;
        partition_sizes[1 - from_partition] -= 1;

        let iteration_id = self.iteration_id;
        self.record(|connection| {
            connection.execute(
                "INSERT INTO `movement` (`iid`, `nodes0`, `nodes1`, `from`, `to`, \
                 `gain_total`, `gain_adjacent`, `gain_nonadjacent`, `boundary`, \
                 `deg_data0`, `deg_data1`, `deg_query`, `deg_query0`, `deg_query1`) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
                params![
                    iteration_id,
                    partition_sizes[0] as i64,
                    partition_sizes[1] as i64,
                    from_partition as i64,
                    (1 - from_partition) as i64,
                    gain_total,
                    gain_adjacent,
                    gain_nonadjacent,
                    is_boundary as i64,
                    data_degrees[0],
                    data_degrees[1],
                    adjacent_query_nodes.len() as i64,
                    query_degrees[0],
                    query_degrees[1]
                ],
            )?;
            Ok(())
        });

        if from_partition == 1 {
            self.num_moved_1to0 += 1;
        } else {
            self.num_moved_0to1 += 1;
        }
    }

    fn refinement_iteration_finish(
        &mut self,
        _qg: &QueryGraph<'_>,
        _num_nodes_exchanged: usize,
        resulting_partition_cost: f64,
    ) {
        let iteration_id = self.iteration_id;
        let moved_0to1 = self.num_moved_0to1;
        let moved_1to0 = self.num_moved_1to0;
        self.record(|connection| {
            connection.execute(
                "UPDATE `iteration` SET `resulting_partition_cost` = ?1, \
                 `num_moved_0to1` = ?2, `num_moved_1to0` = ?3 WHERE `id` = ?4;",
                params![resulting_partition_cost, moved_0to1, moved_1to0, iteration_id],
            )?;
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minloggap_graph::gen;

    #[test]
    fn records_a_report_row() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut qg = QueryGraph::new(gen::cycle(6));
        qg.construct_query_edges();

        let mut reporter = SqliteReporter::new(file.path()).unwrap();
        reporter.start(&qg, "cycle.graph", "test", 2.0, 1.5, -1);
        reporter.bisection_start(&qg);
        reporter.finish(&qg, &[0, 1, 2, 3, 4, 5], 1.8, 1.2, -1);
        reporter.close().unwrap();

        let connection = Connection::open(file.path()).unwrap();
        let (filename, nodes, loggap): (String, i64, f64) = connection
            .query_row(
                "SELECT filename, nodes, resulting_loggap FROM report;",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(filename, "cycle.graph");
        assert_eq!(nodes, 6);
        assert!((loggap - 1.8).abs() < 1e-12);

        let branches: i64 = connection
            .query_row("SELECT count(*) FROM bisection;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(branches, 1);
    }

    #[test]
    fn movement_rows_describe_the_pre_move_state() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut qg = QueryGraph::new(gen::cycle(4));
        qg.construct_query_edges();

        let mut reporter = SqliteReporter::new(file.path()).unwrap();
        reporter.start(&qg, "cycle.graph", "test", 0.0, 0.0, -1);
        reporter.bisection_start(&qg);
        reporter.refinement_start(&qg, 0.0);
        reporter.refinement_iteration_start(&qg, 0, 0.0);

        // move node 0 from block 0 to block 1 and report it
        qg.data_mut().set_partition_index(0, 1);
        reporter.refinement_move_node(&qg, 0, 0, 1.0, 0.5, 0.5, true);
        reporter.refinement_iteration_finish(&qg, 2, 0.0);
        reporter.close().unwrap();

        let connection = Connection::open(file.path()).unwrap();
        let (nodes0, from, deg_query): (i64, i64, i64) = connection
            .query_row(
                "SELECT nodes0, `from`, deg_query FROM movement;",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(nodes0, 4);
        assert_eq!(from, 0);
        assert_eq!(deg_query, 2);

        let (moved_0to1, moved_1to0): (i64, i64) = connection
            .query_row(
                "SELECT num_moved_0to1, num_moved_1to0 FROM iteration;",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(moved_0to1, 1);
        assert_eq!(moved_1to0, 0);
    }
}
