use minloggap::prelude::*;
use nanorand::WyRand;

fn pipeline_layout(graph: CsrGraph, levels: usize, seed: u64) -> Vec<NodeId> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut qg = QueryGraph::new(graph);
    qg.construct_query_edges();

    let mut partitioner = RandomInitialPartitioner::new(seed);
    let mut refiner = FmRefiner::default();
    let mut reporter = CliReporter::new();
    let mut rng = WyRand::new_seed(seed);

    let inverted = find_linear_arrangement(
        &mut qg,
        levels,
        &mut partitioner,
        &mut refiner,
        &mut reporter,
        &mut rng,
    )
    .unwrap();
    invert_linear_layout(&inverted)
}

#[test]
fn single_vertex_graph_yields_the_trivial_layout() {
    let layout = pipeline_layout(gen::clique(1), 7, 3);
    assert_eq!(layout, vec![0]);
}

#[test]
fn two_vertex_graph_yields_a_valid_layout_with_log_cost_one() {
    let mut builder = CsrGraph::start_construction(2, 2);
    let a = builder.new_node();
    builder.new_edge(a, 1);
    let b = builder.new_node();
    builder.new_edge(b, 0);
    let graph = builder.finish_construction();

    let layout = pipeline_layout(graph.clone(), 3, 11);

    let mut sorted = layout.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1]);
    assert_eq!(calculate_log(&graph, &layout), 1.0);
}

#[test]
fn bridged_cliques_beat_a_random_layout() {
    let graph = gen::biclique(4, 4, true);

    let arranged = pipeline_layout(graph.clone(), 4, 42);
    let arranged_loggap = calculate_loggap(&graph, &arranged);

    let mut rng = WyRand::new_seed(1234);
    let samples = 20;
    let mut random_total = 0.0;
    for _ in 0..samples {
        let layout = create_random_layout(&graph, &mut rng);
        random_total += calculate_loggap(&graph, &layout);
    }
    let random_mean = random_total / samples as f64;

    assert!(
        arranged_loggap < random_mean,
        "arranged loggap {arranged_loggap} should beat the random mean {random_mean}"
    );
}

#[test]
fn refined_bisections_keep_the_query_invariants() {
    let mut qg = QueryGraph::new(gen::increasing_cliques(5));
    qg.construct_query_edges();
    let query_edges = qg.number_of_query_edges();

    let mut partitioner = RandomInitialPartitioner::new(5);
    let mut refiner = BasicRefiner::default();
    let mut reporter = CliReporter::new();
    partitioner
        .perform_partitioning(&mut qg, 1, &mut reporter)
        .unwrap();
    refiner.perform_refinement(&mut qg, 20, 1, &mut reporter);

    let ([first, second], _) = qg.build_partition_induced_subgraphs();
    assert_eq!(
        first.data().node_count() + second.data().node_count(),
        qg.data().node_count()
    );
    assert_eq!(
        first.number_of_query_edges() + second.number_of_query_edges(),
        query_edges
    );
}

#[test]
fn process_graph_reports_to_sqlite_and_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let graph_path = dir.path().join("cycle.graph");
    let partition_path = dir.path().join("cycle.partition");
    let ordered_path = dir.path().join("cycle.reordered.graph");
    let database_path = dir.path().join("report.db");

    input::metis::write_graph(&gen::cycle_with_chords(16), &graph_path).unwrap();

    let mut partitioner =
        MultilevelInitialPartitioner::new(MultilevelConfig::new(Preset::FastSocial, 99));
    let mut refiner = BasicRefiner::default();
    let mut reporter = SqliteReporter::new(&database_path).unwrap();

    let config = ProcessConfig {
        remark: "kahip,basic".to_string(),
        max_levels: 3,
        seed: 99,
        compute_quadtree: true,
        partition_output: Some(partition_path.clone()),
        ordered_output: Some(ordered_path.clone()),
    };
    let layout = process_graph(
        &graph_path,
        &config,
        &mut partitioner,
        &mut refiner,
        &mut reporter,
    )
    .unwrap();
    reporter.close().unwrap();

    let mut sorted = layout.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..16).collect::<Vec<_>>());

    // the reordered graph and the partition file are readable again
    let reordered = input::metis::read_graph(&ordered_path).unwrap();
    assert_eq!(reordered.node_count(), 16);
    assert_eq!(reordered.edge_count(), 48);
    let partition = input::read_partition(&partition_path, 16).unwrap();
    assert_eq!(partition.len(), 16);

    let connection = rusqlite::Connection::open(&database_path).unwrap();
    let (remark, bisections): (String, i64) = connection
        .query_row(
            "SELECT report.remark, count(bisection.id) FROM report, bisection \
             WHERE bisection.rid = report.id;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(remark, "kahip,basic");
    assert!(bisections >= 1);

    let resulting_loggap: f64 = connection
        .query_row("SELECT resulting_loggap FROM report;", [], |row| row.get(0))
        .unwrap();
    assert!(resulting_loggap >= 0.0);
}

#[test]
fn unreadable_graphs_are_an_input_error() {
    let mut partitioner = RandomInitialPartitioner::new(1);
    let mut refiner = FmRefiner::default();
    let mut reporter = CliReporter::new();

    let result = process_graph(
        std::path::Path::new("/nonexistent/graph.metis"),
        &ProcessConfig::default(),
        &mut partitioner,
        &mut refiner,
        &mut reporter,
    );

    assert!(matches!(
        result,
        Err(minloggap::Error::Graph(
            minloggap_graph::Error::IoError { .. }
        ))
    ));
}
