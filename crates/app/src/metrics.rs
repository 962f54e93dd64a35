use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use nanorand::WyRand;

use minloggap::prelude::*;

/// Calculates the LogGap and Log costs of a graph.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Input graph in adjacency format
    graph: PathBuf,

    /// Evaluate a random permutation instead of the identity layout
    #[arg(short = 'r', long)]
    permute_randomly: bool,

    /// Seed for the random permutation; defaults to the current time
    #[arg(short, long)]
    seed: Option<u64>,

    /// Partition file to display additional partition metrics
    #[arg(short, long, value_name = "FILE")]
    partition: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), minloggap::Error> {
    let graph = input::metis::read_graph(&args.graph)?;
    let mut qg = QueryGraph::new(graph);
    qg.construct_query_edges();

    if let Some(partition_file) = &args.partition {
        let partition = input::read_partition(partition_file, qg.data().node_count())?;
        for (node, &block) in partition.iter().enumerate() {
            qg.data_mut().set_partition_index(node, block);
        }
    }

    let layout = if args.permute_randomly {
        let seed = args.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0)
        });
        log::info!("Evaluating a random permutation generated with seed {seed}");
        create_random_layout(qg.data(), &mut WyRand::new_seed(seed))
    } else {
        create_identity_layout(qg.data())
    };

    println!("=== Graph Metrics ===");
    println!("|Q| = {}", qg.number_of_query_nodes());
    println!("|V| = {}", qg.data().node_count());
    println!("|E| = {}", qg.data().edge_count());
    println!("LogGap: {} bits/gap", calculate_loggap(qg.data(), &layout));
    println!("Log: {} bits/edge", calculate_log(qg.data(), &layout));
    println!("Quadtree: {} bits", calculate_quadtree_size(qg.data()));

    if args.partition.is_some() {
        println!("=== Partition Metrics ===");
        println!("Balance: {}", partition_balance(qg.data()));
        println!("Cut edges: {}", qg.data().edge_cut());
        println!("Partition cost: {}", calculate_partition_cost(&qg));
    }

    Ok(())
}
