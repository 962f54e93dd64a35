use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use nanorand::WyRand;

use minloggap_graph::prelude::*;

/// Applies a linear layout to a graph and writes the reordered graph.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Input graph in adjacency format
    input: PathBuf,

    /// Output file for the reordered graph
    output: PathBuf,

    /// Apply a random linear layout
    #[arg(short, long, conflicts_with = "layout")]
    randomly: bool,

    /// Seed for the random layout; defaults to the current time
    #[arg(short, long, requires = "randomly")]
    seed: Option<u64>,

    /// File holding the linear layout, one position per line
    #[arg(short, long, value_name = "FILE", required_unless_present = "randomly")]
    layout: Option<PathBuf>,
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

fn run(args: &Args) -> Result<(), Error> {
    let graph = input::metis::read_graph(&args.input)?;

    let layout = if args.randomly {
        let seed = args.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0)
        });
        log::info!("Applying a random permutation generated with seed {seed}");
        create_random_layout(&graph, &mut WyRand::new_seed(seed))
    } else {
        // clap guarantees the layout file is present in this branch
        let path = args.layout.as_ref().ok_or_else(|| Error::MalformedLayout {
            line: 0,
            message: "no layout file given".to_string(),
        })?;
        log::info!("Applying the linear layout read from {path:?}");
        input::read_layout(path, graph.node_count())?
    };

    let reordered = apply_linear_layout(&graph, &layout);
    input::metis::write_graph(&reordered, &args.output)?;

    Ok(())
}
