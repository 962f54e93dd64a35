use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use minloggap_graph::prelude::*;

/// Generates graphs of a few synthetic families.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Output file in adjacency format
    output: PathBuf,

    #[command(subcommand)]
    family: Family,
}

#[derive(Debug, Subcommand)]
enum Family {
    /// A complete graph
    Clique { size: usize },
    /// Two cliques, optionally bridged by a single edge
    Biclique {
        size0: usize,
        size1: usize,
        #[arg(long)]
        connected: bool,
    },
    /// A chain of cliques of increasing size
    IncreasingCliques { count: usize },
    /// A ring
    Cycle { size: usize },
    /// A ring with chords to the opposite side; the size must be even
    CycleWithChords { size: usize },
    /// A square grid
    Rect { size: usize },
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

    let graph = match build(&args.family) {
        Ok(graph) => graph,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "Generated graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count() / 2
    );

    if let Err(error) = input::metis::write_graph(&graph, &args.output) {
        eprintln!("Error: {error}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn build(family: &Family) -> Result<CsrGraph, String> {
    match *family {
        Family::Clique { size } => {
            if size == 0 {
                return Err("the clique size must be greater than zero".to_string());
            }
            Ok(gen::clique(size))
        }
        Family::Biclique {
            size0,
            size1,
            connected,
        } => {
            if size0 == 0 || size1 == 0 {
                return Err("both clique sizes must be greater than zero".to_string());
            }
            Ok(gen::biclique(size0, size1, connected))
        }
        Family::IncreasingCliques { count } => {
            if count == 0 {
                return Err("the clique count must be greater than zero".to_string());
            }
            Ok(gen::increasing_cliques(count))
        }
        Family::Cycle { size } => {
            if size < 3 {
                return Err("a cycle needs at least 3 nodes".to_string());
            }
            Ok(gen::cycle(size))
        }
        Family::CycleWithChords { size } => {
            if size < 4 || size % 2 != 0 {
                return Err("only even node counts of at least 4 are supported".to_string());
            }
            Ok(gen::cycle_with_chords(size))
        }
        Family::Rect { size } => {
            if size == 0 {
                return Err("the grid size must be greater than zero".to_string());
            }
            Ok(gen::rectangle(size))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_parse_with_their_parameters() {
        let args = Args::parse_from(["graphgen", "out.graph", "biclique", "4", "5", "--connected"]);
        match args.family {
            Family::Biclique {
                size0,
                size1,
                connected,
            } => {
                assert_eq!((size0, size1), (4, 5));
                assert!(connected);
            }
            other => panic!("unexpected family {other:?}"),
        }
    }

    #[test]
    fn invalid_parameters_are_reported() {
        assert!(build(&Family::Cycle { size: 2 }).is_err());
        assert!(build(&Family::CycleWithChords { size: 7 }).is_err());
        assert!(build(&Family::Clique { size: 0 }).is_err());
    }
}
