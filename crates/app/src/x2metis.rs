use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use minloggap_graph::prelude::*;

/// Converts edge-list graph formats to the adjacency format.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Format of the input file
    #[arg(short, long, value_enum)]
    format: Format,

    /// Input file
    input: PathBuf,

    /// Output file in adjacency format
    output: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// `d ghct n m` header followed by `e source target weight` lines
    Rmf,
    /// one `source:target` edge per line
    Colonsep,
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
            eprintln!("Did you specify the appropriate file format?");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let graph = match args.format {
        Format::Rmf => input::rmf::read_graph(&args.input)?,
        Format::Colonsep => input::colonsep::read_graph(&args.input)?,
    };

    println!("|V| = {}", graph.node_count());
    println!("|E| = {}", graph.edge_count());

    input::metis::write_graph_weighted(&graph, &args.output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_must_be_specified() {
        assert!(Args::try_parse_from(["x2metis", "in.rmf", "out.graph"]).is_err());
        assert!(
            Args::try_parse_from(["x2metis", "--format", "rmf", "in.rmf", "out.graph"]).is_ok()
        );
    }
}
