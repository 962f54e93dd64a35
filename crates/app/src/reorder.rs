use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};

use minloggap::prelude::*;

/// Computes a compression-friendly linear arrangement of a graph.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Input graph in adjacency format
    graph: PathBuf,

    /// Initial partitioner backend
    #[arg(value_enum, default_value_t = PartitionerKind::Kahip)]
    partitioner: PartitionerKind,

    /// Refinement algorithm
    #[arg(value_enum, default_value_t = RefinerKind::Basic)]
    refiner: RefinerKind,

    /// Seed for all random decisions; defaults to the current time
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum recursion depth
    #[arg(long, default_value_t = 7)]
    max_levels: usize,

    /// Additionally record the run into this SQLite database
    #[arg(long, value_name = "DB")]
    sqlite: Option<PathBuf>,

    /// Also compute quadtree sizes before and after reordering
    #[arg(long)]
    quadtree: bool,

    /// Write the top-level bisection to this partition file
    #[arg(long, value_name = "FILE")]
    save_partition: Option<PathBuf>,

    /// Write the reordered graph to this adjacency file
    #[arg(long, value_name = "FILE")]
    save_ordered: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PartitionerKind {
    /// Multilevel bisection in the style of KaHIP's social presets
    Kahip,
    /// Uniformly random balanced bisection
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RefinerKind {
    /// Fiduccia-Mattheyses refinement with prefix-sum rollback
    Fm,
    /// Gain-greedy pair swapping
    Basic,
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
    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    });

    let remark = format!(
        "{},{}",
        match args.partitioner {
            PartitionerKind::Kahip => "kahip",
            PartitionerKind::Random => "random",
        },
        match args.refiner {
            RefinerKind::Fm => "fm",
            RefinerKind::Basic => "basic",
        }
    );
    log::info!("Reordering {:?} ({remark}, seed {seed})", args.graph);

    let config = ProcessConfig {
        remark,
        max_levels: args.max_levels,
        seed,
        compute_quadtree: args.quadtree,
        partition_output: args.save_partition.clone(),
        ordered_output: args.save_ordered.clone(),
    };

    let mut partitioner: Box<dyn InitialPartitioner> = match args.partitioner {
        PartitionerKind::Kahip => Box::new(MultilevelInitialPartitioner::new(
            MultilevelConfig::new(Preset::FastSocial, seed),
        )),
        PartitionerKind::Random => Box::new(RandomInitialPartitioner::new(seed)),
    };
    let mut refiner: Box<dyn Refiner> = match args.refiner {
        RefinerKind::Fm => Box::new(FmRefiner::default()),
        RefinerKind::Basic => Box::new(BasicRefiner::default()),
    };

    match &args.sqlite {
        Some(database) => {
            let mut reporter = SqliteReporter::new(database)?;
            process_graph(
                &args.graph,
                &config,
                partitioner.as_mut(),
                refiner.as_mut(),
                &mut reporter,
            )?;
            reporter.close()?;
        }
        None => {
            let mut reporter = CliReporter::new();
            process_graph(
                &args.graph,
                &config,
                partitioner.as_mut(),
                refiner.as_mut(),
                &mut reporter,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_usage() {
        let args = Args::parse_from(["reorder", "input.graph"]);
        assert!(matches!(args.partitioner, PartitionerKind::Kahip));
        assert!(matches!(args.refiner, RefinerKind::Basic));
        assert_eq!(args.max_levels, 7);
        assert!(args.seed.is_none());
    }

    #[test]
    fn backends_are_selected_positionally() {
        let args = Args::parse_from(["reorder", "input.graph", "random", "fm"]);
        assert!(matches!(args.partitioner, PartitionerKind::Random));
        assert!(matches!(args.refiner, RefinerKind::Fm));
    }

    #[test]
    fn unknown_backends_are_rejected() {
        assert!(Args::try_parse_from(["reorder", "input.graph", "metis"]).is_err());
    }
}
