use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use mdrun::{config::RunConfig, script, Mdrun};

/// Lennard-Jones molecular dynamics from GSD checkpoints
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run LJ + NVT from a checkpoint and print the final kinetic energy
    Run(RunArgs),
    /// Write a simple cubic starting configuration
    Init(InitArgs),
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Input checkpoint (overrides the config file)
    input: Option<PathBuf>,

    /// Optional TOML run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ranks
    #[arg(short = 'n', long)]
    ranks: Option<usize>,

    /// Number of steps
    #[arg(short, long)]
    steps: Option<u64>,

    /// Write the final state to this GSD file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct InitArgs {
    /// Output checkpoint
    #[arg(default_value = "random.gsd")]
    output: PathBuf,

    #[arg(short = 'N', long, default_value_t = 1000)]
    num_particles: usize,

    /// Lattice spacing
    #[arg(long, default_value_t = 1.5)]
    spacing: f64,

    /// Temperature of the initial velocities
    #[arg(long, default_value_t = 1.5)]
    kt: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(ranks) = args.ranks {
        config.ranks = ranks;
    }
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(output) = args.output {
        config.output = Some(output);
    }
    config.validate().context("Invalid run configuration")?;

    info!(
        "running {} steps of {} on {} ranks",
        config.steps,
        config.input.display(),
        config.ranks
    );
    let mdrun = Mdrun::new(config.ranks)?;
    let config = &config;
    mdrun
        .run(|device| {
            let rank = device.rank();
            let ke = script::lj_nvt(device, config)?;
            script::report(rank, ke, &mut io::stdout().lock())
                .map_err(|e| mdrun::Error::io("<stdout>", e))?;
            Ok(())
        })
        .with_context(|| format!("Simulation of '{}' failed", config.input.display()))?;
    Ok(())
}

fn init(args: InitArgs) -> Result<()> {
    script::init_lattice(&args.output, args.num_particles, args.spacing, args.kt, args.seed)
        .with_context(|| format!("Failed to write '{}'", args.output.display()))?;
    info!(
        "wrote {} particles to {}",
        args.num_particles,
        args.output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match args.command {
        Some(Command::Init(init_args)) => init(init_args),
        Some(Command::Run(run_args)) => run(run_args),
        None => run(RunArgs::default()),
    }
}
