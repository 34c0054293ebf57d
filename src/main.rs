//! TERRA - CLI Entry Point
//!
//! Headless driver for the world simulator.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use terra::{benchmark, Config, World};

#[derive(Parser)]
#[command(name = "terra")]
#[command(version)]
#[command(about = "Artificial-life world simulator on a procedural torus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Write the stats history as JSON when done
        #[arg(long)]
        stats_out: Option<PathBuf>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Grid side length
        #[arg(long, default_value = "64")]
        size: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The run config also supplies the default log level
    let run_config = match &cli.command {
        Commands::Run { config, .. } if config.exists() => Some(Config::from_file(config)?),
        _ => None,
    };
    let default_level = run_config
        .as_ref()
        .map_or_else(|| "info".to_string(), |c| c.logging.log_level.clone());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Run {
            config,
            steps,
            seed,
            stats_out,
            quiet,
        } => {
            let config = match run_config {
                Some(loaded) => {
                    println!("Loaded config from: {:?}", config);
                    loaded
                }
                None => {
                    println!("Using default configuration");
                    Config::default()
                }
            };
            run_simulation(config, steps, seed, stats_out, quiet)
        }

        Commands::Benchmark { steps, size } => run_benchmark(steps, size),

        Commands::Init { output } => generate_config(output),
    }
}

fn run_simulation(
    config: Config,
    steps: u64,
    seed: Option<u64>,
    stats_out: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut world = if let Some(s) = seed {
        println!("Using seed: {}", s);
        World::new_with_seed(config.clone(), s)?
    } else {
        World::new(config.clone())?
    };

    println!("Starting simulation");
    println!("  Seed: {}", world.seed());
    println!("  Grid size: {}x{}", config.world.size, config.world.size);
    println!("  Populations: {}", config.population.populations);
    println!("  Spawn delay: {}", config.world.spawn_delay);
    println!("  Steps: {}", steps);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval;

    for i in 0..steps {
        world.step()?;

        if !quiet && i % stats_interval == 0 {
            println!("{}", world.stats.summary());
        }

        if world.is_extinct() {
            println!("\nAll populations extinct at step {}", world.time);
            break;
        }
    }

    let elapsed = start.elapsed();
    let steps_per_sec = world.time as f64 / elapsed.as_secs_f64();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Steps: {}", world.time);
    println!("Speed: {:.1} steps/s", steps_per_sec);
    println!("Final population: {}", world.population());
    for pop in &world.stats.populations {
        println!(
            "  Population {}: {} alive, {} infected, {} rogue",
            pop.id, pop.count, pop.infected, pop.rogue
        );
    }
    println!("Active storms: {}", world.weather().active_count());

    if let Some(path) = stats_out {
        world.stats_history.save(&path)?;
        println!("Stats history: {:?}", path);
    }

    Ok(())
}

fn run_benchmark(steps: u64, size: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== TERRA Benchmark ===");
    println!("Steps: {}", steps);
    println!("Grid: {}x{}", size, size);
    println!();

    let result = benchmark(steps, size)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
