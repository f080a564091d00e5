//! AQUASIM - CLI Entry Point
//!
//! Headless aquarium ecosystem simulator.

use aquasim::checkpoint::{Checkpoint, CheckpointManager};
use aquasim::saves::SaveManager;
use aquasim::{benchmark, Config, Ecosystem, Species, TurnDriver};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "aquasim")]
#[command(version)]
#[command(about = "Predator-prey aquarium simulator with turn-based AI and continuous motion")]
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

        /// Number of AI turns to simulate
        #[arg(short, long, default_value = "1000")]
        turns: u64,

        /// Output directory for checkpoints
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Also store the final state in a named save slot
        #[arg(long)]
        save: Option<String>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume simulation from checkpoint
    Resume {
        /// Checkpoint file to resume from; defaults to the newest in the output directory
        #[arg(short, long)]
        checkpoint: Option<PathBuf>,

        /// Number of additional turns
        #[arg(short, long, default_value = "1000")]
        turns: u64,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of AI turns
        #[arg(short, long, default_value = "500")]
        turns: u64,

        /// Motion frames between turns
        #[arg(short, long, default_value = "60")]
        frames: u32,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file
        checkpoint: PathBuf,
    },

    /// List named save slots
    Saves {
        #[arg(short, long, default_value = "saves")]
        dir: PathBuf,
    },
}

/// Start env_logger; `RUST_LOG` overrides `default_level`
fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            turns,
            output,
            seed,
            save,
            quiet,
        } => run_simulation(config, turns, output, seed, save, quiet),

        Commands::Resume {
            checkpoint,
            turns,
            output,
        } => resume_simulation(checkpoint, turns, output),

        Commands::Benchmark { turns, frames, seed } => {
            init_logging("info");
            run_benchmark(turns, frames, seed)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }

        Commands::Analyze { checkpoint } => {
            init_logging("info");
            analyze_checkpoint(checkpoint)
        }

        Commands::Saves { dir } => {
            init_logging("info");
            list_saves(dir)
        }
    }
}

/// Drive `turns` turns through the frame scheduler with autosave
fn drive(
    eco: &mut Ecosystem,
    turns: u64,
    checkpoints: &mut CheckpointManager,
    quiet: bool,
) {
    let mut driver = TurnDriver::from_config(&eco.config);
    let fps = eco.config.world.fps;
    let stats_interval = eco.config.logging.stats_interval.max(1);

    driver.run_turns(eco, turns, fps, |eco| {
        if !quiet && eco.turn_count() % stats_interval == 0 {
            println!("{}", eco.get_statistics().summary());
        }

        if checkpoints.should_save(eco.day()) {
            match checkpoints.save(&eco.create_checkpoint()) {
                Ok(path) => {
                    if !quiet {
                        println!("  Checkpoint saved: {}", path.display());
                    }
                }
                Err(e) => eprintln!("  Checkpoint error: {}", e),
            }
        }
    });
}

fn print_counts(eco: &Ecosystem) {
    let counts = eco.counts();
    for species in Species::ALL {
        println!("  {:<7} {}", species.to_string(), counts.get(species));
    }
}

fn run_simulation(
    config_path: PathBuf,
    turns: u64,
    output: PathBuf,
    seed: Option<u64>,
    save_name: Option<String>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let config = if config_path.exists() {
        println!("Loading config from: {:?}", config_path);
        Config::from_file(&config_path)?
    } else {
        println!("Using default configuration");
        Config::default()
    };
    init_logging(&config.logging.log_level);
    config.validate()?;

    let mut eco = if let Some(s) = seed {
        println!("Using seed: {}", s);
        Ecosystem::new_with_seed(config.clone(), s)
    } else {
        Ecosystem::new(config.clone())
    };

    println!("Starting simulation");
    println!("  Area: {}x{}", config.world.width, config.world.height);
    println!("  Turns: {}", turns);
    print_counts(&eco);
    println!();

    let mut checkpoints = CheckpointManager::new(&output, u64::from(config.logging.autosave_interval_days), 10)?;

    let start = Instant::now();
    drive(&mut eco, turns, &mut checkpoints, quiet);
    let elapsed = start.elapsed().as_secs_f64();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed);
    println!("Turns: {}", eco.turn_count());
    println!("Speed: {:.1} turns/s", eco.turn_count() as f64 / elapsed.max(f64::EPSILON));
    println!("Day {} ({})", eco.day(), eco.season().name());
    print_counts(&eco);

    // Final checkpoint
    let final_path = output.join("checkpoint_final.bin");
    eco.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {:?}", final_path);

    // Save stats history
    let stats_path = output.join("stats_history.json");
    eco.stats_history.save(&stats_path)?;
    println!("Stats history: {:?}", stats_path);

    if let Some(name) = save_name {
        let saves = SaveManager::new(output.join("saves"))?;
        let id = saves.save(&name, eco.save_meta(), eco.to_snapshot())?;
        println!("Save slot: {}", id);
    }

    Ok(())
}

fn resume_simulation(
    checkpoint_path: Option<PathBuf>,
    turns: u64,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let probe = CheckpointManager::new(&output, 1, 10)?;
    let final_path = output.join("checkpoint_final.bin");
    let fallback = if final_path.exists() {
        Some(final_path)
    } else {
        probe.find_latest()
    };
    let checkpoint_path = match checkpoint_path.or(fallback) {
        Some(path) => path,
        None => return Err(format!("no checkpoint found in {:?}", output).into()),
    };
    println!("Loading checkpoint: {:?}", checkpoint_path);

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    init_logging(&checkpoint.config.logging.log_level);
    let mut eco = Ecosystem::from_checkpoint(checkpoint)?;
    eco.set_paused(false);

    println!("Resumed at turn {} (day {})", eco.turn_count(), eco.day());
    print_counts(&eco);
    println!("Running {} additional turns", turns);
    println!();

    let mut checkpoints = CheckpointManager::new(&output, u64::from(eco.config.logging.autosave_interval_days), 10)?;

    let start = Instant::now();
    drive(&mut eco, turns, &mut checkpoints, false);
    let elapsed = start.elapsed().as_secs_f64();

    println!();
    println!("=== Resume Complete ===");
    println!("Time: {:.2}s", elapsed);
    println!("Final turn: {}", eco.turn_count());
    println!("Speed: {:.1} turns/s", turns as f64 / elapsed.max(f64::EPSILON));
    print_counts(&eco);

    let final_path = output.join("checkpoint_final.bin");
    eco.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {:?}", final_path);

    Ok(())
}

fn run_benchmark(turns: u64, frames: u32, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== AQUASIM Benchmark ===");
    println!("Turns: {}", turns);
    println!("Frames per turn: {}", frames);
    println!();

    let result = benchmark(turns, frames, seed);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn analyze_checkpoint(checkpoint_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint Analysis ===");
    println!("File: {:?}", checkpoint_path);
    println!();

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let size = checkpoint.size_bytes();
    let history = checkpoint.history.clone();
    let eco = Ecosystem::from_checkpoint(checkpoint)?;
    let stats = eco.get_statistics();

    println!("Seed: {}", eco.seed());
    println!("Turn: {}", stats.turn);
    println!("Day {} - {} - {}", stats.day, stats.season.name(), stats.phase.name());
    println!("Light: {:.2}", stats.light_factor);
    println!();

    print_counts(&eco);
    println!();
    for (species, mean) in Species::ANIMALS.into_iter().zip(stats.mean_energy) {
        println!("Mean {} energy: {:.1}", species, mean);
    }

    if !history.snapshots.is_empty() {
        println!();
        println!("History: {} snapshots", history.snapshots.len());
        for species in Species::ALL {
            println!("  Peak {}: {}", species, history.peak(species));
        }
    }

    println!();
    println!("Checkpoint size: {:.2} KB", size as f64 / 1_000.0);

    Ok(())
}

fn list_saves(dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let saves = SaveManager::new(&dir)?;
    let items = saves.list()?;
    if items.is_empty() {
        println!("No saves in {:?}", dir);
        return Ok(());
    }

    for meta in items {
        println!(
            "{:<40} {:<24} turn {:>6} | {} entities | {}",
            meta.save_id, meta.save_name, meta.cycle, meta.entities_total, meta.saved_at
        );
    }
    Ok(())
}
