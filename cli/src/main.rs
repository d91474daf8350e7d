// dvroute: run distance-vector routing simulations from the command line
//
// Loads a JSON topology, lets every router exchange vectors until the
// network settles (or the event budget runs out) and prints each router's
// distance table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dvroute_core::{RunMode, SimConfig, SimReport, Simulator};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dvroute")]
#[command(about = "Distance-vector routing simulator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print every router's table
    Run {
        /// Topology / simulation config (JSON)
        config: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
        /// Print snapshots and report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a simulation and check the result against shortest paths
    Verify {
        config: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print a sample config
    Sample,
}

#[derive(clap::Args)]
struct Overrides {
    /// Deliver in lock-step rounds instead of with random delays
    #[arg(long)]
    rounds: bool,
    /// Turn poison reverse off
    #[arg(long)]
    no_poison_reverse: bool,
    /// Seed for delivery delays
    #[arg(short, long)]
    seed: Option<u64>,
    /// Stop after this many events
    #[arg(long)]
    max_events: Option<usize>,
}

impl Overrides {
    fn apply(&self, config: &mut SimConfig) {
        if self.rounds {
            config.mode = RunMode::Rounds;
        }
        if self.no_poison_reverse {
            config.poison_reverse = false;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(max_events) = self.max_events {
            config.max_events = max_events;
        }
    }
}

fn main() -> Result<()> {
    dvroute_core::init_logging("warn");

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            overrides,
            json,
        } => cmd_run(&config, &overrides, json),
        Commands::Verify { config, overrides } => cmd_verify(&config, &overrides),
        Commands::Sample => cmd_sample(),
    }
}

fn load_config(path: &Path, overrides: &Overrides) -> Result<SimConfig> {
    let mut config = SimConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    overrides.apply(&mut config);
    tracing::info!(
        "Loaded {} routers from {} ({:?} mode)",
        config.num_nodes(),
        path.display(),
        config.mode
    );
    Ok(config)
}

fn simulate(config: SimConfig) -> Result<(Simulator, SimReport)> {
    let mut sim = Simulator::new(config).context("Failed to build network")?;
    let report = sim.run_configured();
    Ok((sim, report))
}

fn cmd_run(path: &Path, overrides: &Overrides, json: bool) -> Result<()> {
    let config = load_config(path, overrides)?;
    let (sim, report) = simulate(config)?;

    if json {
        let output = serde_json::json!({
            "report": report,
            "routers": sim.snapshots(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for snapshot in sim.snapshots() {
        println!("{}", snapshot);
    }
    print_report(&sim, &report);
    Ok(())
}

fn cmd_verify(path: &Path, overrides: &Overrides) -> Result<()> {
    let config = load_config(path, overrides)?;
    let (sim, report) = simulate(config)?;
    print_report(&sim, &report);

    let mismatches = sim.verify();
    if mismatches.is_empty() {
        println!("  {} All routers match shortest paths", "✓".green());
        return Ok(());
    }

    for mismatch in &mismatches {
        println!("  {} {}", "✗".red(), mismatch);
    }
    anyhow::bail!("{} routes disagree with shortest paths", mismatches.len())
}

fn cmd_sample() -> Result<()> {
    let json = SimConfig::sample()
        .to_json_pretty()
        .context("Failed to serialize sample config")?;
    println!("{}", json);
    Ok(())
}

fn print_report(sim: &Simulator, report: &SimReport) {
    let config = sim.config();

    println!("{}", "Simulation summary".bold());
    println!("  Routers:          {}", config.num_nodes());
    println!(
        "  Poison reverse:   {}",
        if config.poison_reverse { "on" } else { "off" }
    );
    println!("  Mode:             {:?}", report.mode);
    println!("  Events:           {}", report.events);
    println!("  Updates:          {}", report.messages_delivered);
    if report.mode == RunMode::Rounds {
        println!("  Rounds:           {}", report.rounds);
    }
    println!("  Final time:       {}", report.final_clock);
    if report.frames_dropped > 0 {
        println!("  Dropped frames:   {}", report.frames_dropped.to_string().yellow());
    }

    if report.converged {
        println!("  {} Converged", "✓".green());
    } else {
        println!(
            "  {} Event budget spent before convergence (count-to-infinity?)",
            "!".yellow()
        );
    }
}
