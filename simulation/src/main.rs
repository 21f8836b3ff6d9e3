//! Ferry - Opportunistic Forwarding Simulation
//!
//! Runs the Ferry forwarding strategies over random-waypoint mobility and
//! reports how many messages each one delivers, and at what cost.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ferry_core::{HostId, Settings};
use ferry_routing::StrategyKind;
use ferry_sim::{Scenario, ScenarioConfig, default_settings, fill_defaults};

#[derive(Parser)]
#[command(
    name = "ferry-sim",
    about = "Opportunistic forwarding simulation with random-waypoint mobility",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Router settings file (TOML, one table per router namespace)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one strategy
    Run {
        /// Strategy: geometric, prophet or encounter
        #[arg(short, long, default_value = "prophet")]
        strategy: StrategyKind,

        /// Print the diagnostics of this host when the run ends
        #[arg(long)]
        report: Option<u32>,

        #[command(flatten)]
        world: WorldArgs,
    },

    /// Run every strategy over the same mobility and traffic
    Compare {
        #[command(flatten)]
        world: WorldArgs,
    },
}

#[derive(Args)]
struct WorldArgs {
    /// Number of hosts
    #[arg(short = 'n', long, default_value = "40")]
    hosts: u32,

    /// Number of one-second ticks to run
    #[arg(short, long, default_value = "3600")]
    ticks: u64,

    /// Side length of the square field
    #[arg(short, long, default_value = "1000")]
    field: f64,

    /// Radio range of every host
    #[arg(short, long, default_value = "50")]
    range: f64,

    /// Ticks between message creations
    #[arg(short, long, default_value = "30")]
    interval: u64,

    /// Random seed for mobility and traffic
    #[arg(long, default_value = "0")]
    seed: u64,
}

impl WorldArgs {
    fn scenario(&self, strategy: StrategyKind) -> ScenarioConfig {
        ScenarioConfig {
            strategy,
            hosts: self.hosts,
            ticks: self.ticks,
            field_size: self.field,
            radio_range: self.range,
            message_interval: self.interval,
            seed: self.seed,
            ..Default::default()
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => {
            let mut settings = Settings::from_file(path)?;
            fill_defaults(&mut settings);
            tracing::info!(path = %path.display(), "Loaded router settings");
            Ok(settings)
        }
        None => Ok(default_settings()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let settings = load_settings(cli.config.as_ref())?;

    match cli.command {
        Commands::Run {
            strategy,
            report,
            world,
        } => {
            let mut scenario = Scenario::new(world.scenario(strategy), &settings)?;
            let stats = scenario.run()?;
            println!("{stats}");

            if let Some(host) = report {
                match scenario.diagnostics(HostId(host)) {
                    Some(info) => println!("\n{info}"),
                    None => eprintln!("No router on host n{host}"),
                }
            }
        }
        Commands::Compare { world } => {
            for kind in StrategyKind::ALL {
                let mut scenario = Scenario::new(world.scenario(kind), &settings)?;
                let stats = scenario.run()?;
                println!("{stats}\n");
            }
        }
    }

    Ok(())
}
