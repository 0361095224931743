//! CLI entry point (spec §6.5): `<platform_config.yml> <osrm_map>
//! <demand_config.yml> [<seed>]`. Exit code 0 on success, non-zero on
//! missing arguments or unparseable configuration.

mod osrm_router;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;

use sim_core::config::PlatformConfig;
use sim_core::demand::DemandSource;
use sim_core::poisson_demand::PoissonDemandSource;
use sim_core::routing::RouteProvider;
use sim_core::simulation::SimulationDriver;

use crate::osrm_router::OsrmHttpRouter;

#[derive(Parser, Debug)]
#[command(
    name = "sim_cli",
    about = "Agent-based mobility-on-demand fleet simulator"
)]
struct Cli {
    /// Path to the platform configuration YAML file.
    platform_config: PathBuf,
    /// Base URL of a running OSRM HTTP server, e.g. http://localhost:5000.
    osrm_map: String,
    /// Path to the demand configuration YAML file.
    demand_config: PathBuf,
    /// RNG seed; defaults to a value drawn from wall-clock time.
    seed: Option<u64>,
}

fn seed_from_wall_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(seed_from_wall_clock);

    log::info!("[INFO] using seed {seed}");

    let config = match PlatformConfig::load(&cli.platform_config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: failed to load platform config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let demand = match PoissonDemandSource::load(&cli.demand_config, seed) {
        Ok(demand) => demand,
        Err(err) => {
            eprintln!("error: failed to load demand config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let router: Box<dyn RouteProvider> = Box::new(OsrmHttpRouter::new(&cli.osrm_map));
    let demand: Box<dyn DemandSource> = Box::new(demand);

    let driver = match SimulationDriver::new(config, router, demand) {
        Ok(driver) => driver,
        Err(err) => {
            eprintln!("error: failed to initialize simulation: {err}");
            return ExitCode::FAILURE;
        }
    };

    match driver.run() {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: simulation run failed: {err}");
            ExitCode::FAILURE
        }
    }
}
