use clap::{Parser, Subcommand};
use std::process::ExitCode;

use satpass::catalog::{Catalog, HttpTleSource};
use satpass::config::Config;
use satpass::driver::{Driver, LogSink, PrintSink, UdpFrequencySink};
use satpass::ephemeris::Sgp4Ephemeris;
use satpass::registry::SatnogsRegistry;

#[derive(Parser)]
#[command(name = "satpass")]
#[command(about = "Satellite pass prediction and Doppler tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracking loop
    Run { config: String },
    /// Print the current or next pass for every tracked satellite
    Passes { config: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => run(&config),
        Commands::Passes { config } => passes(&config),
    }
}

fn run(path: &str) -> ExitCode {
    match build_driver(path) {
        Ok(mut driver) => {
            driver.add_sink(Box::new(LogSink));
            driver.run()
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn passes(path: &str) -> ExitCode {
    match build_driver(path) {
        Ok(mut driver) => {
            driver.add_sink(Box::new(PrintSink));
            driver.tick_once(chrono::Utc::now());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_driver(path: &str) -> Result<Driver, String> {
    let config = Config::from_file(path).map_err(|e| e.to_string())?;
    let observer = config.observer().map_err(|e| e.to_string())?;

    if let Some(name) = &config.station.name {
        log::info!(
            "station {} at ({}, {}), altitude {} m",
            name,
            observer.latitude_deg,
            observer.longitude_deg,
            observer.altitude_m
        );
    }

    let catalog = Catalog::new(
        Box::new(HttpTleSource::new(&config.catalog.url)),
        chrono::Duration::from_std(config.catalog.refresh_every).map_err(|e| e.to_string())?,
        config.catalog.satellites.clone(),
    );

    let mut driver = Driver::new(
        catalog,
        observer,
        Box::new(Sgp4Ephemeris::new()),
        Box::new(SatnogsRegistry::new(&config.registry.url)),
        config.poll.tick,
        chrono::Duration::from_std(config.poll.granularity).map_err(|e| e.to_string())?,
    );

    if let Some(target) = &config.output.udp {
        let sink = UdpFrequencySink::new(target).map_err(|e| e.to_string())?;
        driver.add_sink(Box::new(sink));
    }

    Ok(driver)
}
