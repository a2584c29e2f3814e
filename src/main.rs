// src/main.rs - PPG sensor simulator entry point
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

use ppg_sensor_sim::communication::SerialTransport;
use ppg_sensor_sim::config::{self, Config};
use ppg_sensor_sim::export;
use ppg_sensor_sim::probe::{McuProbe, ProbeConfig};
use ppg_sensor_sim::scheduler::TokioTimeSync;
use ppg_sensor_sim::session::TriggerStateMachine;
use ppg_sensor_sim::simulator::SensorSimulator;
use ppg_sensor_sim::window_plan::WindowPlan;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// PPG front-end simulator for MCU bench tests
#[derive(Parser, Debug)]
#[command(name = "ppg-sim", version, about = "Streams synthetic PPG samples to an MCU on trigger.")]
struct Cli {
    /// Path to a TOML config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overrides serial.port
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overrides serial.baud
    #[arg(short, long)]
    baud: Option<u32>,

    /// RNG seed for reproducible plans, overrides signal.seed
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Act as the sensor and serve the MCU (default)
    Run,
    /// Act as the MCU against a running simulator
    Probe {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Leave the simulator armed after the last sample
        #[arg(long)]
        no_close: bool,
    },
    /// Write the window plan as CSV
    Plan {
        #[arg(short, long, default_value = "plan.csv")]
        output: PathBuf,
    },
    /// List serial ports
    ListPorts,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    let config = load(&cli)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => serve(config).await,
        Commands::Probe { json, no_close } => probe(config, json, !no_close).await,
        Commands::Plan { output } => {
            let plan = build_plan(&config)?;
            export::export_plan(&plan, &output)?;
            Ok(())
        }
        Commands::ListPorts => {
            let ports = SerialTransport::available_ports();
            if ports.is_empty() {
                tracing::warn!("No serial ports found");
            }
            for port in ports {
                println!("{}", port);
            }
            Ok(())
        }
    }
}

fn load(cli: &Cli) -> Result<Config, BoxError> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(&path).map_err(|e| {
                tracing::error!("Please ensure the configuration file exists and is properly formatted");
                Box::new(e) as BoxError
            })?
        }
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud = baud;
    }
    if cli.seed.is_some() {
        config.signal.seed = cli.seed;
    }

    config.validate().map_err(|e| {
        tracing::error!("{}", e);
        Box::new(e) as BoxError
    })?;
    Ok(config)
}

fn build_plan(config: &Config) -> Result<WindowPlan, BoxError> {
    let mut rng = match config.signal.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let plan = WindowPlan::from_config(config, &mut rng)?;
    tracing::info!("Prepared {} samples", plan.total_samples());
    Ok(plan)
}

async fn serve(config: Config) -> Result<(), BoxError> {
    // Plan is fully generated before the port opens.
    let plan = build_plan(&config)?;
    let transport = SerialTransport::open(&config.serial)?;
    let machine = TriggerStateMachine::new(plan, config.acquisition.settling_time());
    let mut simulator = SensorSimulator::new(transport, TokioTimeSync, machine, config.serial.read_timeout());
    simulator.run().await?;
    Ok(())
}

async fn probe(config: Config, json: bool, close_session: bool) -> Result<(), BoxError> {
    let transport = SerialTransport::open(&config.serial)?;
    let mut probe_config = ProbeConfig::from_config(&config);
    probe_config.close_session = close_session;

    let mut probe = McuProbe::new(transport, probe_config);
    let report = probe.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for w in &report.windows {
            println!(
                "window {:>2} {:<2} n={:<4} mean={:>7.1} min={:>4} max={:>4}",
                w.window, w.channel.label(), w.count, w.mean, w.min, w.max
            );
        }
        println!(
            "{} samples, {} requests, {} unanswered, {:.2} s{}",
            report.samples.len(),
            report.requests_sent,
            report.unanswered_requests,
            report.elapsed_s,
            if report.complete { "" } else { " (incomplete)" }
        );
    }
    Ok(())
}
