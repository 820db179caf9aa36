use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flow_calibration::adapters::{JsonFileStore, LogNotifier, SimulatedSensorSource};
use flow_calibration::calibration::{Volume, VolumeUnit};
use flow_calibration::config::{AppConfig, DEFAULT_CONFIG_PATH};
use flow_calibration::error::CalibrationError;
use flow_calibration::managers::CalibrationManager;
use flow_calibration::ports::SensorSource;

#[derive(Parser, Debug)]
#[command(
    name = "flowcal_cli",
    about = "Flow sensor calibration against a simulated meter"
)]
struct Cli {
    /// Config file (defaults to config/flowcal.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List sensors available for calibration
    Sensors,
    /// Run one calibration: start, pour, stop and optionally submit
    Calibrate {
        #[arg(long)]
        sensor: String,
        /// Reference volume (defaults to the configured volume)
        #[arg(long)]
        volume: Option<f64>,
        /// Unit of --volume: ml or L
        #[arg(long)]
        unit: Option<VolumeUnit>,
        /// Pulses the simulated pour adds between start and stop
        #[arg(long)]
        pulses: u64,
        /// Save the derived constant to the store
        #[arg(long)]
        submit: bool,
    },
    /// Print saved calibration records
    History,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_file(
        cli.config
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    );

    match cli.command {
        Commands::Sensors => run_sensors(&config).await,
        Commands::Calibrate {
            sensor,
            volume,
            unit,
            pulses,
            submit,
        } => {
            let volume = Volume::new(
                volume.unwrap_or(config.calibration.default_volume),
                unit.unwrap_or(config.calibration.default_unit),
            );
            run_calibrate(&config, &sensor, volume, pulses, submit).await
        }
        Commands::History => run_history(&config).await,
    }
}

async fn run_sensors(config: &AppConfig) -> Result<ExitCode> {
    let meter = SimulatedSensorSource::from_config(&config.simulator);
    let sensors = meter.list().await.context("listing sensors")?;
    for sensor in sensors {
        println!("{}\t{}", sensor.id, sensor.label);
    }
    Ok(ExitCode::from(0))
}

async fn run_calibrate(
    config: &AppConfig,
    sensor: &str,
    volume: Volume,
    pulses: u64,
    submit: bool,
) -> Result<ExitCode> {
    let meter = Arc::new(SimulatedSensorSource::from_config(&config.simulator));
    let store = Arc::new(JsonFileStore::new(&config.store.path));
    let manager = CalibrationManager::new(meter.clone(), store)
        .with_notifier(Arc::new(LogNotifier));

    let outcome = calibrate(&manager, &meter, sensor, volume, pulses, submit).await;

    let snapshot = manager.snapshot()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    match outcome {
        Ok(()) => Ok(ExitCode::from(0)),
        Err(err) if err.is_validation() => {
            Err(anyhow::Error::new(err).context("invalid calibration input"))
        }
        Err(_) => Ok(ExitCode::from(2)),
    }
}

async fn calibrate(
    manager: &CalibrationManager,
    meter: &SimulatedSensorSource,
    sensor: &str,
    volume: Volume,
    pulses: u64,
    submit: bool,
) -> Result<(), CalibrationError> {
    manager.configure(sensor, volume)?;
    manager.start().await?;
    if let Some(instructions) = manager.instructions()? {
        eprintln!("{instructions}");
    }

    meter
        .pour(sensor, pulses)
        .map_err(|source| CalibrationError::SensorRead {
            sensor_id: sensor.to_string(),
            source,
        })?;

    manager.stop().await?;
    if submit {
        manager.submit().await?;
    }
    Ok(())
}

async fn run_history(config: &AppConfig) -> Result<ExitCode> {
    let store = JsonFileStore::new(&config.store.path);
    let records = store
        .load_all()
        .await
        .with_context(|| format!("reading {}", store.path().display()))?;

    if records.is_empty() {
        println!("No calibrations saved in {}", store.path().display());
        return Ok(ExitCode::from(0));
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(ExitCode::from(0))
}
