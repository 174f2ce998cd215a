//! # airq
//!
//! Command-line interface for the PM2.5 forecaster.

use std::path::PathBuf;
use std::sync::Arc;

use airq_facade::{
    build_remote_service, build_service, pm25_to_aqi, prepare_forest, remote_source,
    results_sink, source, train_forest, AppConfig, AppConfigBuilder, AqiCategory, Clock,
    DiscardSink, ForecastSink, ManualSource, ModelOrigin, Observation, RunOutcome,
    SeedPolicy, SystemClock,
};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod schedule;

type CliResult<T> = std::result::Result<T, String>;

#[derive(Parser)]
#[command(name = "airq")]
#[command(about = "PM2.5 and AQI forecasting CLI", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Settings layered over the `AIRQ_*` environment.
#[derive(Args)]
struct Overrides {
    /// Training history CSV
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Saved model file (loaded if present, written after training)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Results log CSV
    #[arg(long, global = true)]
    results: Option<PathBuf>,

    /// Number of trees to train
    #[arg(long, global = true)]
    trees: Option<usize>,

    /// Run seed policy: 'minute' or a fixed integer
    #[arg(long, global = true)]
    seed_policy: Option<SeedPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest reading and forecast once
    Run {
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forecast every hour on the hour
    Schedule {
        /// Also run immediately on start
        #[arg(long)]
        now: bool,
    },

    /// Forecast from a supplied PM2.5 value without contacting the source
    Predict {
        /// Latest PM2.5 concentration (µg/m³)
        #[arg(long)]
        pm25: f64,

        /// Do not append the forecast to the results log
        #[arg(long)]
        no_record: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Train the forest from history and report its accuracy
    Train {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert PM2.5 concentrations to AQI
    Aqi {
        /// Concentrations (µg/m³)
        #[arg(required = true)]
        pm25: Vec<f64>,
    },

    /// Check connectivity to the reading table
    Check,
}

fn load_config(overrides: Overrides) -> CliResult<AppConfig> {
    let base = AppConfig::from_env().map_err(|e| e.to_string())?;
    let mut builder = AppConfigBuilder::from(base);

    if let Some(path) = overrides.history {
        builder = builder.history_path(path);
    }
    if let Some(path) = overrides.model {
        builder = builder.model_path(path);
    }
    if let Some(path) = overrides.results {
        builder = builder.results_path(path);
    }
    if let Some(trees) = overrides.trees {
        builder = builder.n_estimators(trees);
    }
    if let Some(policy) = overrides.seed_policy {
        builder = builder.seed_policy(policy);
    }

    builder.build().map_err(|e| e.to_string())
}

fn load_forest(config: &AppConfig) -> CliResult<Arc<airq_facade::RandomForest>> {
    let (forest, origin) = prepare_forest(config).map_err(|e| e.to_string())?;
    if let ModelOrigin::Trained(report) = origin {
        println!("{}", report);
        println!();
    }
    Ok(Arc::new(forest))
}

fn format_series(values: &[f64], decimals: usize) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|v| format!("{:.*}", decimals, v))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn print_outcome(outcome: &RunOutcome, json: bool) -> CliResult<()> {
    let record = &outcome.record;

    if json {
        let value = serde_json::json!({
            "record": record,
            "summary": outcome.summary,
            "persisted": outcome.is_persisted(),
        });
        let text = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
        println!("{}", text);
        return Ok(());
    }

    println!("Input PM2.5: {} µg/m³", record.input_pm25);
    println!(
        "{}-step PM2.5 forecast (µg/m³): {}",
        record.len(),
        format_series(&record.pm25_forecast, 2)
    );
    println!("Corresponding AQI forecast: {:?}", record.aqi_forecast);
    println!("Prediction confidence: {}", format_series(&record.confidence, 3));
    println!("Average prediction: {:.2} µg/m³", outcome.summary.average);
    println!("Variation from baseline: {:+.1}%", outcome.summary.variation_pct);
    println!(
        "Prediction range: {:.2} - {:.2} µg/m³",
        outcome.summary.min, outcome.summary.max
    );
    if let Some(e) = &outcome.persistence_error {
        println!("Warning: forecast not recorded: {}", e);
    }
    Ok(())
}

fn run_once(config: &AppConfig, json: bool) -> CliResult<()> {
    let forest = load_forest(config)?;
    let service = build_remote_service(config, forest).map_err(|e| e.to_string())?;
    let outcome = service.run_once().map_err(|e| e.to_string())?;
    print_outcome(&outcome, json)
}

fn run_schedule(config: &AppConfig, now: bool) -> CliResult<()> {
    let forest = load_forest(config)?;
    let service = build_remote_service(config, forest).map_err(|e| e.to_string())?;
    schedule::run_hourly(&service, &SystemClock, now);
    Ok(())
}

fn run_predict(config: &AppConfig, pm25: f64, no_record: bool, json: bool) -> CliResult<()> {
    let forest = load_forest(config)?;
    let observation = Observation::new(SystemClock.now(), pm25);
    let sink: Arc<dyn ForecastSink> = if no_record {
        Arc::new(DiscardSink)
    } else {
        Arc::new(results_sink(config))
    };

    let service = build_service(config, Arc::new(ManualSource::new(observation)), forest, sink);
    let outcome = service.run_once().map_err(|e| e.to_string())?;
    print_outcome(&outcome, json)
}

fn run_train(config: &AppConfig, json: bool) -> CliResult<()> {
    let (forest, report) = train_forest(config).map_err(|e| e.to_string())?;

    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        println!("Trees: {}", forest.trees().len());
        println!("{}", report);
    }

    match &config.model_path {
        Some(path) => info!(path = %path.display(), "Model written"),
        None => info!("No model path configured; model not saved"),
    }
    Ok(())
}

fn run_aqi(values: &[f64]) -> CliResult<()> {
    for &pm25 in values {
        let aqi = pm25_to_aqi(pm25);
        let category = AqiCategory::from_aqi(aqi);
        println!(
            "PM2.5 {} µg/m³ -> AQI {} ({}): {}",
            pm25,
            aqi,
            category,
            category.description()
        );
    }
    Ok(())
}

fn run_check(config: &AppConfig) -> CliResult<()> {
    let remote = remote_source(config).map_err(|e| e.to_string())?;
    let readings = remote.fetch_readings().map_err(|e| e.to_string())?;

    println!("Connected to: {}", remote.url());
    match source::count_readings(&readings) {
        0 => println!("Database is empty - waiting for sensor data"),
        n => println!("Found {} readings in database", n),
    }
    if let Some(latest) = source::latest_observation(&readings) {
        println!("Latest reading: {} µg/m³ at {}", latest.pm25, latest.timestamp);
    }
    Ok(())
}

fn main() {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airq=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Aqi { pm25 } => run_aqi(&pm25),
        command => load_config(cli.overrides).and_then(|config| match command {
            Commands::Run { json } => run_once(&config, json),
            Commands::Schedule { now } => run_schedule(&config, now),
            Commands::Predict {
                pm25,
                no_record,
                json,
            } => run_predict(&config, pm25, no_record, json),
            Commands::Train { json } => run_train(&config, json),
            Commands::Check => run_check(&config),
            Commands::Aqi { pm25 } => run_aqi(&pm25),
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
