use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use log::{error, info, warn};

use sense_logger::config::{AppConfig, ConfigManager, StorageBackend};
use sense_logger::control::{execute, parse_command, Command, HELP};
use sense_logger::feed::{MqttFeed, SimulatedFeed};
use sense_logger::logger;
use sense_logger::TelemetryEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FeedKind {
    Mqtt,
    Simulated,
    None,
}

#[derive(Parser, Debug)]
#[command(name = "sense-logger")]
#[command(about = "Periodically snapshots live sensor readings into an exportable log")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Samples per second (clamped to 1..=30)
    #[arg(short, long, allow_negative_numbers = true)]
    rate: Option<i64>,

    /// Where sensor readings come from
    #[arg(short, long, value_enum, default_value = "simulated")]
    feed: FeedKind,

    /// Keep records in memory instead of DuckDB
    #[arg(long)]
    memory: bool,

    /// Start with logging enabled
    #[arg(short, long)]
    log: bool,
}

fn main() {
    logger::init_logger("info");
    let args = Args::parse();
    info!("Application starting");

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };

    let engine = match TelemetryEngine::from_config(&config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Failed to start telemetry engine: {}", e);
            std::process::exit(1);
        }
    };

    let mut simulated = None;
    let mut mqtt_feed = None;

    match args.feed {
        FeedKind::Simulated => match SimulatedFeed::start(&config.simulation, engine.cache()) {
            Ok(feed) => simulated = Some(feed),
            Err(e) => error!("Failed to start simulated feed: {}", e),
        },
        FeedKind::Mqtt => match MqttFeed::start(&config.mqtt, engine.cache()) {
            Ok(feed) => mqtt_feed = Some(feed),
            Err(e) => error!("Failed to start MQTT feed: {}", e),
        },
        FeedKind::None => info!("No sensor feed attached; cache stays at its last values"),
    }

    run_command_loop(&engine, &config);

    // 关闭传感器输入
    info!("Shutting down");
    if let Some(mut feed) = simulated {
        feed.stop();
    }
    if let Some(mut feed) = mqtt_feed {
        if let Err(e) = feed.stop() {
            warn!("MQTT feed failed: {}", e);
        }
    }
}

fn load_config(args: &Args) -> Result<AppConfig, sense_logger::config::ConfigError> {
    let mut manager = match &args.config {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => ConfigManager::new(),
    };

    let config = manager.get_config_mut();
    if let Some(rate) = args.rate {
        config.sampling.rate = rate;
    }
    if args.memory {
        config.database.backend = StorageBackend::Memory;
    }
    if args.log {
        config.sampling.logging_enabled = true;
    }
    config.validate()?;
    Ok(config.clone())
}

fn run_command_loop(engine: &TelemetryEngine, config: &AppConfig) {
    let export_dir = config.get_export_directory();
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => println!("{}", execute(engine, &command, &export_dir)),
            Err(e) => println!("{}", e),
        }
        let _ = stdout.flush();
    }
}
