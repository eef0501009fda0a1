//! Line-based control surface for the engine.

use std::path::PathBuf;

use crate::engine::TelemetryEngine;
use crate::types::TickOutcome;
use crate::utils::{default_export_path, format_timestamp};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetRate(i64),
    Logging(bool),
    Tick,
    Count,
    Export(Option<PathBuf>),
    Clear,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "commands: rate <n> | log on|off | tick | count | export [path] | clear | status | help | quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Err("empty command".to_string());
    };
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(format!("too many arguments for {:?}", name));
    }

    match (name.to_ascii_lowercase().as_str(), arg) {
        ("rate", Some(n)) => n
            .parse()
            .map(Command::SetRate)
            .map_err(|_| format!("invalid rate: {:?}", n)),
        ("rate", None) => Err("usage: rate <n>".to_string()),
        ("log", Some("on")) => Ok(Command::Logging(true)),
        ("log", Some("off")) => Ok(Command::Logging(false)),
        ("log", _) => Err("usage: log on|off".to_string()),
        ("tick", None) => Ok(Command::Tick),
        ("count", None) => Ok(Command::Count),
        ("export", path) => Ok(Command::Export(path.map(PathBuf::from))),
        ("clear", None) => Ok(Command::Clear),
        ("status", None) => Ok(Command::Status),
        ("help", None) => Ok(Command::Help),
        ("quit" | "exit", None) => Ok(Command::Quit),
        (other, _) => Err(format!("unknown command {:?}; {}", other, HELP)),
    }
}

/// Runs `command` against `engine` and returns the line to show the operator.
pub fn execute(engine: &TelemetryEngine, command: &Command, export_dir: &std::path::Path) -> String {
    match command {
        Command::SetRate(requested) => {
            let applied = engine.set_rate(*requested);
            format!("rate set to {} samples per second", applied)
        }
        Command::Logging(enabled) => {
            engine.set_logging_enabled(*enabled);
            format!("logging {}", if *enabled { "on" } else { "off" })
        }
        Command::Tick => match engine.tick() {
            TickOutcome::Skipped => "tick skipped (logging off)".to_string(),
            TickOutcome::Appended(point) => {
                format!("recorded data point at {}", format_timestamp(point.timestamp))
            }
            TickOutcome::Failed(e) => format!("tick failed: {}", e),
        },
        Command::Count => match engine.count() {
            Ok(n) => format!("{} data points", n),
            Err(e) => format!("count failed: {}", e),
        },
        Command::Export(path) => {
            let path = path.clone().unwrap_or_else(|| default_export_path(export_dir));
            match engine.export_to_file(&path) {
                Ok(written) => format!("exported to {}", written.display()),
                Err(e) => format!("export failed: {}", e),
            }
        }
        Command::Clear => match engine.clear() {
            Ok(()) => "store cleared".to_string(),
            Err(e) => format!("clear failed: {}", e),
        },
        Command::Status => {
            let reading = engine.current_reading();
            let count = engine
                .count()
                .map(|n| n.to_string())
                .unwrap_or_else(|e| format!("unavailable ({})", e));
            format!(
                "scheduler {:?} | rate {} | logging {} | records {} | location {} {} floor {}",
                engine.scheduler_state(),
                engine.rate(),
                if engine.is_logging_enabled() { "on" } else { "off" },
                count,
                reading.location.latitude,
                reading.location.longitude,
                reading.location.floor,
            )
        }
        Command::Help => HELP.to_string(),
        Command::Quit => "bye".to_string(),
    }
}
