use chrono::Local;
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

/// Installs the coloured, timestamped console logger. `RUST_LOG` overrides
/// `default_filter`. Calling it twice is harmless.
pub fn init_logger(default_filter: &str) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let level_color = match record.level() {
                Level::Error => "\x1b[31m\x1b[1m", // 红色
                Level::Warn => "\x1b[33m\x1b[1m",  // 黄色
                Level::Info => "\x1b[32m\x1b[1m",  // 绿色
                Level::Debug => "\x1b[36m\x1b[1m", // 青色
                Level::Trace => "\x1b[90m\x1b[1m", // 灰色
            };
            writeln!(
                buf,
                "{}{} {:<5}\x1b[0m [{}] [{}:{}] {}",
                time,
                level_color,
                record.level(),
                std::thread::current().name().unwrap_or("unnamed"),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .try_init();

    if let Err(e) = result {
        eprintln!("Logger already initialised: {}", e);
    }
}
