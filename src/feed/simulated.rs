use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::Rng;

use crate::cache::SensorChannelCache;
use crate::config::SimulationConfig;

const GRAVITY: f64 = 9.81;

/// Background thread that feeds random but plausible readings into the cache.
pub struct SimulatedFeed {
    shutdown_signal: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedFeed {
    pub fn start(config: &SimulationConfig, cache: Arc<SensorChannelCache>) -> io::Result<Self> {
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let period = config
            .update_period()
            .ok_or_else(|| invalid_input(format!("invalid update rate {}", config.update_rate_hz)))?;
        let location_every = config.location_interval().ok_or_else(|| {
            invalid_input(format!(
                "invalid location interval {}",
                config.location_interval_seconds
            ))
        })?;

        let thread_shutdown = Arc::clone(&shutdown_signal);
        let handle = thread::Builder::new()
            .name("simulated-feed".into())
            .spawn(move || run_simulation(cache, period, location_every, thread_shutdown))?;

        info!(
            "Simulated feed started: {:?} per motion update, location every {:?}",
            period, location_every
        );
        Ok(Self {
            shutdown_signal,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Simulated feed thread panicked");
            }
        }
    }
}

impl Drop for SimulatedFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn invalid_input(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

fn run_simulation(
    cache: Arc<SensorChannelCache>,
    period: Duration,
    location_every: Duration,
    shutdown_signal: Arc<AtomicBool>,
) {
    let mut rng = rand::rng();
    let mut heading: f64 = rng.random_range(0.0..360.0);
    let (mut latitude, mut longitude) = (47.6205, -122.3493);
    let mut floor = 1;
    let mut last_location: Option<Instant> = None;

    while !shutdown_signal.load(Ordering::Relaxed) {
        cache.update_acceleration(
            rng.random_range(-0.5..0.5),
            rng.random_range(-0.5..0.5),
            GRAVITY + rng.random_range(-0.2..0.2),
        );
        cache.update_rotation(
            rng.random_range(-0.1..0.1),
            rng.random_range(-0.1..0.1),
            rng.random_range(-0.3..0.3),
        );
        heading = (heading + rng.random_range(-2.0..2.0)).rem_euclid(360.0);
        let radians = heading.to_radians();
        cache.update_compass(radians.cos() * 40.0, radians.sin() * 40.0, -20.0);

        if last_location.map_or(true, |t| t.elapsed() >= location_every) {
            latitude += rng.random_range(-0.00005..0.00005);
            longitude += rng.random_range(-0.00005..0.00005);
            if rng.random_bool(0.1) {
                floor = (floor + rng.random_range(-1..=1)).max(0);
            }
            cache.update_location(latitude, longitude, 3.5 * f64::from(floor), floor);
            last_location = Some(Instant::now());
        }

        thread::sleep(period);
    }
}
