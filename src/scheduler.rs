//! Periodic snapshot-and-append driver.
//!
//! [`SnapshotScheduler::tick`] is the unit of work. A timer thread calls it at
//! the configured cadence once [`SnapshotScheduler::configure`] has been
//! called; tests and other drivers may call it directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace, warn};

use crate::cache::SensorChannelCache;
use crate::store::DataPointStore;
use crate::types::{DataPoint, TickOutcome};

/// Source of wall-clock time in milliseconds since the epoch.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

enum SchedulerCommand {
    Configure(Duration),
    Shutdown,
}

struct TimerDriver {
    command_sender: Sender<SchedulerCommand>,
    handle: JoinHandle<()>,
}

/// Work shared between manual callers and the timer thread.
struct TickCore {
    cache: Arc<SensorChannelCache>,
    store: Arc<dyn DataPointStore>,
    logging_enabled: AtomicBool,
    clock: Clock,
    // Tick lock. Also holds the last stamped timestamp.
    last_timestamp: Mutex<i64>,
}

impl TickCore {
    fn tick(&self) -> TickOutcome {
        let mut last_timestamp = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !self.logging_enabled.load(Ordering::SeqCst) {
            trace!("Tick skipped, logging disabled");
            return TickOutcome::Skipped;
        }

        let reading = self.cache.snapshot();
        // 写入时打时间戳，且不允许回退
        let timestamp = (self.clock)().max(*last_timestamp);
        let data_point = DataPoint::from_reading(reading, timestamp);

        match self.store.append(&data_point) {
            Ok(()) => {
                *last_timestamp = timestamp;
                TickOutcome::Appended(data_point)
            }
            Err(e) => {
                error!("Failed to append data point at {}: {}", timestamp, e);
                TickOutcome::Failed(e.to_string())
            }
        }
    }
}

pub struct SnapshotScheduler {
    core: Arc<TickCore>,
    driver: Mutex<Option<TimerDriver>>,
    interval: Mutex<Option<Duration>>,
}

impl SnapshotScheduler {
    /// Creates a stopped scheduler with logging disabled.
    pub fn new(cache: Arc<SensorChannelCache>, store: Arc<dyn DataPointStore>) -> Self {
        Self::with_clock(cache, store, Arc::new(|| Utc::now().timestamp_millis()))
    }

    pub fn with_clock(
        cache: Arc<SensorChannelCache>,
        store: Arc<dyn DataPointStore>,
        clock: Clock,
    ) -> Self {
        Self {
            core: Arc::new(TickCore {
                cache,
                store,
                logging_enabled: AtomicBool::new(false),
                clock,
                last_timestamp: Mutex::new(i64::MIN),
            }),
            driver: Mutex::new(None),
            interval: Mutex::new(None),
        }
    }

    /// Installs a periodic tick at `rate` ticks per second, replacing any
    /// previous cadence. A tick already in progress finishes first.
    pub fn configure(&self, rate: u32) {
        let interval = Duration::from_secs_f64(1.0 / f64::from(rate.max(1)));
        *lock(&self.interval) = Some(interval);

        let mut driver = lock(&self.driver);
        if let Some(existing) = driver.as_ref() {
            if existing
                .command_sender
                .send(SchedulerCommand::Configure(interval))
                .is_ok()
            {
                info!("Scheduler reconfigured to {} Hz ({:?})", rate, interval);
                return;
            }
            warn!("Scheduler timer thread is gone, restarting it");
        }

        if let Some(stale) = driver.take() {
            let _ = stale.handle.join();
        }
        match spawn_timer(Arc::clone(&self.core), interval) {
            Ok(started) => {
                info!("Scheduler started at {} Hz ({:?})", rate, interval);
                *driver = Some(started);
            }
            Err(e) => error!("Failed to start scheduler timer thread: {}", e),
        }
    }

    /// Toggles whether ticks record anything. The timer keeps running.
    pub fn set_logging_enabled(&self, enabled: bool) {
        self.core.logging_enabled.store(enabled, Ordering::SeqCst);
        debug!("Logging {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.core.logging_enabled.load(Ordering::SeqCst)
    }

    /// Runs one tick synchronously. Never overlaps with another tick.
    pub fn tick(&self) -> TickOutcome {
        self.core.tick()
    }

    pub fn state(&self) -> SchedulerState {
        if lock(&self.driver).is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// The configured tick interval, if any.
    pub fn interval(&self) -> Option<Duration> {
        *lock(&self.interval)
    }
}

impl Drop for SnapshotScheduler {
    fn drop(&mut self) {
        let driver = self
            .driver
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(driver) = driver {
            let _ = driver.command_sender.send(SchedulerCommand::Shutdown);
            if driver.handle.join().is_err() {
                warn!("Scheduler timer thread panicked");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn spawn_timer(core: Arc<TickCore>, interval: Duration) -> std::io::Result<TimerDriver> {
    let (command_sender, command_receiver) = unbounded();
    let handle = thread::Builder::new()
        .name("snapshot-scheduler".into())
        .spawn(move || run_timer(core, command_receiver, interval))?;
    Ok(TimerDriver {
        command_sender,
        handle,
    })
}

fn run_timer(core: Arc<TickCore>, commands: Receiver<SchedulerCommand>, mut interval: Duration) {
    let mut next_tick = Instant::now() + interval;

    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match commands.recv_timeout(timeout) {
            Ok(SchedulerCommand::Configure(new_interval)) => {
                interval = new_interval;
                next_tick = Instant::now() + interval;
            }
            Ok(SchedulerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                core.tick();
                next_tick += interval;
                // 慢 tick 推迟下一次，不补跑也不并发
                let now = Instant::now();
                if next_tick < now {
                    next_tick = now;
                }
            }
        }
    }

    debug!("Scheduler timer thread exiting");
}
