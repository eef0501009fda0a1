use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::info;

use crate::scheduler::SnapshotScheduler;

pub const MIN_RATE: u32 = 1;
pub const MAX_RATE: u32 = 30;

/// Clamps a requested sampling rate into `[MIN_RATE, MAX_RATE]`.
pub fn clamp_rate(requested: i64) -> u32 {
    requested.clamp(i64::from(MIN_RATE), i64::from(MAX_RATE)) as u32
}

/// Owns the sampling rate and pushes every change into the scheduler.
pub struct RateController {
    scheduler: Arc<SnapshotScheduler>,
    rate: AtomicU32,
}

impl RateController {
    /// Does not configure the scheduler; call [`set_rate`](Self::set_rate) for that.
    pub fn new(scheduler: Arc<SnapshotScheduler>, initial_rate: i64) -> Self {
        Self {
            scheduler,
            rate: AtomicU32::new(clamp_rate(initial_rate)),
        }
    }

    /// Out-of-range requests are normalized, never rejected. Returns the applied rate.
    pub fn set_rate(&self, requested: i64) -> u32 {
        let rate = clamp_rate(requested);
        if i64::from(rate) != requested {
            info!("Requested rate {} clamped to {} samples per second", requested, rate);
        }
        self.rate.store(rate, Ordering::SeqCst);
        self.scheduler.configure(rate);
        rate
    }

    /// The selected rate. Before the first [`set_rate`](Self::set_rate) this is
    /// the clamped initial rate, which the scheduler has not been configured with yet.
    pub fn rate(&self) -> u32 {
        self.rate.load(Ordering::SeqCst)
    }
}
