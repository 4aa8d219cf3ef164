//! Refresh tick sources implementing [`RefreshScheduler`].
//!
//! A browser would tie the sampling loop to the display refresh.  The kiosk
//! binary has no display loop of its own, so [`IntervalScheduler`] runs a
//! `tokio::time::Interval` at the configured refresh rate and only lets a
//! tick through while one has been requested.
//!
//! # Why not just sleep? (for beginners)
//!
//! `tokio::time::sleep` computes its deadline from "now", so any time spent
//! decoding pushes every following tick later.  An `Interval` keeps a fixed
//! cadence.  `MissedTickBehavior::Delay` stops it from firing a burst of
//! catch-up ticks after a slow decode.

pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::application::scan_frames::RefreshScheduler;

/// Lowest accepted refresh rate.
pub const MIN_REFRESH_HZ: u32 = 1;
/// Highest accepted refresh rate.
pub const MAX_REFRESH_HZ: u32 = 240;

/// Interval-driven [`RefreshScheduler`].
pub struct IntervalScheduler {
    interval: Interval,
    armed: bool,
}

impl IntervalScheduler {
    /// Creates a scheduler ticking at `refresh_hz`, clamped to
    /// [`MIN_REFRESH_HZ`]..=[`MAX_REFRESH_HZ`].
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn new(refresh_hz: u32) -> Self {
        let hz = refresh_hz.clamp(MIN_REFRESH_HZ, MAX_REFRESH_HZ);
        let mut interval = interval(Duration::from_secs_f64(1.0 / f64::from(hz)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            armed: false,
        }
    }

    /// Time between ticks.
    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl RefreshScheduler for IntervalScheduler {
    fn schedule(&mut self) {
        self.armed = true;
    }

    fn cancel(&mut self) {
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }

    async fn fired(&mut self) {
        if !self.armed {
            std::future::pending::<()>().await;
        }
        self.interval.tick().await;
        self.armed = false;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
