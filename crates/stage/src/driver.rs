//! Frame driver: turns host refresh callbacks into `on_frame` calls.

use std::time::{Duration, Instant};

use hatchlight_shading::ShaderBackend;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{FrameError, LifecycleController, LifecycleState};

/// Interval clamps, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Longest interval passed to `on_frame`. Stalls and suspended hosts are
    /// squashed to this.
    pub max_interval: f64,
    /// Shortest interval after the first frame, so elapsed keeps increasing.
    pub min_interval: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_interval: 1.0 / 15.0,
            min_interval: 1e-4,
        }
    }
}

/// Timing handed to `on_frame` for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub interval: f64,
    pub elapsed: f64,
    /// Ticks accepted so far, this one included.
    pub frame: u64,
    /// The raw wall-clock interval was outside the configured bounds.
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("controller is {0}; ticks are refused")]
    NotRunning(LifecycleState),
    #[error("driver is suspended")]
    Suspended,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Supplies `(interval, elapsed)` to one controller.
///
/// The first accepted tick moves the controller from Ready to Running and
/// supplies `(0, 0)`. `elapsed` is the sum of supplied intervals, so it
/// never includes time the driver spent suspended or clamped away.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    config: DriverConfig,
    last: Option<Instant>,
    elapsed: f64,
    frame: u64,
    suspended: bool,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl FrameDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            last: None,
            elapsed: 0.0,
            frame: 0,
            suspended: false,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Tick using the current time.
    pub fn tick<B: ShaderBackend + 'static>(
        &mut self,
        controller: &LifecycleController<B>,
    ) -> Result<FrameTime, DriverError> {
        self.tick_at(controller, Instant::now())
    }

    /// Tick as if the host refreshed at `now`.
    pub fn tick_at<B: ShaderBackend + 'static>(
        &mut self,
        controller: &LifecycleController<B>,
        now: Instant,
    ) -> Result<FrameTime, DriverError> {
        if self.suspended {
            return Err(DriverError::Suspended);
        }
        match controller.state() {
            LifecycleState::Ready => controller.begin_running()?,
            LifecycleState::Running => {}
            state => return Err(DriverError::NotRunning(state)),
        }

        let (interval, clamped) = match self.last {
            None => (0.0, false),
            Some(previous) => self.clamp(now.saturating_duration_since(previous)),
        };
        if clamped {
            tracing::debug!(interval, "frame interval clamped");
        }

        controller.on_frame(interval, self.elapsed + interval)?;
        self.last = Some(now);
        self.elapsed += interval;
        self.frame += 1;
        Ok(FrameTime {
            interval,
            elapsed: self.elapsed,
            frame: self.frame,
            clamped,
        })
    }

    fn clamp(&self, raw: Duration) -> (f64, bool) {
        let raw = raw.as_secs_f64();
        if raw > self.config.max_interval {
            (self.config.max_interval, true)
        } else if raw < self.config.min_interval {
            (self.config.min_interval, true)
        } else {
            (raw, false)
        }
    }

    /// Host went to the background. Ticks are refused until [`Self::resume_at`].
    pub fn suspend(&mut self) {
        if !self.suspended {
            tracing::debug!(elapsed = self.elapsed, "frame driver suspended");
        }
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// Host is back. The next interval is measured from `now`, so the
    /// suspended span is never observed.
    pub fn resume_at(&mut self, now: Instant) {
        if self.suspended {
            tracing::debug!(elapsed = self.elapsed, "frame driver resumed");
        }
        self.suspended = false;
        if self.last.is_some() {
            self.last = Some(now);
        }
    }
}
