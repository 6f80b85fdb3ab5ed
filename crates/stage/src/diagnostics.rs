//! Frame diagnostics.

/// Receives one `tick` per processed frame.
pub trait Diagnostics {
    /// `interval` is the frame interval in seconds, as supplied to `on_frame`.
    fn tick(&mut self, interval: f64);

    /// Frames per second, once enough frames have been seen.
    fn fps(&self) -> Option<f64> {
        None
    }

    /// Forget accumulated state.
    fn reset(&mut self) {}
}

/// Ignores every tick.
#[derive(Debug, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn tick(&mut self, _interval: f64) {}
}

/// Frames-per-second counter over a rolling window.
///
/// Time comes from the supplied intervals, not from a wall clock, so the
/// counter agrees with whatever clock drives the frames.
#[derive(Debug)]
pub struct FpsCounter {
    window: f64,
    accumulated: f64,
    frames_in_window: u32,
    fps: Option<f64>,
    total_frames: u64,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FpsCounter {
    /// `window` in seconds; non-positive values fall back to one second.
    pub fn new(window: f64) -> Self {
        let window = if window > 0.0 { window } else { 1.0 };
        Self {
            window,
            accumulated: 0.0,
            frames_in_window: 0,
            fps: None,
            total_frames: 0,
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Diagnostics for FpsCounter {
    fn tick(&mut self, interval: f64) {
        self.total_frames += 1;
        self.frames_in_window += 1;
        if interval.is_finite() && interval > 0.0 {
            self.accumulated += interval;
        }
        if self.accumulated >= self.window {
            self.fps = Some(f64::from(self.frames_in_window) / self.accumulated);
            self.accumulated = 0.0;
            self.frames_in_window = 0;
        }
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn reset(&mut self) {
        *self = Self::new(self.window);
    }
}
