//! Setup progress reporting.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Receives setup progress. Only called while the controller is initializing.
pub trait ProgressSink {
    /// `fraction` is in `[0, 1]` and never decreases between calls. `delay` is
    /// how long the host should keep showing the indicator after this report.
    fn report_progress(&mut self, fraction: f32, delay: Option<Duration>);
}

/// Logs progress through `tracing`.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report_progress(&mut self, fraction: f32, delay: Option<Duration>) {
        tracing::debug!(percent = (fraction * 100.0).round(), ?delay, "setup progress");
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub fraction: f32,
    pub delay: Option<Duration>,
}

/// Keeps every report. Clones share the same record, so the host can hand one
/// clone to the controller and read the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    reports: Rc<RefCell<Vec<ProgressReport>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ProgressReport> {
        self.reports.borrow().clone()
    }

    /// Most recent fraction, or 0 before the first report.
    pub fn latest(&self) -> f32 {
        self.reports.borrow().last().map_or(0.0, |r| r.fraction)
    }

    pub fn is_complete(&self) -> bool {
        self.latest() >= 1.0
    }
}

impl ProgressSink for RecordingProgress {
    fn report_progress(&mut self, fraction: f32, delay: Option<Duration>) {
        self.reports.borrow_mut().push(ProgressReport { fraction, delay });
    }
}

/// Clamps fractions into `[0, 1]` and holds them at the highest value seen.
pub(crate) struct MonotonicProgress {
    sink: Box<dyn ProgressSink>,
    last: f32,
}

impl MonotonicProgress {
    pub(crate) fn new(sink: Box<dyn ProgressSink>) -> Self {
        Self { sink, last: 0.0 }
    }

    pub(crate) fn report(&mut self, fraction: f32, delay: Option<Duration>) {
        let fraction = if fraction.is_nan() { self.last } else { fraction.clamp(0.0, 1.0) };
        self.last = self.last.max(fraction);
        self.sink.report_progress(self.last, delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_clones_share_reports() {
        let recorder = RecordingProgress::new();
        let mut handle = recorder.clone();
        handle.report_progress(0.5, None);
        assert_eq!(recorder.reports().len(), 1);
        assert_eq!(recorder.latest(), 0.5);
        assert!(!recorder.is_complete());
    }

    #[test]
    fn monotonic_progress_clamps_and_never_regresses() {
        let recorder = RecordingProgress::new();
        let mut progress = MonotonicProgress::new(Box::new(recorder.clone()));
        progress.report(0.4, None);
        progress.report(0.2, None);
        progress.report(7.0, Some(Duration::from_millis(100)));
        progress.report(f32::NAN, None);

        let fractions: Vec<f32> = recorder.reports().iter().map(|r| r.fraction).collect();
        assert_eq!(fractions, vec![0.4, 0.4, 1.0, 1.0]);
        assert_eq!(recorder.reports()[2].delay, Some(Duration::from_millis(100)));
    }
}
