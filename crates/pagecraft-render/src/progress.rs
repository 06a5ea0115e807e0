//! Export progress reporting.

use serde::Serialize;

/// Stage of an album export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum ExportPhase {
    Preparing,
    /// `page` of `total` pages finished rendering.
    Rendering { page: usize, total: usize },
    Generating,
    Complete,
}

impl ExportPhase {
    /// Nominal percentage for the phase.
    pub fn percent(self) -> u8 {
        match self {
            ExportPhase::Preparing => 0,
            ExportPhase::Rendering { page, total } => {
                if total == 0 {
                    5
                } else {
                    (5 + 85 * page.min(total) / total) as u8
                }
            }
            ExportPhase::Generating => 95,
            ExportPhase::Complete => 100,
        }
    }
}

/// A progress report delivered to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    #[serde(flatten)]
    pub phase: ExportPhase,
    pub percent: u8,
}

/// Forwards phases to a callback, never letting the percentage go down.
pub struct ProgressTracker<F: FnMut(ExportProgress)> {
    callback: F,
    last: u8,
}

impl<F: FnMut(ExportProgress)> ProgressTracker<F> {
    pub fn new(callback: F) -> Self {
        Self { callback, last: 0 }
    }

    pub fn report(&mut self, phase: ExportPhase) {
        let percent = phase.percent().max(self.last).min(100);
        self.last = percent;
        (self.callback)(ExportProgress { phase, percent });
    }

    pub fn last_percent(&self) -> u8 {
        self.last
    }
}
