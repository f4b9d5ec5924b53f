//! Two-phase progress events for bulk jobs (download, then compression).
//!
//! Events are fire-and-forget: a [`ProgressSink`] never applies backpressure
//! and never reports failure back to the pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Stage of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Download,
    Compression,
}

/// One progress report. `fraction` is nominally in [0, 1]; consumers must
/// tolerate small overshoot from rounding and, under
/// [`FractionFormula::Legacy`], values above 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub fraction: f64,
    pub is_first: bool,
    pub is_last: bool,
}

/// How the download-phase fraction is computed for item `index` of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FractionFormula {
    /// `(index + 1) / total`.
    #[default]
    Corrected,
    /// `index + 1 / total`, rounded to two decimals. Matches the historic
    /// fraction values (not the wire form: [`ProgressMessage`] scales to a
    /// percent); exceeds 1.0 once `index >= 1`.
    Legacy,
}

impl FractionFormula {
    pub fn download_fraction(self, index: usize, total: usize) -> f64 {
        if total == 0 {
            return 1.0;
        }
        match self {
            FractionFormula::Corrected => (index + 1) as f64 / total as f64,
            FractionFormula::Legacy => round2(index as f64 + 1.0 / total as f64),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Serialized form of a [`ProgressEvent`] for an external transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMessage {
    /// `fraction * 100`, rounded to two decimals.
    pub percent: f64,
    pub is_first: bool,
    pub is_last: bool,
    #[serde(rename = "type")]
    pub phase: Phase,
}

impl From<ProgressEvent> for ProgressMessage {
    fn from(ev: ProgressEvent) -> Self {
        Self {
            percent: round2(ev.fraction * 100.0),
            is_first: ev.is_first,
            is_last: ev.is_last,
            phase: ev.phase,
        }
    }
}

/// Observer of bulk-job progress.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

impl ProgressSink for tokio::sync::mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Bounded channels drop events when full rather than blocking the job.
impl ProgressSink for tokio::sync::mpsc::Sender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.try_send(event);
    }
}

/// Collects events in memory (useful for inspection after a job).
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn phase(&self, phase: Phase) -> Vec<ProgressEvent> {
        self.events().into_iter().filter(|e| e.phase == phase).collect()
    }
}

impl ProgressSink for ProgressLog {
    fn emit(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
