// ABOUTME: Progress reporting types for provisioning runs.
// ABOUTME: Phase/status/percent updates emitted through a caller-supplied sink.

use std::sync::{Arc, Mutex};

/// Phase of a provisioning run.
///
/// `Complete` and `Error` are terminal. `Error` at 100 percent marks the
/// recoverable hosting-only failure, not a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Hosting,
    Complete,
    Error,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Hosting => write!(f, "hosting"),
            Phase::Complete => write!(f, "complete"),
            Phase::Error => write!(f, "error"),
        }
    }
}

/// One progress update. Transient; emitted through the sink, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub status: String,
    /// 0-100.
    pub percent: u8,
}

impl ProgressUpdate {
    pub fn new(phase: Phase, status: impl Into<String>, percent: u8) -> Self {
        Self {
            phase,
            status: status.into(),
            percent: percent.min(100),
        }
    }
}

/// Caller-supplied sink for progress updates.
pub type ProgressSink = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// A sink that drops every update.
pub fn discard_progress() -> ProgressSink {
    Arc::new(|_| {})
}

/// A sink that records every update, for tests and progress displays.
pub fn collecting_sink() -> (ProgressSink, Arc<Mutex<Vec<ProgressUpdate>>>) {
    let seen: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: ProgressSink = Arc::new(move |update| {
        if let Ok(mut log) = sink_seen.lock() {
            log.push(update);
        }
    });
    (sink, seen)
}

/// Map the collaborator's 0-100 sub-progress into this run's 25-100 band.
///
/// Infrastructure creation owns the last three quarters of a run; once
/// the collaborator passes the halfway mark it is configuring public
/// hosting, so the phase flips from `Setup` to `Hosting`.
pub(crate) fn map_sub_progress(sub_percent: u8) -> (Phase, u8) {
    let sub = sub_percent.min(100) as u32;
    let overall = 25 + sub * 75 / 100;
    let phase = if sub >= 50 { Phase::Hosting } else { Phase::Setup };
    (phase, overall as u8)
}
