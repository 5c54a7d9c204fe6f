//! Scan progress reporting.
//!
//! Reports what the pipeline is doing so users see how much is left on a
//! large tree. Progress is emitted on **stderr** so stdout remains parseable
//! when output is written there.

use std::io::Write;

use crate::pipeline::ScanPhase;

/// A single progress event for a scan.
#[derive(Clone, Debug)]
pub enum ScanProgressEvent {
    /// The controller entered a new phase.
    Phase(ScanPhase),
    /// Classifying: `n` documents checked against the cache out of `total`.
    Classifying { n: u64, total: u64, hits: u64 },
    /// Extracting: `n` work items finished out of `total`.
    Extracting { n: u64, total: u64 },
}

/// Reports scan progress. Implementations write to stderr (human or JSON).
pub trait ScanProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the controlling task only.
    fn report(&self, event: ScanProgressEvent);
}

/// Human-friendly progress on stderr: "scan  extracting  1,234 / 5,000 documents".
pub struct StderrProgress;

impl ScanProgressReporter for StderrProgress {
    fn report(&self, event: ScanProgressEvent) {
        let line = match &event {
            ScanProgressEvent::Phase(phase) => format!("scan  {}\n", phase.as_str()),
            ScanProgressEvent::Classifying { n, total, hits } => format!(
                "scan  classifying  {} / {} documents ({} cached)\n",
                format_number(*n),
                format_number(*total),
                format_number(*hits)
            ),
            ScanProgressEvent::Extracting { n, total } => format!(
                "scan  extracting  {} / {} documents\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScanProgressReporter for JsonProgress {
    fn report(&self, event: ScanProgressEvent) {
        let obj = match &event {
            ScanProgressEvent::Phase(phase) => serde_json::json!({
                "event": "phase",
                "phase": phase.as_str()
            }),
            ScanProgressEvent::Classifying { n, total, hits } => serde_json::json!({
                "event": "progress",
                "phase": "classifying",
                "n": n,
                "total": total,
                "hits": hits
            }),
            ScanProgressEvent::Extracting { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScanProgressReporter for NoProgress {
    fn report(&self, _event: ScanProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ScanProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
