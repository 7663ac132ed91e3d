//! Pipeline stage and progress reporting.
//!
//! Long-running operations (ingest, search, answer generation) report
//! stage transitions through an explicit [`ProgressReporter`] owned by
//! the caller and passed to each stage boundary. There is no process-wide
//! tracker: core transformations stay pure and take no reporter at all.
//! Progress is emitted on **stderr** so stdout remains parseable.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// A named stage began (e.g. "extract", "embed", "search").
    StageStarted { stage: &'static str, detail: String },
    /// The stage finished successfully.
    StageCompleted { stage: &'static str, detail: String },
    /// The stage failed; the run is about to abort.
    StageFailed { stage: &'static str, error: String },
    /// Ingest progress: n files processed out of total.
    Ingesting { n: u64, total: u64 },
}

/// Reports pipeline progress. Implementations write to stderr.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress lines on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::StageStarted { stage, detail } => {
                format!("{}  started  {}\n", stage, detail)
            }
            ProgressEvent::StageCompleted { stage, detail } => {
                format!("{}  done  {}\n", stage, detail)
            }
            ProgressEvent::StageFailed { stage, error } => {
                format!("{}  FAILED  {}\n", stage, error)
            }
            ProgressEvent::Ingesting { n, total } => {
                format!(
                    "ingest  {} / {} files\n",
                    format_number(*n),
                    format_number(*total)
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::StageStarted { stage, detail } => serde_json::json!({
                "event": "stage_started",
                "stage": stage,
                "detail": detail
            }),
            ProgressEvent::StageCompleted { stage, detail } => serde_json::json!({
                "event": "stage_completed",
                "stage": stage,
                "detail": detail
            }),
            ProgressEvent::StageFailed { stage, error } => serde_json::json!({
                "event": "stage_failed",
                "stage": stage,
                "error": error
            }),
            ProgressEvent::Ingesting { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "ingesting",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
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
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
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
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
