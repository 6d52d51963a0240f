//! Per-cycle scan diagnostics.
//!
//! A [`ScanDiagnostics`] snapshot is rebuilt at the start of every cycle and
//! exposed read-only for a status panel. Nothing in the engine reads it back
//! to make decisions.

use serde::Serialize;

/// Number of score samples kept per cycle.
pub const SAMPLE_SCORE_CAPACITY: usize = 8;

/// Maximum number of debug trace lines kept per cycle.
pub const DEBUG_TRACE_CAPACITY: usize = 32;

/// Counters and samples collected during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDiagnostics {
    /// Monotonic cycle number (not reset between cycles).
    pub cycle: u64,
    /// Where the viewport came from this cycle.
    pub bounds_source: Option<&'static str>,
    /// Geometry point-queries issued.
    pub queries_issued: u32,
    /// Score-backend lookups issued.
    pub score_queries: u32,
    /// Whether the scan stopped because the budget ran out.
    pub budget_exhausted: bool,
    /// Distinct entities examined whose position resolved.
    pub scanned: u32,
    /// Entities whose position resolved.
    pub has_position: u32,
    /// Positioned entities whose tile lies inside the viewport.
    pub visible: u32,
    /// Markers drawn.
    pub drawn: u32,
    /// Repeat hits on an identity already seen this cycle.
    pub duplicates: u32,
    /// Point-queries that failed.
    pub query_errors: u32,
    /// Entities with no resolvable score.
    pub null_score: u32,
    /// Entities whose score resolved only to zero.
    pub zero_score: u32,
    /// Entities projected without a host screen rectangle.
    pub rect_missing: u32,
    /// Accepted entities dropped because projection failed.
    pub projection_errors: u32,
    /// Highest score seen this cycle.
    pub max_score_seen: Option<f64>,
    /// First scores seen this cycle.
    pub sample_scores: Vec<f64>,
    /// Free-form trace lines.
    pub debug_trace: Vec<String>,
    /// Error that aborted the cycle, if any.
    pub last_error: Option<String>,
}

impl ScanDiagnostics {
    /// Start a fresh snapshot for the given cycle number.
    pub fn for_cycle(cycle: u64) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    /// Record a resolved score.
    pub fn record_score(&mut self, score: f64) {
        self.max_score_seen = Some(self.max_score_seen.map_or(score, |m| m.max(score)));
        if self.sample_scores.len() < SAMPLE_SCORE_CAPACITY {
            self.sample_scores.push(score);
        }
    }

    /// Append a trace line, dropping it once the trace is full.
    pub fn trace(&mut self, line: impl Into<String>) {
        if self.debug_trace.len() < DEBUG_TRACE_CAPACITY {
            self.debug_trace.push(line.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_score_tracks_max_and_samples() {
        let mut diag = ScanDiagnostics::default();
        for score in [5.0, 12.0, 3.0, 1.0, 2.0, 4.0, 6.0, 7.0, 8.0, 99.0] {
            diag.record_score(score);
        }
        assert_eq!(diag.max_score_seen, Some(99.0));
        assert_eq!(diag.sample_scores.len(), SAMPLE_SCORE_CAPACITY);
        assert_eq!(diag.sample_scores[0], 5.0);
    }

    #[test]
    fn test_trace_is_bounded() {
        let mut diag = ScanDiagnostics::default();
        for i in 0..100 {
            diag.trace(format!("line {}", i));
        }
        assert_eq!(diag.debug_trace.len(), DEBUG_TRACE_CAPACITY);
    }

    #[test]
    fn test_for_cycle_resets_counters() {
        let diag = ScanDiagnostics::for_cycle(7);
        assert_eq!(diag.cycle, 7);
        assert_eq!(diag.scanned, 0);
        assert!(diag.last_error.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut diag = ScanDiagnostics::for_cycle(1);
        diag.null_score = 2;
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["nullScore"], 2);
        assert_eq!(json["maxScoreSeen"], serde_json::Value::Null);
    }
}
