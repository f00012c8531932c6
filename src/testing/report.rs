use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ReportError;
use crate::http::HttpMethod;

use super::Outcome;

/// The finalized aggregate of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<Outcome>,
    pub overall_success: bool,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    /// Set when an abort signal stopped new descriptors from launching.
    #[serde(default)]
    pub aborted: bool,
    #[serde(default)]
    pub skipped_descriptors: usize,
    /// Descriptors whose task died before running all of their cases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incomplete_descriptors: Vec<String>,
}

/// Pass/fail counts for one method of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSummary {
    pub descriptor_uri: String,
    pub method: HttpMethod,
    pub passed: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn duration_ms(&self) -> u64 {
        self.finished_at_ms.saturating_sub(self.started_at_ms)
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.passed as f64 / self.total as f64
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// Counts per descriptor and method, in the order outcomes arrived.
    pub fn summary(&self) -> Vec<MethodSummary> {
        let mut rows: Vec<MethodSummary> = Vec::new();
        for outcome in &self.outcomes {
            let index = match rows
                .iter()
                .position(|r| r.descriptor_uri == outcome.descriptor_uri && r.method == outcome.method)
            {
                Some(index) => index,
                None => {
                    rows.push(MethodSummary {
                        descriptor_uri: outcome.descriptor_uri.clone(),
                        method: outcome.method,
                        passed: 0,
                        failed: 0,
                    });
                    rows.len() - 1
                }
            };

            if outcome.passed {
                rows[index].passed += 1;
            } else {
                rows[index].failed += 1;
            }
        }
        rows
    }
}

#[derive(Debug)]
struct ReporterState {
    outcomes: Vec<Outcome>,
    finalized: bool,
    aborted: bool,
    skipped_descriptors: usize,
    incomplete_descriptors: Vec<String>,
}

/// Collects outcomes from every descriptor. Safe to share between tasks.
pub struct Reporter {
    state: Mutex<ReporterState>,
    progress: Option<Mutex<Box<dyn Write + Send>>>,
    started_at_ms: u64,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReporterState {
                outcomes: Vec::new(),
                finalized: false,
                aborted: false,
                skipped_descriptors: 0,
                incomplete_descriptors: Vec::new(),
            }),
            progress: None,
            started_at_ms: now_ms(),
        }
    }

    /// Also stream one line per recorded outcome to `writer`.
    pub fn with_progress(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.progress = Some(Mutex::new(writer));
        self
    }

    pub fn record(&self, outcome: Outcome) {
        let mut state = self.lock_state();
        if state.finalized {
            warn!(
                uri = %outcome.descriptor_uri,
                case = %outcome.case_name,
                "outcome recorded after finalize, dropping"
            );
            return;
        }

        info!(
            uri = %outcome.descriptor_uri,
            method = %outcome.method,
            case = %outcome.case_name,
            passed = outcome.passed,
            "case finished"
        );

        if let Some(progress) = &self.progress {
            let mut writer = progress.lock().unwrap_or_else(|e| e.into_inner());
            let _ = writeln!(writer, "{}", progress_line(&outcome));
        }

        state.outcomes.push(outcome);
    }

    /// Note that the run was cut short and how many descriptors never ran.
    pub fn mark_aborted(&self, skipped_descriptors: usize) {
        let mut state = self.lock_state();
        state.aborted = true;
        state.skipped_descriptors += skipped_descriptors;
    }

    /// Note that a descriptor stopped without finishing its cases. The run
    /// can no longer succeed.
    pub fn mark_incomplete(&self, descriptor_uri: &str) {
        self.lock_state()
            .incomplete_descriptors
            .push(descriptor_uri.to_string());
    }

    /// Produce the report. Callable once; later calls fail.
    pub fn finalize(&self) -> Result<RunReport, ReportError> {
        let mut state = self.lock_state();
        if state.finalized {
            return Err(ReportError::AlreadyFinalized);
        }
        state.finalized = true;

        let outcomes = std::mem::take(&mut state.outcomes);
        let passed = outcomes.iter().filter(|o| o.passed).count();
        let total = outcomes.len();

        Ok(RunReport {
            overall_success: passed == total && state.incomplete_descriptors.is_empty(),
            total,
            passed,
            failed: total - passed,
            started_at_ms: self.started_at_ms,
            finished_at_ms: now_ms(),
            aborted: state.aborted,
            skipped_descriptors: state.skipped_descriptors,
            incomplete_descriptors: std::mem::take(&mut state.incomplete_descriptors),
            outcomes,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn progress_line(outcome: &Outcome) -> String {
    let verdict = if outcome.passed { "PASS" } else { "FAIL" };
    let mut line = format!(
        "{verdict} {:<6} {} :: {} ({} ms)",
        outcome.method.to_string(),
        outcome.descriptor_uri,
        outcome.case_name,
        outcome.duration_ms
    );
    if let Some(detail) = &outcome.detail {
        line.push_str("\n     ");
        line.push_str(detail);
    }
    line
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}
