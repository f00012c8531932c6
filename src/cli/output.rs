//! Text vs JSON rendering of command output.
//!
//! Command handlers hand a payload to [`OutputWriter`], which picks the format.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::history::HistoryEntry;
use crate::http::HttpMethod;
use crate::testing::RunReport;

use super::OutputFormat;
use super::error::CliError;

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(payload, &mut handle)
    }

    pub fn render_to<T: Render + Serialize>(
        &self,
        payload: &T,
        w: &mut dyn Write,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => payload.render_text(w)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Human-readable rendering, implemented alongside `Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w)?;
        writeln!(w, "Run summary")?;

        let mut current_uri: Option<&str> = None;
        let summary = self.summary();
        for row in &summary {
            if current_uri != Some(row.descriptor_uri.as_str()) {
                writeln!(w, "  {}", row.descriptor_uri)?;
                current_uri = Some(row.descriptor_uri.as_str());
            }
            writeln!(
                w,
                "    {:<6} {} passed, {} failed",
                row.method.to_string(),
                row.passed,
                row.failed
            )?;
        }

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            writeln!(w)?;
            writeln!(w, "Failures")?;
            for outcome in failures {
                writeln!(
                    w,
                    "  {} {} :: {}",
                    outcome.method, outcome.descriptor_uri, outcome.case_name
                )?;
                if let Some(detail) = &outcome.detail {
                    writeln!(w, "    {detail}")?;
                }
            }
        }

        writeln!(w)?;
        writeln!(
            w,
            "Total: {} cases, {} passed, {} failed ({:.1}%) in {} ms",
            self.total,
            self.passed,
            self.failed,
            self.pass_rate() * 100.0,
            self.duration_ms()
        )?;
        for uri in &self.incomplete_descriptors {
            writeln!(w, "Incomplete: {uri} stopped before finishing its cases")?;
        }
        if self.aborted {
            writeln!(
                w,
                "Aborted: {} descriptor(s) not started",
                self.skipped_descriptors
            )?;
        }
        writeln!(
            w,
            "Result: {}",
            if self.overall_success { "PASSED" } else { "FAILED" }
        )
    }
}

/// Dry-run listing of what a run would execute.
#[derive(Debug, Serialize)]
pub struct Listing {
    pub descriptors: Vec<ListedDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct ListedDescriptor {
    pub path: PathBuf,
    pub uri: String,
    pub cases: Vec<ListedCase>,
}

#[derive(Debug, Serialize)]
pub struct ListedCase {
    pub method: HttpMethod,
    pub name: String,
    pub expect_failure: bool,
}

impl Render for Listing {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let mut total = 0;
        for descriptor in &self.descriptors {
            writeln!(w, "{} ({})", descriptor.uri, descriptor.path.display())?;
            for case in &descriptor.cases {
                let marker = if case.expect_failure { " [expect failure]" } else { "" };
                writeln!(w, "  {:<6} {}{marker}", case.method.to_string(), case.name)?;
            }
            total += descriptor.cases.len();
        }
        writeln!(
            w,
            "{} descriptor(s), {total} case(s)",
            self.descriptors.len()
        )
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryListing {
    pub runs: Vec<HistoryEntry>,
}

impl Render for HistoryListing {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.runs.is_empty() {
            return writeln!(w, "No recorded runs");
        }
        writeln!(
            w,
            "{:>6}  {:>15}  {:>8}  {:>6}  {:>6}  RESULT",
            "ID", "STARTED (ms)", "DURATION", "PASS", "FAIL"
        )?;
        for run in &self.runs {
            let result = match (run.overall_success, run.aborted) {
                (_, true) => "ABORTED",
                (true, false) => "PASSED",
                (false, false) => "FAILED",
            };
            writeln!(
                w,
                "{:>6}  {:>15}  {:>6}ms  {:>6}  {:>6}  {result}",
                run.id,
                run.started_at_ms,
                run.finished_at_ms.saturating_sub(run.started_at_ms),
                run.passed,
                run.failed
            )?;
        }
        Ok(())
    }
}
