//! Run driver: executes every discovered descriptor and feeds the reporter.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::fixture::FixtureGenerator;

use super::case::EndpointDescriptor;
use super::report::Reporter;
use super::runner::SuiteRunner;

/// Execution mode for the descriptors of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Serial,
    Parallel(usize),
}

impl RunMode {
    pub fn from_concurrency(concurrency: usize) -> Self {
        if concurrency <= 1 {
            RunMode::Serial
        } else {
            RunMode::Parallel(concurrency)
        }
    }

    fn permits(self) -> usize {
        match self {
            RunMode::Serial => 1,
            RunMode::Parallel(n) => n,
        }
    }
}

pub struct Session {
    runner: Arc<SuiteRunner>,
    fixtures: FixtureGenerator,
    mode: RunMode,
}

impl Session {
    pub fn new(runner: SuiteRunner, fixtures: FixtureGenerator, mode: RunMode) -> Self {
        Self {
            runner: Arc::new(runner),
            fixtures,
            mode,
        }
    }

    /// Execute `descriptors` in order, up to the mode's concurrency at once.
    ///
    /// Outcomes reach `reporter` as each case finishes. Once `abort` fires no
    /// further descriptor is launched; descriptors already running finish
    /// normally.
    pub async fn run_all(
        &self,
        descriptors: Vec<EndpointDescriptor>,
        reporter: &Arc<Reporter>,
        abort: &CancellationToken,
    ) {
        let total = descriptors.len();
        let semaphore = Arc::new(Semaphore::new(self.mode.permits()));
        let mut tasks = JoinSet::new();
        let mut launched = 0usize;

        info!(descriptors = total, mode = ?self.mode, "starting run");

        for descriptor in descriptors {
            let permit = tokio::select! {
                biased;
                _ = abort.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            launched += 1;
            let runner = Arc::clone(&self.runner);
            let reporter = Arc::clone(reporter);
            let fixture = self.fixtures.next_fixture();
            tasks.spawn(async move {
                let uri = descriptor.uri.clone();
                let recorder = Arc::clone(&reporter);
                let run = tokio::spawn(async move {
                    runner
                        .run_each(&descriptor, &fixture, |outcome| recorder.record(outcome))
                        .await;
                });
                if let Err(err) = run.await {
                    error!(uri = %uri, error = %err, "descriptor stopped before finishing its cases");
                    reporter.mark_incomplete(&uri);
                }
                drop(permit);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "descriptor task did not complete");
            }
        }

        if launched < total {
            warn!(skipped = total - launched, "run aborted before all descriptors launched");
            reporter.mark_aborted(total - launched);
        }
    }
}
