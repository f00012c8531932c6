//! Subcommand handlers.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collections::{self, Collection};
use crate::config::RunConfig;
use crate::environment::Environment;
use crate::fixture::FixtureGenerator;
use crate::error::HistoryError;
use crate::history::HistoryStore;
use crate::http::{ApiClient, HttpMethod};
use crate::testing::{Reporter, RunMode, RunReport, Session, SuiteRunner};

use super::error::{CliError, EXIT_ABORTED, EXIT_SUCCESS, EXIT_TESTS_FAILED};
use super::output::{HistoryListing, ListedCase, ListedDescriptor, Listing, OutputWriter};
use super::{HistoryArgs, ListArgs, OutputFormat, RunArgs};

/// Exit status for a finished run.
pub fn exit_code_for(report: &RunReport) -> i32 {
    if report.aborted {
        EXIT_ABORTED
    } else if report.overall_success {
        EXIT_SUCCESS
    } else {
        EXIT_TESTS_FAILED
    }
}

/// Discover descriptors, failing loudly on any schema error.
fn load_collection(config: &RunConfig, filter: Option<&str>) -> Result<Collection, CliError> {
    let mut collection = collections::discover(&config.tests_dir)?;
    if !collection.is_valid() {
        for err in &collection.errors {
            eprintln!("schema error: {err}");
        }
        return Err(CliError::Schema(collection.errors));
    }
    if let Some(pattern) = filter {
        collection.retain_matching(pattern);
    }
    Ok(collection)
}

/// `api-e2e run`
pub async fn run(config: &RunConfig, args: &RunArgs) -> Result<RunReport, CliError> {
    config.validate()?;
    let collection = load_collection(config, args.selection.filter.as_deref())?;
    if collection.descriptors.is_empty() {
        warn!(tests_dir = %config.tests_dir.display(), "no descriptors to run");
    }

    let client = ApiClient::new(config.client_options()?)?;
    info!(base_url = %client.base_url(), "target");
    let runner = SuiteRunner::new(client, Environment::new(config.variables.clone()));
    let session = Session::new(
        runner,
        FixtureGenerator::new(config.fixture_scope),
        RunMode::from_concurrency(config.concurrency),
    );

    let mut reporter = Reporter::new();
    if args.format == OutputFormat::Text {
        reporter = reporter.with_progress(Box::new(std::io::stdout()));
    }
    let reporter = Arc::new(reporter);

    let abort = CancellationToken::new();
    let signal_task = tokio::spawn(abort_on_ctrl_c(abort.clone()));

    session
        .run_all(collection.into_descriptors(), &reporter, &abort)
        .await;
    signal_task.abort();
    // The HTTP client and its connections go with the session.
    drop(session);

    let report = reporter.finalize()?;

    OutputWriter::new(args.format).render(&report)?;
    if let Some(path) = &args.report {
        write_json_report(path, &report)?;
    }
    if let Some(path) = &config.history.path {
        match HistoryStore::open(path).and_then(|store| store.record(&report)) {
            Ok(id) => info!(run_id = id, path = %path.display(), "run recorded in history"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to record run in history"),
        }
    }

    Ok(report)
}

async fn abort_on_ctrl_c(abort: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("interrupt received, finishing running descriptors");
            abort.cancel();
        }
        Err(err) => error!(error = %err, "failed to listen for interrupt"),
    }
}

fn write_json_report(path: &Path, report: &RunReport) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(report)?;
    fs::write(path, raw)?;
    Ok(())
}

/// `api-e2e list`
pub fn list(config: &RunConfig, args: &ListArgs) -> Result<Listing, CliError> {
    let collection = load_collection(config, args.selection.filter.as_deref())?;
    let listing = Listing {
        descriptors: collection
            .descriptors
            .into_iter()
            .map(|loaded| ListedDescriptor {
                cases: HttpMethod::ORDER
                    .iter()
                    .flat_map(|&method| {
                        loaded.descriptor.cases(method).iter().map(move |case| ListedCase {
                            method,
                            name: case.name.clone(),
                            expect_failure: case.expect_failure,
                        })
                    })
                    .collect(),
                uri: loaded.descriptor.uri,
                path: loaded.path,
            })
            .collect(),
    };

    OutputWriter::new(args.format).render(&listing)?;
    Ok(listing)
}

/// `api-e2e history`
pub fn history(config: &RunConfig, args: &HistoryArgs) -> Result<HistoryListing, CliError> {
    let listing = match &config.history.path {
        Some(path) if path.exists() => HistoryListing {
            runs: HistoryStore::open(path)?.recent(args.limit)?,
        },
        _ => HistoryListing { runs: Vec::new() },
    };

    OutputWriter::new(args.format).render(&listing)?;
    Ok(listing)
}

/// `api-e2e history --show ID`
pub fn show_run(config: &RunConfig, id: i64, format: OutputFormat) -> Result<RunReport, CliError> {
    let path = config
        .history
        .path
        .as_ref()
        .filter(|path| path.exists())
        .ok_or(HistoryError::RunNotFound(id))?;
    let report = HistoryStore::open(path)?
        .load_report(id)?
        .ok_or(HistoryError::RunNotFound(id))?;

    OutputWriter::new(format).render(&report)?;
    Ok(report)
}
