//! # CLI
//!
//! Command-line surface for CI pipelines:
//! - `api-e2e run` executes every discovered descriptor
//! - `api-e2e list` shows what would run without touching the network
//! - `api-e2e history` lists previously recorded runs

pub mod commands;
pub mod error;
pub mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::auth::AuthScheme;
use crate::config::{DEFAULT_CONFIG_FILE, RunConfig};

/// End-to-end test runner for configuration-management REST APIs.
#[derive(Debug, Parser)]
#[command(name = "api-e2e", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log level (overrides the config file; RUST_LOG overrides both)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute every discovered descriptor against the target API
    Run(RunArgs),
    /// List discovered descriptors and their cases without sending requests
    List(ListArgs),
    /// Show recently recorded runs
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Directory holding descriptor files
    #[arg(short, long)]
    pub tests_dir: Option<PathBuf>,

    /// Only descriptors whose uri contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Base URL of the target, e.g. https://192.168.1.1
    #[arg(long)]
    pub base_url: Option<String>,

    /// Basic auth username
    #[arg(long)]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "API_E2E_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Bearer token
    #[arg(long, env = "API_E2E_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Accept self-signed certificates
    #[arg(long)]
    pub insecure: bool,

    /// Number of descriptors to run at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Number of runs to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Show the full report of one recorded run
    #[arg(long, value_name = "ID")]
    pub show: Option<i64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Fold command-line overrides into the loaded config.
pub fn apply_run_overrides(config: &mut RunConfig, args: &RunArgs) {
    apply_selection(config, &args.selection);

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if args.insecure {
        config.verify_tls = false;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = timeout;
    }

    if let Some(token) = &args.token {
        config.auth.scheme = AuthScheme::Bearer;
        config.auth.token = Some(token.clone());
    } else if let Some(username) = &args.username {
        config.auth.scheme = AuthScheme::Basic;
        config.auth.username = Some(username.clone());
    }
    if let Some(password) = &args.password {
        config.auth.password = Some(password.clone());
    }
}

pub fn apply_selection(config: &mut RunConfig, selection: &SelectionArgs) {
    if let Some(dir) = &selection.tests_dir {
        config.tests_dir = dir.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "api-e2e",
            "run",
            "--base-url",
            "https://10.0.0.1",
            "--username",
            "admin",
            "--password",
            "pfsense",
            "--insecure",
            "--concurrency",
            "3",
            "--filter",
            "tunable",
            "--format",
            "json",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.selection.filter.as_deref(), Some("tunable"));
        assert_eq!(args.format, OutputFormat::Json);

        let mut config = RunConfig::default();
        apply_run_overrides(&mut config, &args);
        assert_eq!(config.base_url, "https://10.0.0.1");
        assert!(!config.verify_tls);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.auth.scheme, AuthScheme::Basic);
        assert_eq!(config.auth.password.as_deref(), Some("pfsense"));
    }

    #[test]
    fn token_selects_bearer_auth() {
        let cli = Cli::try_parse_from(["api-e2e", "run", "--token", "abc"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let mut config = RunConfig::default();
        apply_run_overrides(&mut config, &args);
        assert_eq!(config.auth.scheme, AuthScheme::Bearer);
    }

    #[test]
    fn list_and_history_parse() {
        let cli = Cli::try_parse_from(["api-e2e", "-c", "ci.toml", "list", "-t", "e2e"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("ci.toml"));
        assert!(matches!(cli.command, Commands::List(_)));

        let cli = Cli::try_parse_from(["api-e2e", "history", "-n", "5"]).unwrap();
        let Commands::History(args) = cli.command else {
            panic!("expected history command");
        };
        assert_eq!(args.limit, 5);
        assert_eq!(args.show, None);

        let cli = Cli::try_parse_from(["api-e2e", "history", "--show", "7"]).unwrap();
        let Commands::History(args) = cli.command else {
            panic!("expected history command");
        };
        assert_eq!(args.show, Some(7));
    }
}
