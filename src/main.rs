use clap::Parser;

use api_e2e::cli::commands::{self, exit_code_for};
use api_e2e::cli::error::{CliError, EXIT_SUCCESS};
use api_e2e::cli::{Cli, Commands, apply_run_overrides, apply_selection};
use api_e2e::config::{DEFAULT_CONFIG_FILE, RunConfig};
use api_e2e::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    };
    std::process::exit(code);
}

async fn execute(cli: Cli) -> Result<i32, CliError> {
    let explicit_config = cli.config.as_os_str() != DEFAULT_CONFIG_FILE;
    let mut config = RunConfig::load(&cli.config, explicit_config)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    if let Err(err) = logging::init_tracing(&config.logging) {
        eprintln!("warning: {err}");
    }

    match cli.command {
        Commands::Run(args) => {
            apply_run_overrides(&mut config, &args);
            let report = commands::run(&config, &args).await?;
            Ok(exit_code_for(&report))
        }
        Commands::List(args) => {
            apply_selection(&mut config, &args.selection);
            commands::list(&config, &args)?;
            Ok(EXIT_SUCCESS)
        }
        Commands::History(args) => {
            match args.show {
                Some(id) => {
                    commands::show_run(&config, id, args.format)?;
                }
                None => {
                    commands::history(&config, &args)?;
                }
            }
            Ok(EXIT_SUCCESS)
        }
    }
}
