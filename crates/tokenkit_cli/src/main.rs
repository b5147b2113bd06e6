use std::process::ExitCode;

use clap::Parser;
use tokenkit_core::TokenkitConfig;
use tokenkit_core::logging::init_logging;
use tracing::error;

mod command;
mod handle;

use command::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match TokenkitConfig::from_env_file(cli.env_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(config.paths.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Deploy => handle::deploy(&config).await,
        Commands::Verify(args) => {
            args.apply(&mut config);
            handle::verify(&config).await
        }
        Commands::VerifySourcify(args) => {
            args.apply(&mut config);
            handle::verify_sourcify(&config).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "tokenkit failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
