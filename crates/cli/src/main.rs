//! autotest - run a test command on every file change

use anyhow::Result;
use clap::Parser;
use cli_lib::{logging, App, Cli, Config};
use std::future::Future;
use std::process::ExitCode;
use tracing::error;
use tracing::instrument::WithSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = match logging::init(cli.verbose, cli.log_file.as_deref()) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = async move {
        match run(cli).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                ExitCode::FAILURE
            }
        }
    }
    .with_subscriber(logging.dispatch().clone())
    .await;

    drop(logging);
    code
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(&cli)?;
    App::new(config).run_until(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
///
/// The SIGTERM handler is installed before this returns, so a signal that
/// arrives while the watcher is still starting is not lost.
fn shutdown_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate());

    async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match sigterm {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
    }
}
