use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portal::cli::Cli;
use portal::commands::App;
use portal::config::Config;
use portal::routes::redirect_for;
use portal::storage::FileStore;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(path) = cli.state_file {
        config.state_file = path;
    }

    // Logs go to stderr so command output stays clean.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("portal v{} against {}", env!("CARGO_PKG_VERSION"), config.api_url);

    let store = Arc::new(FileStore::open(&config.state_file)?);
    info!("State file: {}", store.path().display());

    let app = App::new(config, store)?;
    match app.run(cli.command).await {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            debug!("command failed: {e}");
            eprintln!("Error: {}", e.user_message());
            if let Some(route) = redirect_for(&e) {
                eprintln!("Log in again (portal login) to continue at {route}.");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
