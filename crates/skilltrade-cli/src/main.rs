mod cli;
mod commands;
mod config;

use std::sync::Arc;

use tracing::debug;

use skilltrade_api::HttpClient;
use skilltrade_db::Database;
use skilltrade_session::Session;

use crate::cli::{Command, USAGE};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging; stdout is for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skilltrade=info,skilltrade_session=info,skilltrade_api=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match cli::parse(&args) {
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{}", usage);
            std::process::exit(2);
        }
    };

    let config = Config::from_env()?;
    let storage = Arc::new(Database::open(&config.db_path)?);
    let api = Arc::new(HttpClient::new(config.api_url.clone(), storage.clone()));
    debug!(api_url = api.base_url(), db = %config.db_path.display(), "Client configured");
    let session = Arc::new(Session::new(api, storage));

    if let Err(e) = commands::run(command, session, &config).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
