// rust/lifeline-api/src/main.rs
// run-api entry point: serve the read-only surface with graceful shutdown

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use lifeline_api::{router, AppState};
use lifeline_core::{setup_logging, ApiConfig, LogLevel};
use lifeline_store::{check_connection, connect, StoreReader};

const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "run-api", about = "Lifeline read-only API")]
struct Args {
    /// Path to the API YAML configuration file.
    #[arg(long, env = "API_CONFIG_FILE_PATH")]
    config: PathBuf,

    /// TRACE, DEBUG, INFO, SUCCESS, WARNING, ERROR, or CRITICAL.
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig::from_yaml(&args.config)
        .with_context(|| format!("loading api config from {}", args.config.display()))?;
    let _log_guard = setup_logging(args.log_level, &config.logging)?;

    let pool = connect(&config.db_connection, DB_ACQUIRE_TIMEOUT)
        .await
        .context("connecting to the shared store")?;
    check_connection(&pool)
        .await
        .context("checking the shared store connection")?;

    let app = router(AppState {
        reader: StoreReader::new(pool.clone()),
        pool: pool.clone(),
        api_key: config.api_key.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "lifeline api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    pool.close().await;
    info!("api stopped cleanly");
    Ok(())
}
