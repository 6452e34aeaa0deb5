// rust/lifeline-worker/src/main.rs
// run-worker entry point: load config, wire components, enter the poll loop

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use lifeline_core::{setup_logging, IngestionConfig, LogLevel, WorkerConfig};
use lifeline_store::{check_connection, connect, AssignmentWriter, StoreReader};
use lifeline_worker::ingest::{ApiIngestor, DataIngestor, StoreIngestor};
use lifeline_worker::routes::RoutesClient;
use lifeline_worker::worker::PollWorker;

#[derive(Debug, Parser)]
#[command(name = "run-worker", about = "Lifeline optimization worker")]
struct Args {
    /// Path to the worker YAML configuration file.
    #[arg(long, env = "WORKER_CONFIG_FILE_PATH")]
    config: PathBuf,

    /// TRACE, DEBUG, INFO, SUCCESS, WARNING, ERROR, or CRITICAL.
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = WorkerConfig::from_yaml(&args.config)
        .with_context(|| format!("loading worker config from {}", args.config.display()))?;
    let _log_guard = setup_logging(args.log_level, &config.logging)?;

    info!(config = %args.config.display(), "starting lifeline worker");

    // External calls carry a deadline derived from the poll interval so a
    // stalled dependency cannot outlive the next scheduled tick.
    let poll_interval = config.poll_interval();

    let pool = connect(&config.db_connection, poll_interval)
        .await
        .context("connecting to the assignment store")?;
    check_connection(&pool)
        .await
        .context("checking the assignment store connection")?;
    let writer = AssignmentWriter::new(pool.clone());

    let ingestor: Box<dyn DataIngestor> = match &config.ingestion {
        IngestionConfig::Db(db) => {
            let ingest_pool = connect(db, poll_interval)
                .await
                .context("connecting to the ingestion store")?;
            check_connection(&ingest_pool)
                .await
                .context("checking the ingestion store connection")?;
            Box::new(StoreIngestor::new(StoreReader::new(ingest_pool)))
        }
        IngestionConfig::Api(api) => Box::new(
            ApiIngestor::new(api, poll_interval).context("building the API ingestor")?,
        ),
    };

    let routes = RoutesClient::new(
        config.google_maps_api_key.clone(),
        config.routing.clone(),
        poll_interval,
    )
    .context("building the routing oracle client")?;

    let mut worker = PollWorker::new(
        ingestor,
        routes,
        Box::new(writer),
        config.routing.speed_factor,
        poll_interval,
    );

    worker
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    pool.close().await;
    info!("worker stopped cleanly");
    Ok(())
}
