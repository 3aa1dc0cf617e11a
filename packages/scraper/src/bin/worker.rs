//! Scrape Worker
//!
//! Long-polls the task queue and runs one jurisdiction scrape per message
//! until SIGINT or SIGTERM. A task already in progress finishes and is
//! acknowledged before the process exits.

use anyhow::Result;
use dci_pipeline::{TaskWorker, WorkerConfig};
use dci_scraper::{init_tracing, shutdown_signal, Config, Services};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();
    info!("Starting scrape worker");

    let config = Config::from_env()?;
    let services = Services::connect(&config).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            info!("Received shutdown signal, finishing current task");
            shutdown.cancel();
        }
    });

    let worker = TaskWorker::new(services.queue.clone(), services.orchestrator.clone())
        .with_config(WorkerConfig::default().with_poll_wait(config.queue_wait));
    let stats = worker.run(shutdown).await;

    info!(
        processed = stats.processed(),
        failed = stats.failed,
        "Scrape worker exited"
    );
    Ok(())
}
