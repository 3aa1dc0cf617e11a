use anthropic_client::AnthropicClient;
use anyhow::{Context, Result};
use dci_pipeline::ai::AnthropicCompletion;
use dci_pipeline::crawler::{ChromiumLauncher, HttpBrowserLauncher};
use dci_pipeline::stores::{FilesystemObjectStore, PostgresQueue, PostgresStore};
use dci_pipeline::{CrawlerConfig, ExtractionOracle, ScrapeOrchestrator};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;

/// Concrete collaborators for a process.
pub struct Services {
    pub store: Arc<PostgresStore>,
    pub queue: Arc<PostgresQueue>,
    pub objects: Arc<FilesystemObjectStore>,
    pub completion: Arc<AnthropicCompletion>,
    pub orchestrator: Arc<ScrapeOrchestrator>,
}

impl Services {
    /// Connect to the database and wire the orchestrator.
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = Arc::new(connect_store(config).await?);
        let queue = Arc::new(
            store
                .queue()
                .with_visibility_timeout(config.queue_visibility_timeout),
        );
        let objects = Arc::new(document_store(config));
        let completion = Arc::new(completion_service(config));

        let catalog = Arc::new(config.catalog()?);
        let launcher =
            Arc::new(HttpBrowserLauncher::new().context("Failed to build HTTP browser")?);
        let interactive_launcher = Arc::new(chromium_launcher(config)?);
        let crawler_config = CrawlerConfig::default()
            .with_navigation_timeout(config.navigation_timeout)
            .with_selector_timeout(config.selector_timeout);

        let orchestrator = ScrapeOrchestrator::new(
            catalog,
            launcher,
            ExtractionOracle::new(completion.clone()),
            store.clone(),
            objects.clone(),
        )
        .with_interactive_launcher(interactive_launcher)
        .with_crawler_config(crawler_config)
        .with_bucket(&config.document_bucket);

        info!(
            model = completion.model(),
            documents = %objects.root().display(),
            "Services ready"
        );

        Ok(Self {
            store,
            queue,
            objects,
            completion,
            orchestrator: Arc::new(orchestrator),
        })
    }
}

/// Connect to Postgres and run migrations.
pub async fn connect_store(config: &Config) -> Result<PostgresStore> {
    PostgresStore::new(&config.database_url)
        .await
        .context("Failed to connect to database")
}

pub fn document_store(config: &Config) -> FilesystemObjectStore {
    FilesystemObjectStore::new(&config.document_store_dir)
}

pub fn completion_service(config: &Config) -> AnthropicCompletion {
    AnthropicCompletion::new(AnthropicClient::new(&config.anthropic_api_key))
        .with_model(&config.extraction_model)
}

/// Headless Chromium for sources that render results with scripts.
pub fn chromium_launcher(config: &Config) -> Result<ChromiumLauncher> {
    let launcher = ChromiumLauncher::new()
        .context("Failed to build Chromium launcher")?
        .with_request_timeout(config.navigation_timeout);
    Ok(match &config.chrome_executable {
        Some(path) => launcher.with_executable(path),
        None => launcher,
    })
}
