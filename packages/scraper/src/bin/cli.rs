//! Scraper CLI
//!
//! One-off scrapes, catalog listing, connectivity checks and task
//! enqueueing. Exits non-zero when the command fails.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dci_pipeline::{jurisdiction_key, CompletionService, ProjectStore, ScrapeTask, TaskQueue};
use dci_scraper::services::{completion_service, connect_store, document_store};
use dci_scraper::{init_tracing, load_catalog, Config, Services};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dci-scraper")]
#[command(about = "Find data center projects in county and city government documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one jurisdiction now
    Scrape {
        county: String,
        state: String,
        /// Record progress against an existing task
        #[arg(long)]
        task_id: Option<String>,
    },

    /// List configured jurisdictions
    List,

    /// Check the database, document store and extraction service
    TestConnection,

    /// Queue a scrape for the worker
    Enqueue {
        county: String,
        state: String,
        #[arg(long)]
        initiated_by: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            county,
            state,
            task_id,
        } => cmd_scrape(&county, &state, task_id.as_deref()).await,
        Commands::List => cmd_list(),
        Commands::TestConnection => cmd_test_connection().await,
        Commands::Enqueue {
            county,
            state,
            initiated_by,
        } => cmd_enqueue(&county, &state, initiated_by.as_deref()).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_scrape(county: &str, state: &str, task_id: Option<&str>) -> Result<()> {
    let config = Config::from_env()?;
    let services = Services::connect(&config).await?;

    println!(
        "Scraping {}, {}...",
        style(county).cyan().bold(),
        style(state).cyan().bold()
    );

    match services.orchestrator.run_tracked(county, state, task_id).await {
        Ok(result) => {
            println!("{} {}", style("✓").green(), result.summary());
            Ok(())
        }
        Err(e) => {
            println!("{} Scrape failed: {}", style("✗").red(), e);
            Err(e).context("Scrape failed")
        }
    }
}

fn cmd_list() -> Result<()> {
    let path = std::env::var_os("CATALOG_PATH").map(PathBuf::from);
    let catalog = load_catalog(path.as_deref())?;

    println!("{}", style("Configured jurisdictions:").bold());
    for (key, source) in catalog.iter() {
        let search = if source.search_endpoint.is_some() {
            "endpoint"
        } else {
            "on-page"
        };
        println!(
            "  {:<20} {} ({})",
            style(key).cyan(),
            source.display_name,
            style(search).dim()
        );
    }
    println!("\n{} jurisdictions", style(catalog.len()).yellow().bold());
    Ok(())
}

async fn cmd_test_connection() -> Result<()> {
    let config = Config::from_env()?;
    let mut failures = 0;

    println!("{}", style("Testing connections...").bold());

    let database = match connect_store(&config).await {
        Ok(store) => store.ping().await.context("Database ping failed"),
        Err(e) => Err(e),
    };
    failures += report("Database", database);

    let documents = document_store(&config)
        .check_writable()
        .await
        .with_context(|| format!("{} is not writable", config.document_store_dir.display()));
    failures += report("Document store", documents);

    let extraction = completion_service(&config)
        .ping()
        .await
        .context("Extraction service unreachable");
    failures += report("Extraction service", extraction);

    if failures > 0 {
        bail!("{failures} connection check(s) failed");
    }
    println!("\n{}", style("All connections OK").green().bold());
    Ok(())
}

async fn cmd_enqueue(county: &str, state: &str, initiated_by: Option<&str>) -> Result<()> {
    let config = Config::from_env()?;
    let services = Services::connect(&config).await?;

    let key = jurisdiction_key(county, state);
    if services.orchestrator.catalog().get(&key).is_none() {
        println!(
            "{} No catalog entry for {}, {}; the task will fail when processed",
            style("!").yellow(),
            county,
            state
        );
    }

    let location_id = services
        .store
        .find_or_create_location(county, state)
        .await
        .context("Failed to resolve location")?;
    let task_id = services
        .store
        .create_task(&location_id, initiated_by)
        .await
        .context("Failed to create task")?;

    let mut task = ScrapeTask::new(&task_id, &location_id, county, state);
    if let Some(who) = initiated_by {
        task = task.with_initiated_by(who);
    }
    services
        .queue
        .send(&task)
        .await
        .context("Failed to send task to queue")?;

    println!("{} Queued task {}", style("✓").green(), style(&task_id).cyan());
    Ok(())
}

/// Print one check line; returns 1 on failure.
fn report(name: &str, result: Result<()>) -> usize {
    match result {
        Ok(()) => {
            println!("  {} {}", style("✓").green(), name);
            0
        }
        Err(e) => {
            println!("  {} {}: {:#}", style("✗").red(), name, e);
            1
        }
    }
}
