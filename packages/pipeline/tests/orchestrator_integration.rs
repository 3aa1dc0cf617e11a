//! End-to-end runs of the orchestrator against scripted collaborators.
//!
//! These tests verify the full run:
//! 1. Catalog lookup and location resolution
//! 2. Crawl over a mock browsing session
//! 3. Archiving, extraction and reconciliation
//! 4. Persistence and task-status bookkeeping

mod common;

use std::sync::Arc;

use common::*;
use dci_pipeline::stores::MemoryStore;
use dci_pipeline::testing::{MockBrowser, MockBrowserLauncher, MockCompletion, MockPage};
use dci_pipeline::{
    CrawlError, DocumentCategory, ExtractionOracle, JurisdictionCatalog, JurisdictionSource,
    ProjectStatus, ProjectStore, ScrapeError, ScrapeOrchestrator, TaskStatus,
};

#[tokio::test]
async fn test_full_run_merges_and_persists() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new());

    let result = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.document_count, 2);
    assert_eq!(result.project_count, 1);
    assert_eq!(completion.call_count(), 2);
    assert!(launcher.browser().is_closed());

    let locations = store.locations();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].county, COUNTY);

    let projects = store.projects();
    assert_eq!(projects.len(), 1);
    let project = &projects[0].project;
    assert_eq!(projects[0].location_id, locations[0].id);
    assert_eq!(project.name.as_deref(), Some("Project Cumulus"));
    // First candidate's status wins; gaps are filled from the second.
    assert_eq!(project.status, ProjectStatus::Planned);
    assert_eq!(project.power_mw, Some(300.0));
    assert_eq!(project.size_sqft, Some(1_000_000.0));
    assert_eq!(project.address.as_deref(), Some("1 Server Way"));
    assert_eq!(project.source_documents, vec![PERMIT_PDF, MINUTES_PAGE]);

    let documents = store.documents();
    assert_eq!(documents.len(), 2);
    assert!(documents.iter().all(|d| d.project_id == projects[0].id));

    let permit = documents.iter().find(|d| d.source_url == PERMIT_PDF).unwrap();
    assert_eq!(permit.category, DocumentCategory::Permit);
    let locator = permit.storage_locator.as_deref().unwrap();
    assert!(locator.starts_with("memory://data-center-intel-documents-prod/raw-documents/VA/Testville/"));
    assert!(locator.ends_with(".pdf"));

    let minutes = documents.iter().find(|d| d.source_url == MINUTES_PAGE).unwrap();
    assert_eq!(minutes.category, DocumentCategory::ZoningMinutes);
    assert_eq!(store.object_count(), 2);
}

#[tokio::test]
async fn test_binary_document_is_archived_unchanged() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new());

    orchestrator(&launcher, &completion, &store)
        .with_bucket("archive-test")
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    let permit = store
        .documents()
        .into_iter()
        .find(|d| d.source_url == PERMIT_PDF)
        .unwrap();
    let key = permit
        .storage_locator
        .unwrap()
        .trim_start_matches("memory://archive-test/")
        .to_string();

    let object = store.object("archive-test", &key).unwrap();
    assert_eq!(object.content, b"%PDF-1.7 building permit".to_vec());
    assert_eq!(object.content_type, "application/pdf");
}

#[tokio::test]
async fn test_search_with_no_links_finds_nothing() {
    let launcher = MockBrowserLauncher::new(site_with_no_results());
    let completion = MockCompletion::new();
    let store = Arc::new(MemoryStore::new());

    let result = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.document_count, 0);
    assert_eq!(result.summary(), "No documents found");
    assert_eq!(completion.call_count(), 0);
    assert_eq!(store.object_count(), 0);
    assert!(store.projects().is_empty());
    assert!(launcher.browser().is_closed());
}

#[tokio::test]
async fn test_reply_without_fenced_block_yields_no_project() {
    let browser = MockBrowser::new()
        .with_page(BASE_URL, MockPage::new("Welcome"))
        .with_page(SEARCH_URL, MockPage::new("1 result").with_links([MINUTES_PAGE]))
        .with_page(MINUTES_PAGE, MockPage::new("Parks and recreation budget."));
    let launcher = MockBrowserLauncher::new(browser);
    let completion = MockCompletion::new()
        .with_reply(MINUTES_PAGE, "This document does not describe a data center.");
    let store = Arc::new(MemoryStore::new());

    let result = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.document_count, 1);
    assert_eq!(result.project_count, 0);
    assert!(store.projects().is_empty());
    // Archiving happens before extraction, whatever the model says.
    assert_eq!(store.object_count(), 1);
}

#[tokio::test]
async fn test_one_failed_extraction_does_not_affect_others() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents().with_failure(PERMIT_PDF);
    let store = Arc::new(MemoryStore::new());

    let result = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.project_count, 1);
    let project = &store.projects()[0].project;
    assert_eq!(project.status, ProjectStatus::UnderConstruction);
    assert_eq!(project.source_documents, vec![MINUTES_PAGE]);
    assert_eq!(store.documents().len(), 1);
}

#[tokio::test]
async fn test_missing_configuration_never_launches_browser() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = MockCompletion::new();
    let store = Arc::new(MemoryStore::new());

    let err = orchestrator(&launcher, &completion, &store)
        .run("nowhere-zz", "Nowhere", "ZZ")
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::ConfigurationMissing { ref key } if key == "nowhere-zz"));
    assert_eq!(launcher.launch_count(), 0);
    assert!(store.locations().is_empty());
}

#[tokio::test]
async fn test_script_rendered_source_uses_interactive_launcher() {
    let plain = MockBrowserLauncher::new(site_with_no_results());
    let rendering = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new());

    let result = orchestrator(&plain, &completion, &store)
        .with_interactive_launcher(Arc::new(rendering.clone()))
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.document_count, 2);
    assert_eq!(rendering.launch_count(), 1);
    assert_eq!(plain.launch_count(), 0);
    assert!(rendering.browser().is_closed());
}

#[tokio::test]
async fn test_static_source_keeps_default_launcher() {
    let plain = MockBrowserLauncher::new(site_with_two_documents());
    let rendering = MockBrowserLauncher::new(site_with_no_results());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new());

    let mut catalog = JurisdictionCatalog::new();
    catalog
        .insert(
            KEY,
            JurisdictionSource::new("Testville, VA", BASE_URL, r#"a[href*=".pdf"], a.doc"#)
                .with_search_endpoint("/search?q=")
                .with_search_terms(["data center"])
                .with_interactive_rendering(false),
        )
        .unwrap();

    let result = ScrapeOrchestrator::new(
        Arc::new(catalog),
        Arc::new(plain.clone()),
        ExtractionOracle::new(Arc::new(completion.clone())),
        store.clone(),
        store.clone(),
    )
    .with_interactive_launcher(Arc::new(rendering.clone()))
    .run(KEY, COUNTY, STATE)
    .await
    .unwrap();

    assert_eq!(result.document_count, 2);
    assert_eq!(plain.launch_count(), 1);
    assert_eq!(rendering.launch_count(), 0);
}

#[tokio::test]
async fn test_script_rendered_source_falls_back_without_engine() {
    let plain = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new());

    let result = orchestrator(&plain, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.document_count, 2);
    assert_eq!(plain.launch_count(), 1);
}

#[tokio::test]
async fn test_unreachable_entry_page_fails_and_closes_browser() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents().with_failure(BASE_URL));
    let completion = MockCompletion::new();
    let store = Arc::new(MemoryStore::new());

    let err = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScrapeError::Crawl(CrawlError::EntryUnreachable { .. })
    ));
    assert!(launcher.browser().is_closed());
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn test_browser_launch_failure_is_fatal() {
    let launcher = MockBrowserLauncher::failing();
    let completion = MockCompletion::new();
    let store = Arc::new(MemoryStore::new());

    let err = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::BrowserLaunch(_)));
    assert_eq!(launcher.launch_count(), 1);
}

#[tokio::test]
async fn test_upload_failures_still_persist_projects() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new().with_failing_uploads());

    let result = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.project_count, 1);
    assert_eq!(store.object_count(), 0);
    let documents = store.documents();
    assert_eq!(documents.len(), 2);
    assert!(documents.iter().all(|d| d.storage_locator.is_none()));
}

#[tokio::test]
async fn test_project_save_failure_is_absorbed() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new().with_failing_project_saves());

    let result = orchestrator(&launcher, &completion, &store)
        .run(KEY, COUNTY, STATE)
        .await
        .unwrap();

    assert_eq!(result.project_count, 1);
    assert!(store.projects().is_empty());
    assert!(store.documents().is_empty());
}

#[tokio::test]
async fn test_tracked_run_records_success() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new());

    let location_id = store.find_or_create_location(COUNTY, STATE).await.unwrap();
    let task_id = store.create_task(&location_id, Some("test")).await.unwrap();

    orchestrator(&launcher, &completion, &store)
        .run_tracked(COUNTY, STATE, Some(&task_id))
        .await
        .unwrap();

    let task = store.task(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Success);

    let statuses: Vec<TaskStatus> = task.history.iter().map(|(s, _)| *s).collect();
    assert_eq!(
        statuses,
        vec![TaskStatus::Queued, TaskStatus::Running, TaskStatus::Success]
    );
    assert_eq!(task.history[1].1.as_deref(), Some("Starting scrape..."));
    assert!(task.history[2]
        .1
        .as_deref()
        .unwrap()
        .starts_with("Completed: 2 documents, 1 projects found"));
    // The location created up front is reused by the run.
    assert_eq!(store.locations().len(), 1);
}

#[tokio::test]
async fn test_tracked_run_records_failure() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = MockCompletion::new();
    let store = Arc::new(MemoryStore::new());

    let location_id = store.find_or_create_location("Nowhere", "ZZ").await.unwrap();
    let task_id = store.create_task(&location_id, None).await.unwrap();

    let err = orchestrator(&launcher, &completion, &store)
        .run_tracked("Nowhere", "ZZ", Some(&task_id))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::ConfigurationMissing { .. }));
    let task = store.task(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert_eq!(
        task.history.last().unwrap().1.as_deref(),
        Some("Failed: no configuration found for nowhere-zz")
    );
}

#[tokio::test]
async fn test_unknown_task_id_does_not_change_outcome() {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    let store = Arc::new(MemoryStore::new());

    let result = orchestrator(&launcher, &completion, &store)
        .run_tracked(COUNTY, STATE, Some("missing-task"))
        .await
        .unwrap();

    assert_eq!(result.project_count, 1);
}
