// Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use dci_pipeline::stores::MemoryStore;
use dci_pipeline::testing::{MockBrowser, MockBrowserLauncher, MockCompletion, MockPage};
use dci_pipeline::{ExtractionOracle, JurisdictionCatalog, JurisdictionSource, ScrapeOrchestrator};

pub const COUNTY: &str = "Testville";
pub const STATE: &str = "VA";
pub const KEY: &str = "testville-va";

pub const BASE_URL: &str = "https://testville.example.gov";
pub const SEARCH_URL: &str = "https://testville.example.gov/search?q=data%20center";
pub const PERMIT_PDF: &str = "https://testville.example.gov/docs/building-permit-2024.pdf";
pub const MINUTES_PAGE: &str = "https://testville.example.gov/meetings/zoning-minutes";

/// Catalog with a single endpoint-searched jurisdiction.
pub fn test_catalog() -> JurisdictionCatalog {
    let mut catalog = JurisdictionCatalog::new();
    catalog
        .insert(
            KEY,
            JurisdictionSource::new("Testville, VA", BASE_URL, r#"a[href*=".pdf"], a.doc"#)
                .with_search_endpoint("/search?q=")
                .with_search_terms(["data center"]),
        )
        .unwrap();
    catalog
}

/// A site whose search results list one PDF and one HTML page.
pub fn site_with_two_documents() -> MockBrowser {
    MockBrowser::new()
        .with_page(BASE_URL, MockPage::new("Welcome to Testville").with_title("Testville"))
        .with_page(
            SEARCH_URL,
            MockPage::new("2 results").with_links([PERMIT_PDF, MINUTES_PAGE]),
        )
        .with_binary(PERMIT_PDF, b"%PDF-1.7 building permit".to_vec())
        .with_page(
            MINUTES_PAGE,
            MockPage::new("The board heard the data center rezoning request.")
                .with_title("Zoning Board Minutes"),
        )
}

/// A site whose search finds nothing.
pub fn site_with_no_results() -> MockBrowser {
    MockBrowser::new()
        .with_page(BASE_URL, MockPage::new("Welcome to Testville"))
        .with_page(SEARCH_URL, MockPage::new("0 results"))
}

pub fn fenced(json: &str) -> String {
    format!("Here is what I found:\n```json\n{json}\n```\n")
}

/// Replies describing the same project from both documents.
pub fn completion_for_two_documents() -> MockCompletion {
    MockCompletion::new()
        .with_reply(
            PERMIT_PDF,
            fenced(r#"{"name":"Project Cumulus","status":"planned","developer":"Cloud Co","powerMw":300}"#),
        )
        .with_reply(
            MINUTES_PAGE,
            fenced(
                r#"{"name":"project cumulus","status":"under construction","developer":"cloud co","sizeSqft":1000000,"address":"1 Server Way"}"#,
            ),
        )
}

pub fn orchestrator(
    launcher: &MockBrowserLauncher,
    completion: &MockCompletion,
    store: &Arc<MemoryStore>,
) -> ScrapeOrchestrator {
    ScrapeOrchestrator::new(
        Arc::new(test_catalog()),
        Arc::new(launcher.clone()),
        ExtractionOracle::new(Arc::new(completion.clone())),
        store.clone(),
        store.clone(),
    )
}
