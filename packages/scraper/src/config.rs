use anyhow::{Context, Result};
use dci_pipeline::ai::DEFAULT_MODEL;
use dci_pipeline::orchestrator::DEFAULT_BUCKET;
use dci_pipeline::JurisdictionCatalog;
use dotenvy::dotenv;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub extraction_model: String,
    pub document_store_dir: PathBuf,
    pub document_bucket: String,
    pub queue_wait: Duration,
    pub queue_visibility_timeout: Duration,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub catalog_path: Option<PathBuf>,
    /// Chrome/Chromium binary for script-rendered sites; searched on `PATH` when unset
    pub chrome_executable: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let anthropic_api_key = lookup("ANTHROPIC_API_KEY")
            .or_else(|| lookup("CLAUDE_API_KEY"))
            .context("ANTHROPIC_API_KEY (or CLAUDE_API_KEY) must be set")?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            anthropic_api_key,
            extraction_model: lookup("EXTRACTION_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            document_store_dir: lookup("DOCUMENT_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./raw-documents-store")),
            document_bucket: lookup("DOCUMENT_BUCKET")
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            queue_wait: seconds(&lookup, "QUEUE_WAIT_SECONDS", 20)?,
            queue_visibility_timeout: seconds(&lookup, "QUEUE_VISIBILITY_SECONDS", 900)?,
            navigation_timeout: seconds(&lookup, "NAVIGATION_TIMEOUT_SECONDS", 30)?,
            selector_timeout: seconds(&lookup, "SELECTOR_TIMEOUT_SECONDS", 2)?,
            catalog_path: lookup("CATALOG_PATH").map(PathBuf::from),
            chrome_executable: lookup("CHROME_EXECUTABLE").map(PathBuf::from),
        })
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> Result<JurisdictionCatalog> {
        load_catalog(self.catalog_path.as_deref())
    }
}

/// Load the catalog at `path`, falling back to the built-in jurisdictions.
pub fn load_catalog(path: Option<&Path>) -> Result<JurisdictionCatalog> {
    match path {
        Some(path) => JurisdictionCatalog::from_path(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => Ok(JurisdictionCatalog::builtin()),
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/dci"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ]))
        .unwrap();

        assert_eq!(config.extraction_model, DEFAULT_MODEL);
        assert_eq!(config.document_bucket, "data-center-intel-documents-prod");
        assert_eq!(config.document_store_dir, PathBuf::from("./raw-documents-store"));
        assert_eq!(config.queue_wait, Duration::from_secs(20));
        assert_eq!(config.queue_visibility_timeout, Duration::from_secs(900));
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.selector_timeout, Duration::from_secs(2));
        assert!(config.catalog_path.is_none());
        assert!(config.chrome_executable.is_none());
    }

    #[test]
    fn test_claude_key_fallback() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/dci"),
            ("CLAUDE_API_KEY", "sk-ant-legacy"),
        ]))
        .unwrap();
        assert_eq!(config.anthropic_api_key, "sk-ant-legacy");

        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/dci"),
            ("ANTHROPIC_API_KEY", "sk-ant-new"),
            ("CLAUDE_API_KEY", "sk-ant-legacy"),
        ]))
        .unwrap();
        assert_eq!(config.anthropic_api_key, "sk-ant-new");
    }

    #[test]
    fn test_missing_required_values() {
        let err = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-ant-test")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/dci")])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_invalid_seconds() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/dci"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("QUEUE_WAIT_SECONDS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("QUEUE_WAIT_SECONDS"));
    }

    #[test]
    fn test_builtin_catalog_without_path() {
        let catalog = load_catalog(None).unwrap();
        assert!(catalog.get("loudoun-va").is_some());
    }
}
