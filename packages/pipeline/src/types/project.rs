//! Extracted and reconciled data-center projects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle stage of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planned,
    UnderConstruction,
    Operational,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::UnderConstruction => "under_construction",
            Self::Operational => "operational",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(Self::Planned),
            "under_construction" => Ok(Self::UnderConstruction),
            "operational" => Ok(Self::Operational),
            other => Err(format!(
                "invalid status {other:?}, expected one of planned, under_construction, operational"
            )),
        }
    }
}

/// One schema-valid extraction result from one document.
///
/// Only the extraction oracle's validation gate produces these in the
/// pipeline; the builder exists for tests and callers replaying stored data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProject {
    pub name: Option<String>,
    pub status: ProjectStatus,
    pub developer: Option<String>,
    pub size_sqft: Option<f64>,
    pub power_mw: Option<f64>,
    pub address: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub estimated_completion_date: Option<NaiveDate>,
    /// URLs of the documents that produced this record (never empty)
    pub source_documents: Vec<String>,
}

impl CandidateProject {
    pub fn new(status: ProjectStatus, source_url: impl Into<String>) -> Self {
        Self {
            name: None,
            status,
            developer: None,
            size_sqft: None,
            power_mw: None,
            address: None,
            filing_date: None,
            estimated_completion_date: None,
            source_documents: vec![source_url.into()],
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_developer(mut self, developer: impl Into<String>) -> Self {
        self.developer = Some(developer.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_size_sqft(mut self, sqft: f64) -> Self {
        self.size_sqft = Some(sqft);
        self
    }

    pub fn with_power_mw(mut self, mw: f64) -> Self {
        self.power_mw = Some(mw);
        self
    }

    pub fn with_filing_date(mut self, date: NaiveDate) -> Self {
        self.filing_date = Some(date);
        self
    }

    pub fn with_estimated_completion_date(mut self, date: NaiveDate) -> Self {
        self.estimated_completion_date = Some(date);
        self
    }
}

/// A reconciled project: one or more candidates merged under the same key.
///
/// Never mutated after the reconciler returns it. Durable identifiers are
/// assigned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: Option<String>,
    pub status: ProjectStatus,
    pub developer: Option<String>,
    pub size_sqft: Option<f64>,
    pub power_mw: Option<f64>,
    pub address: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub estimated_completion_date: Option<NaiveDate>,
    /// Union of every merged candidate's sources, first-seen order
    pub source_documents: Vec<String>,
}

impl Project {
    /// Whether `url` contributed to this project.
    pub fn references(&self, url: &str) -> bool {
        self.source_documents.iter().any(|u| u == url)
    }

    /// Human-readable label for logs.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed project")
    }
}

impl From<CandidateProject> for Project {
    fn from(c: CandidateProject) -> Self {
        let mut source_documents: Vec<String> = Vec::with_capacity(c.source_documents.len());
        for url in c.source_documents {
            if !source_documents.contains(&url) {
                source_documents.push(url);
            }
        }

        Self {
            name: c.name,
            status: c.status,
            developer: c.developer,
            size_sqft: c.size_sqft,
            power_mw: c.power_mw,
            address: c.address,
            filing_date: c.filing_date,
            estimated_completion_date: c.estimated_completion_date,
            source_documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("under_construction".parse(), Ok(ProjectStatus::UnderConstruction));
        assert!("approved".parse::<ProjectStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&ProjectStatus::Operational).unwrap(),
            "\"operational\""
        );
    }

    #[test]
    fn test_project_from_candidate_dedups_sources() {
        let mut candidate = CandidateProject::new(ProjectStatus::Planned, "https://a.gov/1")
            .with_name("Alpha DC");
        candidate.source_documents.push("https://a.gov/1".into());

        let project = Project::from(candidate);
        assert_eq!(project.source_documents, vec!["https://a.gov/1".to_string()]);
        assert!(project.references("https://a.gov/1"));
        assert_eq!(project.label(), "Alpha DC");
    }
}
