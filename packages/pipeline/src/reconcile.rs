//! Merging of candidates that describe the same project.
//!
//! Identity is a heuristic key, lower-cased `"<name|unnamed>-<developer|unknown>"`.
//! Two spellings of one project stay separate; unrelated anonymous projects
//! collide unless [`ReconcileConfig::merge_anonymous`] is turned off.

use indexmap::IndexMap;

use crate::types::{CandidateProject, Project};

/// Merge aggressiveness.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Merge candidates with neither name nor developer under one key
    pub merge_anonymous: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            merge_anonymous: true,
        }
    }
}

impl ReconcileConfig {
    pub fn with_merge_anonymous(mut self, merge: bool) -> Self {
        self.merge_anonymous = merge;
        self
    }
}

/// Merge key for a candidate.
pub fn merge_key(candidate: &CandidateProject) -> String {
    format!(
        "{}-{}",
        candidate.name.as_deref().unwrap_or("unnamed"),
        candidate.developer.as_deref().unwrap_or("unknown")
    )
    .to_lowercase()
}

/// Reconciles candidates into projects. Pure; never fails.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// One project per distinct key, in order of first appearance.
    ///
    /// Sources accumulate as a duplicate-free union. Every other optional
    /// field keeps the first populated value; `status`, `name` and
    /// `developer` come from the first candidate under the key.
    pub fn reconcile(&self, candidates: Vec<CandidateProject>) -> Vec<Project> {
        let mut merged: IndexMap<String, Project> = IndexMap::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let anonymous = candidate.name.is_none() && candidate.developer.is_none();
            let key = if anonymous && !self.config.merge_anonymous {
                format!("{}#{}", merge_key(&candidate), index)
            } else {
                merge_key(&candidate)
            };

            match merged.get_mut(&key) {
                Some(existing) => absorb(existing, candidate),
                None => {
                    merged.insert(key, Project::from(candidate));
                }
            }
        }

        merged.into_values().collect()
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn absorb(project: &mut Project, candidate: CandidateProject) {
    for url in candidate.source_documents {
        if !project.references(&url) {
            project.source_documents.push(url);
        }
    }

    fill(&mut project.address, candidate.address);
    fill(&mut project.size_sqft, candidate.size_sqft);
    fill(&mut project.power_mw, candidate.power_mw);
    fill(&mut project.filing_date, candidate.filing_date);
    fill(
        &mut project.estimated_completion_date,
        candidate.estimated_completion_date,
    );
}
