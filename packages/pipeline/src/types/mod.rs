//! Domain types shared across the pipeline.

pub mod document;
pub mod project;
pub mod task;

pub use document::{meta, DocumentCategory, DocumentContent, RawDocument};
pub use project::{CandidateProject, Project, ProjectStatus};
pub use task::{ReceivedTask, ScrapeTask, TaskStatus};
