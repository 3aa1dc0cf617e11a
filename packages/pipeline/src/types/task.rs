//! Scrape task messages and their status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A request to scrape one jurisdiction, as carried on the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeTask {
    pub task_id: String,
    pub location_id: String,
    pub county: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_by: Option<String>,
}

impl ScrapeTask {
    pub fn new(
        task_id: impl Into<String>,
        location_id: impl Into<String>,
        county: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            location_id: location_id.into(),
            county: county.into(),
            state: state.into(),
            initiated_by: None,
        }
    }

    pub fn with_initiated_by(mut self, who: impl Into<String>) -> Self {
        self.initiated_by = Some(who.into());
        self
    }
}

/// Task lifecycle as recorded by the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dequeued task plus the token needed to acknowledge it.
#[derive(Debug, Clone)]
pub struct ReceivedTask {
    pub task: ScrapeTask,
    pub ack_token: String,
}
