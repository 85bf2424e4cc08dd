//! Request and response shapes exchanged with the transport layer.

use std::collections::BTreeMap;

use bugfy_store::{ErrorEvent, Issue, IssueStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification given to every event created through ingestion.
pub const ERROR_KIND: &str = "error";

/// A decoded error report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateErrorRequest {
    pub project_id: String,
    pub message: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl CreateErrorRequest {
    #[must_use]
    pub fn new(project_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// A stored error event as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateErrorResponse {
    pub id: String,
    pub project_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub fingerprint: String,
    pub context: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl From<ErrorEvent> for CreateErrorResponse {
    fn from(event: ErrorEvent) -> Self {
        Self {
            id: event.id.to_string(),
            project_id: event.project_id.to_string(),
            message: event.message,
            kind: event.kind,
            fingerprint: event.fingerprint,
            context: event.context,
            timestamp: event.timestamp,
        }
    }
}

/// An issue as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub fingerprint: String,
    pub count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: IssueStatus,
}

impl From<Issue> for IssueSummary {
    fn from(issue: Issue) -> Self {
        Self {
            id: issue.id.to_string(),
            project_id: issue.project_id.to_string(),
            title: issue.title,
            fingerprint: issue.fingerprint,
            count: issue.count,
            first_seen: issue.first_seen,
            last_seen: issue.last_seen,
            status: issue.status,
        }
    }
}
