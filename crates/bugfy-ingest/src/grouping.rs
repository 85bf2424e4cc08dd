//! Merging error events into issues.
//!
//! ```text
//! ErrorEvent ──▶ find (project, fingerprint) ──▶ merge ──▶ compare_and_upsert
//!                        ▲                                        │
//!                        └────────────── conflict ◀───────────────┘
//! ```
//!
//! The merge is computed from the document that was read and only written
//! if that document is still current, so concurrent events for the same
//! issue never lose an increment.

use std::sync::Arc;

use bugfy_store::{ErrorEvent, Issue, IssueStatus, IssueStore, ProjectId};
use tracing::{debug, error};

use crate::error::{IngestError, IngestResult};

/// Groups error events into issues by fingerprint.
#[derive(Clone)]
pub struct GroupingEngine {
    issues: Arc<dyn IssueStore>,
}

impl GroupingEngine {
    pub fn new(issues: Arc<dyn IssueStore>) -> Self {
        Self { issues }
    }

    /// Record `event` against its issue, opening the issue if needed.
    ///
    /// Returns the issue as written. The loop only repeats when another
    /// writer updated the same issue between the read and the write; the
    /// caller's deadline bounds it.
    pub async fn group_error(&self, event: &ErrorEvent) -> IngestResult<Issue> {
        let candidate = Issue::open(event);
        let mut conflicts = 0u32;

        loop {
            let existing = self
                .issues
                .find_by_fingerprint(&event.project_id, &event.fingerprint)
                .await
                .map_err(|e| {
                    error!(
                        project_id = %event.project_id,
                        fingerprint = %event.fingerprint,
                        error = %e,
                        "failed to find issue"
                    );
                    IngestError::Storage(e)
                })?;

            let merged = match &existing {
                Some(issue) => issue.with_occurrence(event.timestamp),
                None => candidate.clone(),
            };

            let written = self
                .issues
                .compare_and_upsert(existing.as_ref(), &merged)
                .await
                .map_err(|e| {
                    error!(
                        project_id = %event.project_id,
                        fingerprint = %event.fingerprint,
                        error = %e,
                        "failed to upsert issue"
                    );
                    IngestError::Storage(e)
                })?;

            if let Some(issue) = written {
                debug!(
                    project_id = %issue.project_id,
                    fingerprint = %issue.fingerprint,
                    count = issue.count,
                    conflicts,
                    "error grouped"
                );
                return Ok(issue);
            }

            conflicts += 1;
            debug!(
                project_id = %event.project_id,
                fingerprint = %event.fingerprint,
                conflicts,
                "issue changed concurrently, retrying merge"
            );
        }
    }

    /// Change the triage status of an issue without touching its counters.
    pub async fn set_status(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
        status: IssueStatus,
    ) -> IngestResult<Issue> {
        loop {
            let current = self
                .issues
                .find_by_fingerprint(project_id, fingerprint)
                .await?
                .ok_or_else(|| IngestError::IssueNotFound {
                    fingerprint: fingerprint.to_owned(),
                })?;

            if current.status == status {
                return Ok(current);
            }

            let updated = current.with_status(status);
            if let Some(issue) = self
                .issues
                .compare_and_upsert(Some(&current), &updated)
                .await?
            {
                return Ok(issue);
            }
        }
    }
}

impl std::fmt::Debug for GroupingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupingEngine").finish_non_exhaustive()
    }
}
