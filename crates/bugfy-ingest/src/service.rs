//! Ingestion orchestration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bugfy_store::{ErrorEvent, ErrorEventId, ErrorEventStore, IssueStatus, IssueStore, ProjectId};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{IngestError, IngestResult};
use crate::fingerprint::{compute_fingerprint, is_fingerprint};
use crate::grouping::GroupingEngine;
use crate::types::{CreateErrorRequest, CreateErrorResponse, IssueSummary, ERROR_KIND};

/// Entry point for error reports and issue queries.
///
/// Cheap to clone; every clone shares the same stores.
#[derive(Clone)]
pub struct IngestService {
    events: Arc<dyn ErrorEventStore>,
    issues: Arc<dyn IssueStore>,
    grouping: GroupingEngine,
    config: PipelineConfig,
}

impl IngestService {
    pub fn new(
        events: Arc<dyn ErrorEventStore>,
        issues: Arc<dyn IssueStore>,
        config: PipelineConfig,
    ) -> Self {
        let grouping = GroupingEngine::new(issues.clone());
        Self {
            events,
            issues,
            grouping,
            config,
        }
    }

    /// Deadline applied to every operation.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// Ingest one error report.
    ///
    /// 1. Validate the project ID and message (nothing is written on failure)
    /// 2. Store the error event
    /// 3. Merge the event into its issue
    ///
    /// The event stays stored if step 3 fails. Whether that failure fails
    /// the call is decided by [`PipelineConfig::fail_on_grouping_error`].
    #[tracing::instrument(skip(self, request), fields(project_id = %request.project_id))]
    pub async fn create_error(
        &self,
        request: CreateErrorRequest,
    ) -> IngestResult<CreateErrorResponse> {
        self.with_deadline(self.create_error_inner(request)).await
    }

    async fn create_error_inner(
        &self,
        request: CreateErrorRequest,
    ) -> IngestResult<CreateErrorResponse> {
        let project_id = parse_project_id(&request.project_id)?;

        if request.message.trim().is_empty() {
            warn!("rejected error report without message");
            return Err(IngestError::Validation("message is required".to_owned()));
        }

        let event = ErrorEvent {
            id: ErrorEventId::generate(),
            project_id,
            fingerprint: compute_fingerprint(&request.message),
            message: request.message,
            kind: ERROR_KIND.to_owned(),
            context: request.context,
            timestamp: Utc::now(),
        };

        self.events.insert(&event).await.map_err(|e| {
            error!(
                fingerprint = %event.fingerprint,
                error = %e,
                "failed to store error event"
            );
            IngestError::Storage(e)
        })?;

        info!(
            event_id = %event.id,
            fingerprint = %event.fingerprint,
            "error event stored"
        );

        match self.grouping.group_error(&event).await {
            Ok(issue) => {
                info!(
                    issue_id = %issue.id,
                    fingerprint = %issue.fingerprint,
                    count = issue.count,
                    "error grouped into issue"
                );
            }
            Err(e) if self.config.fail_on_grouping_error => {
                error!(
                    event_id = %event.id,
                    fingerprint = %event.fingerprint,
                    error = %e,
                    "grouping failed, error event left without issue"
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    event_id = %event.id,
                    fingerprint = %event.fingerprint,
                    error = %e,
                    "grouping failed, returning stored error event"
                );
            }
        }

        Ok(event.into())
    }

    /// All issues of a project.
    #[tracing::instrument(skip(self))]
    pub async fn list_issues(&self, project_id: &str) -> IngestResult<Vec<IssueSummary>> {
        self.with_deadline(async {
            let project_id = parse_project_id(project_id)?;
            let issues = self.issues.list_by_project(&project_id).await.map_err(|e| {
                error!(error = %e, "failed to fetch issues");
                IngestError::Storage(e)
            })?;

            Ok(issues.into_iter().map(IssueSummary::from).collect())
        })
        .await
    }

    /// Error events grouped under one issue.
    #[tracing::instrument(skip(self))]
    pub async fn list_errors(
        &self,
        project_id: &str,
        fingerprint: &str,
    ) -> IngestResult<Vec<CreateErrorResponse>> {
        self.with_deadline(async {
            let project_id = parse_project_id(project_id)?;
            let fingerprint = parse_fingerprint(fingerprint)?;

            let events = self
                .events
                .list_by_fingerprint(&project_id, fingerprint)
                .await
                .map_err(|e| {
                    error!(error = %e, "failed to fetch error events");
                    IngestError::Storage(e)
                })?;

            Ok(events.into_iter().map(CreateErrorResponse::from).collect())
        })
        .await
    }

    /// Change the triage status of an issue.
    #[tracing::instrument(skip(self))]
    pub async fn set_issue_status(
        &self,
        project_id: &str,
        fingerprint: &str,
        status: IssueStatus,
    ) -> IngestResult<IssueSummary> {
        self.with_deadline(async {
            let project_id = parse_project_id(project_id)?;
            let fingerprint = parse_fingerprint(fingerprint)?;

            let issue = self
                .grouping
                .set_status(&project_id, fingerprint, status)
                .await?;
            info!(issue_id = %issue.id, %status, "issue status changed");

            Ok(issue.into())
        })
        .await
    }

    async fn with_deadline<T>(
        &self,
        operation: impl Future<Output = IngestResult<T>>,
    ) -> IngestResult<T> {
        let duration = self.config.timeout();
        match tokio::time::timeout(duration, operation).await {
            Ok(result) => result,
            Err(_) => {
                error!(?duration, "operation exceeded deadline");
                Err(IngestError::Timeout { duration })
            }
        }
    }
}

impl std::fmt::Debug for IngestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn parse_project_id(value: &str) -> IngestResult<ProjectId> {
    value.parse().map_err(|source| {
        warn!(project_id = %value, "rejected malformed project id");
        IngestError::InvalidProjectId {
            value: value.to_owned(),
            source,
        }
    })
}

fn parse_fingerprint(value: &str) -> IngestResult<&str> {
    if is_fingerprint(value) {
        Ok(value)
    } else {
        Err(IngestError::InvalidFingerprint(value.to_owned()))
    }
}
