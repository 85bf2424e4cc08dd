//! Common test utilities for ingestion integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bugfy_ingest::config::PipelineConfig;
use bugfy_ingest::IngestService;
use bugfy_store::{
    Issue, IssueStore, MemoryErrorEventStore, MemoryIssueStore, ProjectId, StoreError,
    StoreResult,
};

/// Service wired to in-memory stores that stay inspectable.
pub struct TestPipeline {
    pub service: IngestService,
    pub events: MemoryErrorEventStore,
    pub issues: MemoryIssueStore,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let events = MemoryErrorEventStore::new();
        let issues = MemoryIssueStore::new();
        let service = IngestService::new(
            Arc::new(events.clone()),
            Arc::new(issues.clone()),
            config,
        );

        Self {
            service,
            events,
            issues,
        }
    }
}

/// Pipeline whose issue store is replaced by `issues`.
pub fn pipeline_with_issue_store(
    issues: Arc<dyn IssueStore>,
    config: PipelineConfig,
) -> (IngestService, MemoryErrorEventStore) {
    let events = MemoryErrorEventStore::new();
    let service = IngestService::new(Arc::new(events.clone()), issues, config);
    (service, events)
}

pub fn project_id() -> String {
    ProjectId::generate().to_string()
}

/// Issue store whose every call fails as if the backend were unreachable.
pub struct UnavailableIssueStore;

#[async_trait]
impl IssueStore for UnavailableIssueStore {
    async fn find_by_fingerprint(
        &self,
        _project_id: &ProjectId,
        _fingerprint: &str,
    ) -> StoreResult<Option<Issue>> {
        Err(StoreError::Connection("issue store unreachable".to_owned()))
    }

    async fn upsert(&self, _issue: &Issue) -> StoreResult<Issue> {
        Err(StoreError::Connection("issue store unreachable".to_owned()))
    }

    async fn compare_and_upsert(
        &self,
        _expected: Option<&Issue>,
        _issue: &Issue,
    ) -> StoreResult<Option<Issue>> {
        Err(StoreError::Connection("issue store unreachable".to_owned()))
    }

    async fn list_by_project(&self, _project_id: &ProjectId) -> StoreResult<Vec<Issue>> {
        Err(StoreError::Connection("issue store unreachable".to_owned()))
    }
}

/// Issue store that answers after a fixed delay.
pub struct SlowIssueStore {
    pub inner: MemoryIssueStore,
    pub delay: Duration,
}

#[async_trait]
impl IssueStore for SlowIssueStore {
    async fn find_by_fingerprint(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
    ) -> StoreResult<Option<Issue>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_fingerprint(project_id, fingerprint).await
    }

    async fn upsert(&self, issue: &Issue) -> StoreResult<Issue> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert(issue).await
    }

    async fn compare_and_upsert(
        &self,
        expected: Option<&Issue>,
        issue: &Issue,
    ) -> StoreResult<Option<Issue>> {
        tokio::time::sleep(self.delay).await;
        self.inner.compare_and_upsert(expected, issue).await
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<Issue>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_by_project(project_id).await
    }
}
