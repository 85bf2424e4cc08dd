use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{ErrorEvent, Issue, ProjectId};

/// Durable ledger of issues, unique per `(project_id, fingerprint)`.
///
/// Every write must be a single atomic operation in the backend. Grouping
/// correctness under concurrent ingestion depends on
/// [`compare_and_upsert`](IssueStore::compare_and_upsert) never applying
/// against a document that changed after it was read.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Look up the issue for a grouping key.
    ///
    /// Returns `None` when no issue exists yet.
    async fn find_by_fingerprint(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
    ) -> StoreResult<Option<Issue>>;

    /// Replace the issue stored under the same grouping key, or insert it.
    ///
    /// The stored `id` is kept when a document already exists. Returns the
    /// document as written.
    async fn upsert(&self, issue: &Issue) -> StoreResult<Issue>;

    /// Conditionally write `issue`.
    ///
    /// With `expected = None` the write only happens if no issue exists for
    /// the key. Otherwise it only happens if the stored document still has
    /// the same revision as `expected` (see [`Issue::same_revision`]).
    /// Returns `None` when the condition did not hold.
    async fn compare_and_upsert(
        &self,
        expected: Option<&Issue>,
        issue: &Issue,
    ) -> StoreResult<Option<Issue>>;

    /// All issues of a project, in insertion order.
    async fn list_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<Issue>>;
}

/// Append-only log of reported error events.
#[async_trait]
pub trait ErrorEventStore: Send + Sync {
    /// Store a new event.
    ///
    /// Returns [`StoreError::Conflict`](crate::StoreError::Conflict) if an
    /// event with the same ID already exists.
    async fn insert(&self, event: &ErrorEvent) -> StoreResult<()>;

    /// All events of a project, in insertion order.
    async fn list_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<ErrorEvent>>;

    /// Events of a project sharing a fingerprint, in insertion order.
    async fn list_by_fingerprint(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
    ) -> StoreResult<Vec<ErrorEvent>>;
}
