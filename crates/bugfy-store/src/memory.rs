//! In-memory stores for tests and single-process deployments.
//!
//! Data is lost when the process exits.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ErrorEventStore, IssueStore};
use crate::types::{ErrorEvent, ErrorEventId, Issue, ProjectId};

type IssueKey = (ProjectId, String);

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_owned())
}

#[derive(Debug, Default)]
struct IssueTable {
    rows: Vec<Issue>,
    index: HashMap<IssueKey, usize>,
}

impl IssueTable {
    fn get(&self, key: &IssueKey) -> Option<&Issue> {
        self.index.get(key).map(|&slot| &self.rows[slot])
    }

    /// Write `issue` under its key, keeping the stored ID if one exists.
    fn put(&mut self, issue: &Issue) -> Issue {
        let key = (issue.project_id, issue.fingerprint.clone());
        match self.index.get(&key) {
            Some(&slot) => {
                let stored = Issue {
                    id: self.rows[slot].id,
                    ..issue.clone()
                };
                self.rows[slot] = stored.clone();
                stored
            }
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(issue.clone());
                issue.clone()
            }
        }
    }
}

/// Issue ledger held in process memory.
///
/// A single write lock covers the read and the write of each upsert, which
/// makes both upsert flavours atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryIssueStore {
    table: Arc<RwLock<IssueTable>>,
}

impl MemoryIssueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn find_by_fingerprint(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
    ) -> StoreResult<Option<Issue>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.get(&(*project_id, fingerprint.to_owned())).cloned())
    }

    async fn upsert(&self, issue: &Issue) -> StoreResult<Issue> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        Ok(table.put(issue))
    }

    async fn compare_and_upsert(
        &self,
        expected: Option<&Issue>,
        issue: &Issue,
    ) -> StoreResult<Option<Issue>> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        let current = table.get(&(issue.project_id, issue.fingerprint.clone()));

        let matches = match (expected, current) {
            (None, None) => true,
            (Some(exp), Some(cur)) => exp.same_revision(cur),
            _ => false,
        };

        if matches {
            Ok(Some(table.put(issue)))
        } else {
            Ok(None)
        }
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<Issue>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table
            .rows
            .iter()
            .filter(|issue| issue.project_id == *project_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct EventLog {
    events: Vec<ErrorEvent>,
    ids: HashSet<ErrorEventId>,
}

/// Append-only error event log held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryErrorEventStore {
    log: Arc<RwLock<EventLog>>,
}

impl MemoryErrorEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events across all projects.
    pub fn len(&self) -> StoreResult<usize> {
        let log = self.log.read().map_err(|_| poisoned())?;
        Ok(log.events.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }
}

#[async_trait]
impl ErrorEventStore for MemoryErrorEventStore {
    async fn insert(&self, event: &ErrorEvent) -> StoreResult<()> {
        let mut log = self.log.write().map_err(|_| poisoned())?;

        if !log.ids.insert(event.id) {
            return Err(StoreError::Conflict(format!(
                "error event {} already exists",
                event.id
            )));
        }

        log.events.push(event.clone());
        Ok(())
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<ErrorEvent>> {
        let log = self.log.read().map_err(|_| poisoned())?;
        Ok(log
            .events
            .iter()
            .filter(|e| e.project_id == *project_id)
            .cloned()
            .collect())
    }

    async fn list_by_fingerprint(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
    ) -> StoreResult<Vec<ErrorEvent>> {
        let log = self.log.read().map_err(|_| poisoned())?;
        Ok(log
            .events
            .iter()
            .filter(|e| e.project_id == *project_id && e.fingerprint == fingerprint)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::types::{IssueId, IssueStatus};

    fn test_event(project_id: ProjectId, fingerprint: &str) -> ErrorEvent {
        ErrorEvent {
            id: ErrorEventId::generate(),
            project_id,
            message: format!("failure {fingerprint}"),
            kind: "error".to_owned(),
            fingerprint: fingerprint.to_owned(),
            context: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn find_missing_issue_returns_none() {
        let store = MemoryIssueStore::new();

        let found = store
            .find_by_fingerprint(&ProjectId::generate(), "0000000000000000")
            .await
            .expect("find failed");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_inserts_then_replaces_keeping_id() {
        let store = MemoryIssueStore::new();
        let issue = Issue::open(&test_event(ProjectId::generate(), "aaaaaaaaaaaaaaaa"));

        let written = store.upsert(&issue).await.expect("insert failed");
        assert_eq!(written, issue);

        let mut replacement = issue.with_occurrence(Utc::now());
        replacement.id = IssueId::generate();
        let written = store.upsert(&replacement).await.expect("replace failed");

        assert_eq!(written.id, issue.id);
        assert_eq!(written.count, 2);

        let stored = store
            .find_by_fingerprint(&issue.project_id, &issue.fingerprint)
            .await
            .expect("find failed")
            .expect("issue missing");
        assert_eq!(stored, written);
    }

    #[tokio::test]
    async fn compare_and_upsert_insert_only_when_absent() {
        let store = MemoryIssueStore::new();
        let issue = Issue::open(&test_event(ProjectId::generate(), "bbbbbbbbbbbbbbbb"));

        assert!(store
            .compare_and_upsert(None, &issue)
            .await
            .expect("cas failed")
            .is_some());
        assert!(store
            .compare_and_upsert(None, &issue)
            .await
            .expect("cas failed")
            .is_none());
    }

    #[tokio::test]
    async fn compare_and_upsert_rejects_stale_expectation() {
        let store = MemoryIssueStore::new();
        let issue = Issue::open(&test_event(ProjectId::generate(), "cccccccccccccccc"));
        store.upsert(&issue).await.expect("insert failed");

        let first = issue.with_occurrence(Utc::now());
        assert!(store
            .compare_and_upsert(Some(&issue), &first)
            .await
            .expect("cas failed")
            .is_some());

        // `issue` is now stale: count moved from 1 to 2.
        let lost = issue.with_occurrence(Utc::now());
        assert!(store
            .compare_and_upsert(Some(&issue), &lost)
            .await
            .expect("cas failed")
            .is_none());

        let stored = store
            .find_by_fingerprint(&issue.project_id, &issue.fingerprint)
            .await
            .expect("find failed")
            .expect("issue missing");
        assert_eq!(stored.count, 2);
    }

    #[tokio::test]
    async fn issues_keyed_by_project_and_fingerprint() {
        let store = MemoryIssueStore::new();
        let project_a = ProjectId::generate();
        let project_b = ProjectId::generate();

        store
            .upsert(&Issue::open(&test_event(project_a, "dddddddddddddddd")))
            .await
            .expect("upsert failed");
        store
            .upsert(&Issue::open(&test_event(project_b, "dddddddddddddddd")))
            .await
            .expect("upsert failed");
        store
            .upsert(&Issue::open(&test_event(project_a, "eeeeeeeeeeeeeeee")))
            .await
            .expect("upsert failed");

        let a = store.list_by_project(&project_a).await.expect("list failed");
        let b = store.list_by_project(&project_b).await.expect("list failed");

        assert_eq!(a.len(), 2);
        assert_eq!(a[0].fingerprint, "dddddddddddddddd");
        assert_eq!(a[1].fingerprint, "eeeeeeeeeeeeeeee");
        assert_eq!(b.len(), 1);
    }

    #[tokio::test]
    async fn status_change_is_a_new_revision() {
        let store = MemoryIssueStore::new();
        let issue = Issue::open(&test_event(ProjectId::generate(), "ffffffffffffffff"));
        store.upsert(&issue).await.expect("insert failed");

        let resolved = issue.with_status(IssueStatus::Resolved);
        store
            .compare_and_upsert(Some(&issue), &resolved)
            .await
            .expect("cas failed")
            .expect("condition should hold");

        assert!(store
            .compare_and_upsert(Some(&issue), &issue.with_occurrence(Utc::now()))
            .await
            .expect("cas failed")
            .is_none());
    }

    #[tokio::test]
    async fn event_insert_is_create_only() {
        let store = MemoryErrorEventStore::new();
        let event = test_event(ProjectId::generate(), "0123456789abcdef");

        store.insert(&event).await.expect("insert failed");
        let err = store.insert(&event).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn events_listed_by_project_and_fingerprint() {
        let store = MemoryErrorEventStore::new();
        let project = ProjectId::generate();
        let other = ProjectId::generate();

        let first = test_event(project, "1111111111111111");
        let second = test_event(project, "2222222222222222");
        let third = test_event(project, "1111111111111111");
        let foreign = test_event(other, "1111111111111111");

        for event in [&first, &second, &third, &foreign] {
            store.insert(event).await.expect("insert failed");
        }

        let all = store.list_by_project(&project).await.expect("list failed");
        assert_eq!(all, vec![first.clone(), second, third.clone()]);

        let grouped = store
            .list_by_fingerprint(&project, "1111111111111111")
            .await
            .expect("list failed");
        assert_eq!(grouped, vec![first, third]);
    }
}
