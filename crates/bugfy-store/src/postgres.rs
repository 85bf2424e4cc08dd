//! PostgreSQL adapters for the issue ledger and the error event log.
//!
//! Grouping keys are enforced by a unique constraint on
//! `issues (project_id, fingerprint)`, so every upsert is a single statement.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ErrorEventStore, IssueStore};
use crate::types::{ErrorEvent, ErrorEventId, Issue, IssueId, IssueStatus, ProjectId};

const ISSUE_COLUMNS: &str =
    "id, project_id, title, fingerprint, count, first_seen, last_seen, status";

/// Connect a pool and create the ledger tables if they don't exist.
pub async fn connect(url: &str, max_connections: u32) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            seq BIGSERIAL,
            id UUID PRIMARY KEY,
            project_id UUID NOT NULL,
            title TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            count BIGINT NOT NULL,
            first_seen TIMESTAMPTZ NOT NULL,
            last_seen TIMESTAMPTZ NOT NULL,
            status TEXT NOT NULL,
            UNIQUE (project_id, fingerprint)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS error_events (
            seq BIGSERIAL,
            id UUID PRIMARY KEY,
            project_id UUID NOT NULL,
            message TEXT NOT NULL,
            kind TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            context JSONB NOT NULL,
            timestamp TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_error_events_project_fingerprint
        ON error_events (project_id, fingerprint)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn count_to_db(count: u64) -> StoreResult<i64> {
    i64::try_from(count).map_err(|_| StoreError::Serialisation(format!("count {count} overflows")))
}

/// PostgreSQL-backed issue ledger.
#[derive(Clone)]
pub struct PostgresIssueStore {
    pool: PgPool,
}

impl PostgresIssueStore {
    /// Connect to PostgreSQL and create the required tables.
    pub async fn new(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = connect(url, max_connections).await?;
        Ok(Self { pool })
    }

    /// Use an existing pool whose schema is already in place.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_issue(row: &PgRow) -> StoreResult<Issue> {
        let id: Uuid = row.try_get("id")?;
        let project_id: Uuid = row.try_get("project_id")?;
        let count: i64 = row.try_get("count")?;
        let status: String = row.try_get("status")?;

        Ok(Issue {
            id: IssueId::new(id),
            project_id: ProjectId::new(project_id),
            title: row.try_get("title")?,
            fingerprint: row.try_get("fingerprint")?,
            count: u64::try_from(count).map_err(|_| {
                StoreError::Serialisation(format!("negative issue count {count}"))
            })?,
            first_seen: row.try_get("first_seen")?,
            last_seen: row.try_get("last_seen")?,
            status: status.parse::<IssueStatus>().map_err(StoreError::Serialisation)?,
        })
    }
}

#[async_trait]
impl IssueStore for PostgresIssueStore {
    async fn find_by_fingerprint(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
    ) -> StoreResult<Option<Issue>> {
        let query = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_id = $1 AND fingerprint = $2"
        );
        let row = sqlx::query(&query)
            .bind(project_id.as_uuid())
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_issue).transpose()
    }

    async fn upsert(&self, issue: &Issue) -> StoreResult<Issue> {
        let query = format!(
            r#"
            INSERT INTO issues ({ISSUE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (project_id, fingerprint) DO UPDATE SET
                title = EXCLUDED.title,
                count = EXCLUDED.count,
                first_seen = EXCLUDED.first_seen,
                last_seen = EXCLUDED.last_seen,
                status = EXCLUDED.status
            RETURNING {ISSUE_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(issue.id.as_uuid())
            .bind(issue.project_id.as_uuid())
            .bind(&issue.title)
            .bind(&issue.fingerprint)
            .bind(count_to_db(issue.count)?)
            .bind(issue.first_seen)
            .bind(issue.last_seen)
            .bind(issue.status.as_str())
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_issue(&row)
    }

    async fn compare_and_upsert(
        &self,
        expected: Option<&Issue>,
        issue: &Issue,
    ) -> StoreResult<Option<Issue>> {
        let row = match expected {
            None => {
                let query = format!(
                    r#"
                    INSERT INTO issues ({ISSUE_COLUMNS})
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (project_id, fingerprint) DO NOTHING
                    RETURNING {ISSUE_COLUMNS}
                    "#
                );
                sqlx::query(&query)
                    .bind(issue.id.as_uuid())
                    .bind(issue.project_id.as_uuid())
                    .bind(&issue.title)
                    .bind(&issue.fingerprint)
                    .bind(count_to_db(issue.count)?)
                    .bind(issue.first_seen)
                    .bind(issue.last_seen)
                    .bind(issue.status.as_str())
                    .fetch_optional(&self.pool)
                    .await?
            }
            Some(exp) => {
                let query = format!(
                    r#"
                    UPDATE issues SET
                        title = $3,
                        count = $4,
                        first_seen = $5,
                        last_seen = $6,
                        status = $7
                    WHERE project_id = $1 AND fingerprint = $2
                      AND title = $8
                      AND count = $9
                      AND first_seen = $10
                      AND last_seen = $11
                      AND status = $12
                    RETURNING {ISSUE_COLUMNS}
                    "#
                );
                sqlx::query(&query)
                    .bind(issue.project_id.as_uuid())
                    .bind(&issue.fingerprint)
                    .bind(&issue.title)
                    .bind(count_to_db(issue.count)?)
                    .bind(issue.first_seen)
                    .bind(issue.last_seen)
                    .bind(issue.status.as_str())
                    .bind(&exp.title)
                    .bind(count_to_db(exp.count)?)
                    .bind(exp.first_seen)
                    .bind(exp.last_seen)
                    .bind(exp.status.as_str())
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        row.as_ref().map(Self::row_to_issue).transpose()
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<Issue>> {
        let query =
            format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE project_id = $1 ORDER BY seq");
        let rows = sqlx::query(&query)
            .bind(project_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_issue).collect()
    }
}

/// PostgreSQL-backed error event log.
#[derive(Clone)]
pub struct PostgresErrorEventStore {
    pool: PgPool,
}

impl PostgresErrorEventStore {
    /// Connect to PostgreSQL and create the required tables.
    pub async fn new(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = connect(url, max_connections).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: &PgRow) -> StoreResult<ErrorEvent> {
        let id: Uuid = row.try_get("id")?;
        let project_id: Uuid = row.try_get("project_id")?;
        let context: sqlx::types::Json<BTreeMap<String, String>> = row.try_get("context")?;
        let timestamp: DateTime<Utc> = row.try_get("timestamp")?;

        Ok(ErrorEvent {
            id: ErrorEventId::new(id),
            project_id: ProjectId::new(project_id),
            message: row.try_get("message")?,
            kind: row.try_get("kind")?,
            fingerprint: row.try_get("fingerprint")?,
            context: context.0,
            timestamp,
        })
    }
}

#[async_trait]
impl ErrorEventStore for PostgresErrorEventStore {
    async fn insert(&self, event: &ErrorEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO error_events (id, project_id, message, kind, fingerprint, context, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.project_id.as_uuid())
        .bind(&event.message)
        .bind(&event.kind)
        .bind(&event.fingerprint)
        .bind(sqlx::types::Json(&event.context))
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_project(&self, project_id: &ProjectId) -> StoreResult<Vec<ErrorEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, message, kind, fingerprint, context, timestamp
            FROM error_events
            WHERE project_id = $1
            ORDER BY seq
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn list_by_fingerprint(
        &self,
        project_id: &ProjectId,
        fingerprint: &str,
    ) -> StoreResult<Vec<ErrorEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, message, kind, fingerprint, context, timestamp
            FROM error_events
            WHERE project_id = $1 AND fingerprint = $2
            ORDER BY seq
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(fingerprint)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }
}
