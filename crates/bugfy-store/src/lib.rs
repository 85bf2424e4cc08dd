//! Storage boundary for the bugfy issue ledger.
//!
//! Two stores back the ingestion pipeline: an append-only log of
//! [`ErrorEvent`]s and a ledger of [`Issue`]s keyed by
//! `(project_id, fingerprint)`. Backends are selected with cargo features:
//! `memory` (default) and `postgres`. The `config` feature adds a
//! deserialisable [`StoreConfig`] and the [`StoreProvider`] factory.

mod error;
mod traits;
mod types;

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "config")]
mod config;

#[cfg(feature = "config")]
mod provider;

pub use error::{ProviderError, StoreError, StoreResult};
pub use traits::{ErrorEventStore, IssueStore};
pub use types::{ErrorEvent, ErrorEventId, Issue, IssueId, IssueStatus, ProjectId};

#[cfg(feature = "memory")]
pub use memory::{MemoryErrorEventStore, MemoryIssueStore};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresErrorEventStore, PostgresIssueStore};

#[cfg(feature = "config")]
pub use config::StoreConfig;

#[cfg(feature = "config")]
pub use provider::StoreProvider;
