//! Bugfy error ingestion.
//!
//! Turns a stream of error reports into a deduplicated ledger of issues:
//!
//! ```text
//! CreateErrorRequest ──▶ IngestService ──▶ ErrorEventStore (append)
//!                              │
//!                              ▼
//!                       GroupingEngine ──▶ IssueStore (compare-and-upsert)
//! ```
//!
//! - **Fingerprinting**: SHA-256 of the raw message, first 16 hex characters
//! - **Grouping**: one issue per `(project_id, fingerprint)`, with occurrence
//!   count and first/last seen timestamps
//! - **Orchestration**: validation, a per-call deadline, and error
//!   classification for the transport layer
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use bugfy_ingest::{config::PipelineConfig, CreateErrorRequest, IngestService};
//! use bugfy_store::{MemoryErrorEventStore, MemoryIssueStore};
//!
//! let service = IngestService::new(
//!     Arc::new(MemoryErrorEventStore::new()),
//!     Arc::new(MemoryIssueStore::new()),
//!     PipelineConfig::default(),
//! );
//!
//! let event = service
//!     .create_error(CreateErrorRequest::new(project_id, "NullPointerException at line 42"))
//!     .await?;
//! let issues = service.list_issues(&event.project_id).await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod grouping;
pub mod service;
pub mod types;

pub use config::IngestConfig;
pub use error::{IngestError, IngestResult};
pub use fingerprint::{compute_fingerprint, is_fingerprint, FINGERPRINT_LEN};
pub use grouping::GroupingEngine;
pub use service::IngestService;
pub use types::{CreateErrorRequest, CreateErrorResponse, IssueSummary};
