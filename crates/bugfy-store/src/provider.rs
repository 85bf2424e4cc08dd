use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::ProviderError;
use crate::traits::{ErrorEventStore, IssueStore};

#[cfg(feature = "memory")]
use crate::memory::{MemoryErrorEventStore, MemoryIssueStore};

#[cfg(feature = "postgres")]
use crate::postgres::{PostgresErrorEventStore, PostgresIssueStore};

/// Issue ledger and event log built from the same backend.
#[derive(Clone)]
pub struct StoreProvider {
    issues: Arc<dyn IssueStore>,
    events: Arc<dyn ErrorEventStore>,
}

impl StoreProvider {
    pub fn new(issues: Arc<dyn IssueStore>, events: Arc<dyn ErrorEventStore>) -> Self {
        Self { issues, events }
    }

    pub async fn from_config(config: &StoreConfig) -> Result<Self, ProviderError> {
        match config {
            #[cfg(feature = "memory")]
            StoreConfig::Memory => Ok(Self::new(
                Arc::new(MemoryIssueStore::new()),
                Arc::new(MemoryErrorEventStore::new()),
            )),

            #[cfg(feature = "postgres")]
            StoreConfig::Postgres {
                url,
                max_connections,
            } => {
                let pool = crate::postgres::connect(url, *max_connections)
                    .await
                    .map_err(|e| ProviderError::Connection(e.to_string()))?;
                tracing::info!(max_connections, "PostgreSQL issue store connected");
                Ok(Self::new(
                    Arc::new(PostgresIssueStore::from_pool(pool.clone())),
                    Arc::new(PostgresErrorEventStore::from_pool(pool)),
                ))
            }

            #[allow(unreachable_patterns)]
            _ => Err(ProviderError::UnsupportedBackend(
                "No suitable store backend enabled".to_string(),
            )),
        }
    }

    pub fn issues(&self) -> Arc<dyn IssueStore> {
        self.issues.clone()
    }

    pub fn events(&self) -> Arc<dyn ErrorEventStore> {
        self.events.clone()
    }
}

impl std::fmt::Debug for StoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreProvider").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn provider_from_memory_config() {
        let provider = StoreProvider::from_config(&StoreConfig::Memory)
            .await
            .unwrap();

        let project = crate::types::ProjectId::generate();
        assert!(provider
            .issues()
            .list_by_project(&project)
            .await
            .unwrap()
            .is_empty());
        assert!(provider
            .events()
            .list_by_project(&project)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn memory_is_default_backend() {
        assert_eq!(StoreConfig::default(), StoreConfig::Memory);
    }
}
