use crate::config::{StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{IncidentStore, InMemoryStore, SqlStore};
use std::sync::Arc;

/// Create an incident store based on configuration
pub async fn create_store(config: &StateConfig) -> Result<Arc<dyn IncidentStore>> {
    match config.backend {
        StateBackend::Sqlite => {
            if config.database_url.trim().is_empty() {
                return Err(AppError::Configuration(
                    "SQLite backend requires 'database_url' configuration".to_string(),
                ));
            }

            tracing::info!(url = %config.database_url, "Initializing SQLite storage backend");

            let store = SqlStore::connect(&config.database_url, config.pool_size).await?;
            Ok(Arc::new(store))
        }

        StateBackend::Memory => Ok(create_in_memory_store()),
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn IncidentStore> {
    tracing::info!("Initializing in-memory storage backend");
    Arc::new(InMemoryStore::new())
}
