//! Business rules between the HTTP handlers and the incident store.
//!
//! The service fills in pagination defaults, turns a missing record into
//! [`AppError::NotFound`], and assigns identifiers and timestamps on
//! creation. Everything else is delegated to the [`IncidentStore`].

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Incident, IncidentUpdate, NewIncident};
use crate::state::{IncidentFilter, IncidentQuery, IncidentStore, Sort};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Listing parameters as supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub filter: IncidentFilter,
    pub sort: Sort,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// One page of results plus the numbers needed to render a pager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

#[async_trait]
pub trait IncidentService: Send + Sync {
    async fn list_incidents(&self, params: ListParams) -> Result<PaginatedResponse<Incident>>;

    async fn get_incident(&self, id: &Uuid) -> Result<Incident>;

    async fn create_incident(&self, input: NewIncident) -> Result<Incident>;

    async fn update_incident(&self, id: &Uuid, input: IncidentUpdate) -> Result<Incident>;

    async fn delete_incident(&self, id: &Uuid) -> Result<()>;
}

/// Default [`IncidentService`] over any [`IncidentStore`]
pub struct IncidentManager {
    store: Arc<dyn IncidentStore>,
}

impl IncidentManager {
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        Self { store }
    }

    async fn require(&self, id: &Uuid) -> Result<Incident> {
        timed("find_by_id", self.store.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {}", id)))
    }
}

#[async_trait]
impl IncidentService for IncidentManager {
    async fn list_incidents(&self, params: ListParams) -> Result<PaginatedResponse<Incident>> {
        let page = params.page.filter(|&p| p > 0).unwrap_or(DEFAULT_PAGE);
        let page_size = params
            .page_size
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let query = IncidentQuery {
            filter: params.filter,
            sort: params.sort,
            page,
            page_size,
        };

        let (data, total) = timed("find_all", self.store.find_all(&query)).await?;

        tracing::debug!(
            total,
            page,
            page_size,
            returned = data.len(),
            "Listed incidents"
        );

        Ok(PaginatedResponse {
            data,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(u64::from(page_size)),
        })
    }

    async fn get_incident(&self, id: &Uuid) -> Result<Incident> {
        self.require(id).await
    }

    async fn create_incident(&self, input: NewIncident) -> Result<Incident> {
        let incident = Incident::from(input);

        timed("create", self.store.create(&incident)).await?;

        metrics::INCIDENTS_CREATED_TOTAL
            .with_label_values(&[incident.category.as_ref()])
            .inc();

        tracing::info!(
            incident_id = %incident.id,
            category = %incident.category,
            status = %incident.status,
            "Incident created"
        );

        Ok(incident)
    }

    async fn update_incident(&self, id: &Uuid, input: IncidentUpdate) -> Result<Incident> {
        let mut incident = self.require(id).await?;
        incident.apply_update(input);

        timed("update", self.store.update(&incident)).await?;

        tracing::info!(
            incident_id = %incident.id,
            status = %incident.status,
            "Incident updated"
        );

        Ok(incident)
    }

    async fn delete_incident(&self, id: &Uuid) -> Result<()> {
        self.require(id).await?;

        timed("delete", self.store.delete(id)).await?;

        tracing::info!(incident_id = %id, "Incident deleted");
        Ok(())
    }
}

/// Run a store call and record its outcome and latency
async fn timed<T>(operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
    let start = Instant::now();
    let result = call.await;
    metrics::record_storage_operation(operation, result.is_ok(), start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Status};
    use crate::state::InMemoryStore;

    fn manager() -> IncidentManager {
        IncidentManager::new(Arc::new(InMemoryStore::new()))
    }

    fn new_incident(title: &str) -> NewIncident {
        NewIncident {
            title: title.to_string(),
            description: "Reported by the night shift".to_string(),
            category: Category::Safety,
            status: None,
        }
    }

    /// Store whose every call fails, for error propagation checks
    struct BrokenStore;

    #[async_trait]
    impl IncidentStore for BrokenStore {
        async fn find_all(&self, _query: &IncidentQuery) -> Result<(Vec<Incident>, u64)> {
            Err(AppError::Database("connection refused".to_string()))
        }

        async fn find_by_id(&self, _id: &Uuid) -> Result<Option<Incident>> {
            Err(AppError::Database("connection refused".to_string()))
        }

        async fn create(&self, _incident: &Incident) -> Result<()> {
            Err(AppError::Database("connection refused".to_string()))
        }

        async fn update(&self, _incident: &Incident) -> Result<()> {
            Err(AppError::Database("connection refused".to_string()))
        }

        async fn delete(&self, _id: &Uuid) -> Result<()> {
            Err(AppError::Database("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_list_applies_defaults() {
        let service = manager();
        for i in 0..12 {
            service
                .create_incident(new_incident(&format!("Incident {}", i)))
                .await
                .unwrap();
        }

        let page = service.list_incidents(ListParams::default()).await.unwrap();

        assert_eq!(page.page, DEFAULT_PAGE);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 10);
    }

    #[tokio::test]
    async fn test_total_pages_of_empty_listing() {
        let page = manager()
            .list_incidents(ListParams::default())
            .await
            .unwrap();

        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.data.is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_default_status() {
        let service = manager();

        let first = service.create_incident(new_incident("Spill")).await.unwrap();
        let second = service.create_incident(new_incident("Spill")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, Status::Open);
        assert_eq!(service.get_incident(&first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let service = manager();
        let id = Uuid::new_v4();

        assert!(matches!(
            service.get_incident(&id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_incident(&id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update_incident(
                    &id,
                    IncidentUpdate {
                        title: "Nope".to_string(),
                        description: "Nope".to_string(),
                        category: Category::Maintenance,
                        status: Status::Success,
                    }
                )
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let service = manager();
        let created = service.create_incident(new_incident("Spill")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let updated = service
            .update_incident(
                &created.id,
                IncidentUpdate {
                    title: "Spill cleaned".to_string(),
                    description: "Mopped and signposted".to_string(),
                    category: Category::Maintenance,
                    status: Status::Success,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.category, Category::Maintenance);
        assert_eq!(service.get_incident(&created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let service = IncidentManager::new(Arc::new(BrokenStore));

        assert!(matches!(
            service.list_incidents(ListParams::default()).await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            service.get_incident(&Uuid::new_v4()).await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(
            service.create_incident(new_incident("Spill")).await,
            Err(AppError::Database(_))
        ));
    }
}
