use crate::error::{AppError, Result};
use crate::models::Incident;
use crate::state::{IncidentQuery, IncidentStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory incident store (for development and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    incidents: Arc<DashMap<Uuid, Incident>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            incidents: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for InMemoryStore {
    async fn find_all(&self, query: &IncidentQuery) -> Result<(Vec<Incident>, u64)> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        let total = incidents.len() as u64;

        incidents.sort_by(|a, b| query.sort.compare(a, b));

        let page = match query.limit_offset() {
            Some((limit, offset)) => incidents
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            None => incidents,
        };

        Ok((page, total))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Incident>> {
        Ok(self.incidents.get(id).map(|entry| entry.clone()))
    }

    async fn create(&self, incident: &Incident) -> Result<()> {
        if self.incidents.contains_key(&incident.id) {
            return Err(AppError::Database(format!(
                "Incident {} already exists",
                incident.id
            )));
        }

        self.incidents.insert(incident.id, incident.clone());
        tracing::debug!(incident_id = %incident.id, "Incident saved");
        Ok(())
    }

    async fn update(&self, incident: &Incident) -> Result<()> {
        match self.incidents.get_mut(&incident.id) {
            Some(mut entry) => {
                let stored = entry.value_mut();
                stored.title = incident.title.clone();
                stored.description = incident.description.clone();
                stored.category = incident.category;
                stored.status = incident.status;
                stored.updated_at = incident.updated_at;
                tracing::debug!(incident_id = %incident.id, "Incident updated");
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Incident {}", incident.id))),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        if self.incidents.remove(id).is_some() {
            tracing::debug!(incident_id = %id, "Incident deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Incident {}", id)))
        }
    }
}
