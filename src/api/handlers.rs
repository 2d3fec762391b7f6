use crate::api::dto::{
    CreateIncidentRequest, HealthResponse, ListIncidentsQuery, UpdateIncidentRequest,
};
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::Incident;
use crate::service::PaginatedResponse;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus scrape endpoint
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Route".to_string())
}

/// List incidents
pub async fn list_incidents(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListIncidentsQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<Incident>>> {
    let Query(query) = query?;
    query.validate()?;

    let page = state.service.list_incidents(query.into_params()).await?;

    Ok(Json(page))
}

/// Get incident by ID
pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Incident>> {
    let id = parse_incident_id(&id)?;
    let incident = state.service.get_incident(&id).await?;

    Ok(Json(incident))
}

/// Create a new incident
pub async fn create_incident(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateIncidentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Incident>)> {
    let Json(request) = payload?;
    request.validate()?;

    let incident = state
        .service
        .create_incident(request.into())
        .await
        .map_err(AppError::into_creation_failure)?;

    Ok((StatusCode::CREATED, Json(incident)))
}

/// Replace the mutable fields of an incident
pub async fn update_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateIncidentRequest>, JsonRejection>,
) -> Result<Json<Incident>> {
    let id = parse_incident_id(&id)?;
    let Json(request) = payload?;
    request.validate()?;

    let incident = state.service.update_incident(&id, request.into()).await?;

    Ok(Json(incident))
}

pub async fn delete_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_incident_id(&id)?;
    state.service.delete_incident(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// A malformed id can never name a stored incident
fn parse_incident_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Incident {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_incident_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_incident_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_incident_id("not-a-uuid"),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check() {
        let Json(health) = health_check().await;
        assert_eq!(health.status, "ok");
    }
}
