//! HTTP client for the incident API, used by `incident-cli`.

use crate::api::dto::{CreateIncidentRequest, HealthResponse, UpdateIncidentRequest};
use crate::api::API_PREFIX;
use crate::models::{Category, Incident, Status};
use crate::service::PaginatedResponse;
use reqwest::{Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Listing options; unset fields are left to the server defaults
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct IncidentClient {
    http: reqwest::Client,
    base_url: String,
}

impl IncidentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        decode(response).await
    }

    pub async fn list(&self, request: &ListRequest) -> ClientResult<PaginatedResponse<Incident>> {
        let response = self
            .http
            .get(self.incidents_url())
            .query(request)
            .send()
            .await?;

        decode(response).await
    }

    pub async fn get(&self, id: &str) -> ClientResult<Incident> {
        let response = self.http.get(self.incident_url(id)).send().await?;
        decode(response).await
    }

    pub async fn create(&self, request: &CreateIncidentRequest) -> ClientResult<Incident> {
        let response = self
            .http
            .post(self.incidents_url())
            .json(request)
            .send()
            .await?;

        decode(response).await
    }

    pub async fn update(&self, id: &str, request: &UpdateIncidentRequest) -> ClientResult<Incident> {
        let response = self
            .http
            .put(self.incident_url(id))
            .json(request)
            .send()
            .await?;

        decode(response).await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let response = self.http.delete(self.incident_url(id)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    fn incidents_url(&self) -> String {
        format!("{}{}/incidents", self.base_url, API_PREFIX)
    }

    fn incident_url(&self, id: &str) -> String {
        format!("{}/{}", self.incidents_url(), id)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = ensure_success(response).await?;
    Ok(response.json().await?)
}

/// Turn non-2xx responses into [`ClientError::Api`] using the server's error body
async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| fallback_message(status, text));

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

fn fallback_message(status: StatusCode, text: String) -> String {
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const INCIDENT_ID: &str = "6f1c5a0e-2b7d-4c89-9a51-3d2e8f0b7c14";

    fn incident_json() -> String {
        format!(
            r#"{{"id":"{}","title":"Broken railing","description":"Stairwell B","category":"Safety","status":"In Progress","created_at":"2026-03-01T08:00:00Z","updated_at":"2026-03-01T09:30:00Z"}}"#,
            INCIDENT_ID
        )
    }

    #[tokio::test]
    async fn test_get_incident() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/api/v1/incidents/{}", INCIDENT_ID).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(incident_json())
            .create_async()
            .await;

        let client = IncidentClient::new(server.url());
        let incident = client.get(INCIDENT_ID).await.unwrap();

        assert_eq!(incident.id.to_string(), INCIDENT_ID);
        assert_eq!(incident.status, Status::InProgress);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_sends_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/incidents")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("category".into(), "Safety".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"data":[{}],"total":11,"page":2,"page_size":10,"total_pages":2}}"#,
                incident_json()
            ))
            .create_async()
            .await;

        let client = IncidentClient::new(format!("{}/", server.url()));
        let page = client
            .list(&ListRequest {
                category: Some(Category::Safety),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 11);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", format!("/api/v1/incidents/{}", INCIDENT_ID).as_str())
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Incident not found","code":"NOT_FOUND","status":404}"#)
            .create_async()
            .await;

        let client = IncidentClient::new(server.url());
        let err = client.delete(INCIDENT_ID).await.unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Incident not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/incidents")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "title": "Broken railing",
                "category": "Safety",
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(incident_json())
            .create_async()
            .await;

        let client = IncidentClient::new(server.url());
        let incident = client
            .create(&CreateIncidentRequest {
                title: "Broken railing".to_string(),
                description: "Stairwell B".to_string(),
                category: Category::Safety,
                status: None,
            })
            .await
            .unwrap();

        assert_eq!(incident.title, "Broken railing");
        mock.assert_async().await;
    }
}
