use crate::models::{Category, IncidentUpdate, NewIncident, Status};
use crate::service::ListParams;
use crate::state::{IncidentFilter, Sort};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateIncidentRequest {
    #[validate(length(min = 3, message = "title must be at least 3 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub category: Category,
    /// Omitted, null and empty all mean "Open"
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<Status>,
}

impl From<CreateIncidentRequest> for NewIncident {
    fn from(request: CreateIncidentRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            category: request.category,
            status: request.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateIncidentRequest {
    #[validate(length(min = 3, message = "title must be at least 3 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub category: Category,
    pub status: Status,
}

impl From<UpdateIncidentRequest> for IncidentUpdate {
    fn from(request: UpdateIncidentRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            category: request.category,
            status: request.status,
        }
    }
}

/// Query string of `GET /incidents`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListIncidentsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<Status>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 5, max = 100, message = "page_size must be between 5 and 100"))]
    pub page_size: Option<u32>,
}

impl ListIncidentsQuery {
    pub fn into_params(self) -> ListParams {
        ListParams {
            filter: IncidentFilter {
                category: self.category,
                status: self.status,
                search: self.search,
            },
            sort: Sort::parse(self.sort_by.as_deref(), self.sort_order.as_deref()),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Deserialize an optional enum where a blank string counts as absent
fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid value '{}': {}", value, e))),
    }
}
