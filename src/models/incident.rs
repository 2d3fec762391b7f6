use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// A reported incident
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    /// Unique identifier
    pub id: Uuid,

    /// Short human-readable title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// What kind of incident this is
    pub category: Category,

    /// Progress of the incident
    pub status: Status,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Create a new incident with a fresh id
    pub fn new(title: String, description: String, category: Category, status: Status) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            title,
            description,
            category,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every mutable field and bump `updated_at`
    pub fn apply_update(&mut self, update: IncidentUpdate) {
        self.title = update.title;
        self.description = update.description;
        self.category = update.category;
        self.status = update.status;
        self.touch();
    }

    /// Advance `updated_at`, never moving it before `created_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }

    /// Check whether the search term occurs in the title or description,
    /// ignoring case
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
    }
}

/// Validated input for creating an incident
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub category: Category,
    /// Falls back to [`Status::Open`] when absent
    pub status: Option<Status>,
}

impl From<NewIncident> for Incident {
    fn from(input: NewIncident) -> Self {
        Incident::new(
            input.title,
            input.description,
            input.category,
            input.status.unwrap_or_default(),
        )
    }
}

/// Validated input for a full overwrite of an incident
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentUpdate {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display, AsRefStr,
)]
pub enum Category {
    Safety,
    Maintenance,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    AsRefStr,
)]
pub enum Status {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    Success,
}
