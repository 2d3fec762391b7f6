pub mod factory;
pub mod sql_store;
pub mod store;

pub use factory::{create_in_memory_store, create_store};
pub use sql_store::SqlStore;
pub use store::*;

use crate::error::Result;
use crate::models::{Category, Incident, Status};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Trait for incident storage operations
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// List incidents matching the query, returning one page and the total
    /// number of matches before pagination
    async fn find_all(&self, query: &IncidentQuery) -> Result<(Vec<Incident>, u64)>;

    /// Get an incident by ID, `None` when there is no such record
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Incident>>;

    /// Insert a new incident
    async fn create(&self, incident: &Incident) -> Result<()>;

    /// Overwrite the mutable fields of an existing incident
    async fn update(&self, incident: &Incident) -> Result<()>;

    /// Hard-delete an incident
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Release any held resources
    async fn close(&self) {}
}

/// Filter, sort and page parameters for [`IncidentStore::find_all`]
#[derive(Debug, Clone, Default)]
pub struct IncidentQuery {
    pub filter: IncidentFilter,
    pub sort: Sort,
    /// 1-based page number; pagination applies only when both this and
    /// `page_size` are positive
    pub page: u32,
    pub page_size: u32,
}

impl IncidentQuery {
    /// Rows to skip and take, if pagination applies
    pub fn limit_offset(&self) -> Option<(u64, u64)> {
        if self.page > 0 && self.page_size > 0 {
            let limit = u64::from(self.page_size);
            Some((limit, u64::from(self.page - 1) * limit))
        } else {
            None
        }
    }
}

/// Filter for querying incidents
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub category: Option<Category>,
    pub status: Option<Status>,
    /// Case-insensitive substring matched against title or description
    pub search: Option<String>,
}

impl IncidentFilter {
    /// The search term, ignoring blank input
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        let category_match = self.category.map_or(true, |c| incident.category == c);
        let status_match = self.status.map_or(true, |s| incident.status == s);
        let search_match = self
            .search_term()
            .map_or(true, |term| incident.matches_search(term));

        category_match && status_match && search_match
    }
}

/// Column an incident listing is ordered by
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Ordering of a listing, `created_at desc` unless told otherwise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    /// Build from raw query values; anything unrecognized falls back to the
    /// default for that half
    pub fn parse(field: Option<&str>, order: Option<&str>) -> Self {
        Self {
            field: field
                .and_then(|f| SortField::from_str(f).ok())
                .unwrap_or_default(),
            order: order
                .and_then(|o| SortOrder::from_str(o).ok())
                .unwrap_or_default(),
        }
    }

    pub fn compare(&self, a: &Incident, b: &Incident) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
        };

        let ordering = match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };

        // Ascending id breaks ties so pages never overlap
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse_defaults() {
        assert_eq!(Sort::parse(None, None), Sort::default());
        assert_eq!(
            Sort::parse(Some("title"), Some("asc")),
            Sort {
                field: SortField::Title,
                order: SortOrder::Asc
            }
        );

        let sort = Sort::parse(Some("severity; DROP TABLE incidents"), Some("sideways"));
        assert_eq!(sort.field, SortField::CreatedAt);
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn test_limit_offset() {
        let query = IncidentQuery {
            page: 3,
            page_size: 10,
            ..Default::default()
        };
        assert_eq!(query.limit_offset(), Some((10, 20)));

        let unpaged = IncidentQuery {
            page: 0,
            page_size: 10,
            ..Default::default()
        };
        assert_eq!(unpaged.limit_offset(), None);
    }

    #[test]
    fn test_compare_breaks_ties_by_id() {
        let first = Incident::new(
            "Same title".to_string(),
            "One".to_string(),
            Category::Safety,
            Status::Open,
        );
        let mut second = first.clone();
        second.id = Uuid::new_v4();

        let (low, high) = if first.id < second.id {
            (&first, &second)
        } else {
            (&second, &first)
        };

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let sort = Sort {
                field: SortField::Title,
                order,
            };
            assert_eq!(sort.compare(low, high), Ordering::Less);
            assert_eq!(sort.compare(high, low), Ordering::Greater);
        }
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = IncidentFilter {
            search: Some(String::new()),
            ..Default::default()
        };
        assert!(filter.search_term().is_none());
    }
}
