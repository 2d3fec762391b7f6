use crate::error::{AppError, Result};
use crate::models::Incident;
use crate::state::{IncidentFilter, IncidentQuery, IncidentStore, SortOrder};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, category, status, created_at, updated_at FROM incidents";

/// Relational incident store backed by SQLite
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Open a pool against `database_url` and make sure the schema exists
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to an in-memory database sees its own copy, so the
        // pool must hold exactly one connection and never recycle it.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(pool_size.max(1))
        };

        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::info!(in_memory, "SQL store opened");
        Ok(store)
    }

    /// Create the incidents table and its indexes if they are missing
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS incidents (
                id          TEXT PRIMARY KEY NOT NULL,
                title       TEXT NOT NULL,
                description TEXT NOT NULL,
                category    VARCHAR(20) NOT NULL,
                status      VARCHAR(20) NOT NULL DEFAULT 'Open',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                title_lower       TEXT NOT NULL DEFAULT '',
                description_lower TEXT NOT NULL DEFAULT ''
            )",
        )
        .execute(&self.pool)
        .await?;

        self.add_search_columns().await?;

        for (name, column) in [
            ("idx_incidents_category", "category"),
            ("idx_incidents_status", "status"),
            ("idx_incidents_created_at", "created_at"),
        ] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON incidents ({})",
                name, column
            ))
            .execute(&self.pool)
            .await?;
        }

        tracing::debug!("Incident schema ready");
        Ok(())
    }

    /// Bring tables created before the folded search columns existed up to
    /// date. SQLite's `LOWER` only folds ASCII, so the folded text is
    /// computed here instead.
    async fn add_search_columns(&self) -> Result<()> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('incidents')")
                .fetch_all(&self.pool)
                .await?;

        if columns.iter().any(|c| c == "title_lower") {
            return Ok(());
        }

        for column in ["title_lower", "description_lower"] {
            sqlx::query(&format!(
                "ALTER TABLE incidents ADD COLUMN {} TEXT NOT NULL DEFAULT ''",
                column
            ))
            .execute(&self.pool)
            .await?;
        }

        let rows = sqlx::query("SELECT id, title, description FROM incidents")
            .fetch_all(&self.pool)
            .await?;

        for row in &rows {
            let id: String = row.try_get("id")?;
            let title: String = row.try_get("title")?;
            let description: String = row.try_get("description")?;

            sqlx::query("UPDATE incidents SET title_lower = ?, description_lower = ? WHERE id = ?")
                .bind(title.to_lowercase())
                .bind(description.to_lowercase())
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        tracing::info!(backfilled = rows.len(), "Added folded search columns");
        Ok(())
    }
}

#[async_trait]
impl IncidentStore for SqlStore {
    async fn find_all(&self, query: &IncidentQuery) -> Result<(Vec<Incident>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM incidents");
        push_filter(&mut count, &query.filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        push_filter(&mut select, &query.filter);

        // Column and direction come from closed enums, never from raw input
        select
            .push(" ORDER BY ")
            .push(query.sort.field.as_ref())
            .push(match query.sort.order {
                SortOrder::Asc => " ASC",
                SortOrder::Desc => " DESC",
            })
            .push(", id ASC");

        if let Some((limit, offset)) = query.limit_offset() {
            select
                .push(" LIMIT ")
                .push_bind(limit as i64)
                .push(" OFFSET ")
                .push_bind(offset as i64);
        }

        let rows = select.build().fetch_all(&self.pool).await?;
        let incidents = rows
            .iter()
            .map(incident_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok((incidents, total.max(0) as u64))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Incident>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(incident_from_row).transpose()
    }

    async fn create(&self, incident: &Incident) -> Result<()> {
        sqlx::query(
            "INSERT INTO incidents
                (id, title, description, category, status, created_at, updated_at,
                 title_lower, description_lower)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(incident.id.to_string())
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.category.as_ref())
        .bind(incident.status.as_ref())
        .bind(encode_timestamp(&incident.created_at))
        .bind(encode_timestamp(&incident.updated_at))
        .bind(incident.title.to_lowercase())
        .bind(incident.description.to_lowercase())
        .execute(&self.pool)
        .await?;

        tracing::debug!(incident_id = %incident.id, "Incident saved");
        Ok(())
    }

    async fn update(&self, incident: &Incident) -> Result<()> {
        let result = sqlx::query(
            "UPDATE incidents
             SET title = ?, description = ?, category = ?, status = ?, updated_at = ?,
                 title_lower = ?, description_lower = ?
             WHERE id = ?",
        )
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.category.as_ref())
        .bind(incident.status.as_ref())
        .bind(encode_timestamp(&incident.updated_at))
        .bind(incident.title.to_lowercase())
        .bind(incident.description.to_lowercase())
        .bind(incident.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Incident {}", incident.id)));
        }

        tracing::debug!(incident_id = %incident.id, "Incident updated");
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Incident {}", id)));
        }

        tracing::debug!(incident_id = %id, "Incident deleted");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQL store closed");
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &IncidentFilter) {
    let mut keyword = " WHERE ";

    if let Some(category) = filter.category {
        builder
            .push(keyword)
            .push("category = ")
            .push_bind(category.as_ref().to_string());
        keyword = " AND ";
    }

    if let Some(status) = filter.status {
        builder
            .push(keyword)
            .push("status = ")
            .push_bind(status.as_ref().to_string());
        keyword = " AND ";
    }

    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        builder
            .push(keyword)
            .push("(title_lower LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description_lower LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// Make `%`, `_` and the escape character itself match literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Fixed-width UTC so that text ordering in SQL matches time ordering
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn incident_from_row(row: &SqliteRow) -> Result<Incident> {
    let id: String = row.try_get("id")?;
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Incident {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::Database(format!("Invalid incident id '{}': {}", id, e)))?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: category
            .parse()
            .map_err(|_| AppError::Database(format!("Unknown category '{}'", category)))?,
        status: status
            .parse()
            .map_err(|_| AppError::Database(format!("Unknown status '{}'", status)))?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}
