//! Deal Repository - SQLite
//!
//! Local SQLite-backed implementation of the deal record store.
//! Position maintenance lives in deal_positioning.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

use crate::domain::{
    Deal, DealFilter, DealId, DealPatch, DomainError, DomainResult, Priority, Stage,
};
use super::db::SharedConnection;
use super::traits::Repository;

const SELECT_DEAL: &str =
    "SELECT id, title, value, priority, contact_name, stage, order_index, created_at, updated_at \
     FROM deals";

/// SQLite implementation of the deal repository
pub struct SqliteDealRepository {
    pub(super) conn: SharedConnection,
}

impl SqliteDealRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Repository<Deal> for SqliteDealRepository {
    async fn create(&self, entity: &Deal) -> DomainResult<Deal> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let now = Utc::now();
        let created_at = entity.created_at.unwrap_or(now);

        // Empty id means "let the store pick one"
        let id: String = conn
            .query_row(
                "INSERT INTO deals (id, title, value, priority, contact_name, stage, order_index,
                                    created_at, updated_at)
                 VALUES (COALESCE(NULLIF(?, ''), lower(hex(randomblob(16)))),
                         ?, ?, ?, ?, ?, ?, ?, ?)
                 RETURNING id",
                params![
                    entity.id.as_str(),
                    entity.title,
                    entity.value,
                    entity.priority.as_str(),
                    entity.contact_name,
                    entity.stage.as_str(),
                    entity.order_index,
                    created_at.to_rfc3339(),
                    now.to_rfc3339(),
                ],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DomainError::Conflict(format!("Deal {} already exists", entity.id))
                }
                other => DomainError::Internal(other.to_string()),
            })?;

        Ok(Deal {
            id: DealId::new(id),
            created_at: Some(created_at),
            updated_at: Some(now),
            ..entity.clone()
        })
    }

    async fn find_by_id(&self, id: &DealId) -> DomainResult<Option<Deal>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn
            .prepare(&format!("{} WHERE id = ?", SELECT_DEAL))
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let mut rows = stmt
            .query(params![id.as_str()])
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        match rows.next().map_err(|e| DomainError::Internal(e.to_string()))? {
            Some(row) => Ok(Some(row_to_deal(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &DealFilter) -> DomainResult<Vec<Deal>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(stage) = &filter.stage {
            clauses.push("stage = ?");
            values.push(stage.as_str().to_string());
        }
        if let Some(contact) = &filter.contact_name {
            clauses.push("contact_name = ?");
            values.push(contact.clone());
        }

        let mut query = SELECT_DEAL.to_string();
        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }
        query.push_str(" ORDER BY order_index ASC, id ASC");

        let mut stmt = conn.prepare(&query).map_err(|e| DomainError::Internal(e.to_string()))?;
        let mut rows = stmt
            .query(params_from_iter(values.iter()))
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut deals = Vec::new();
        while let Some(row) = rows.next().map_err(|e| DomainError::Internal(e.to_string()))? {
            deals.push(row_to_deal(row)?);
        }
        Ok(deals)
    }

    async fn update(&self, id: &DealId, patch: &DealPatch) -> DomainResult<()> {
        if patch.is_empty() {
            return Err(DomainError::InvalidInput(format!("Nothing to update for deal {}", id)));
        }
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut sets = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(value) = patch.value {
            sets.push("value = ?");
            values.push(Value::Real(value));
        }
        if let Some(priority) = patch.priority {
            sets.push("priority = ?");
            values.push(Value::Text(priority.as_str().to_string()));
        }
        if let Some(contact) = &patch.contact_name {
            sets.push("contact_name = ?");
            values.push(Value::Text(contact.clone()));
        }
        if let Some(stage) = &patch.stage {
            sets.push("stage = ?");
            values.push(Value::Text(stage.as_str().to_string()));
        }
        if let Some(order_index) = patch.order_index {
            sets.push("order_index = ?");
            values.push(Value::Integer(order_index));
        }
        sets.push("updated_at = ?");
        values.push(Value::Text(Utc::now().to_rfc3339()));
        values.push(Value::Text(id.as_str().to_string()));

        let changed = conn
            .execute(
                &format!("UPDATE deals SET {} WHERE id = ?", sets.join(", ")),
                params_from_iter(values.iter()),
            )
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Deal {} not found", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &DealId) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        conn.execute("DELETE FROM deals WHERE id = ?", params![id.as_str()])
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(())
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a database row to Deal
pub(super) fn row_to_deal(row: &rusqlite::Row) -> DomainResult<Deal> {
    Ok(Deal {
        id: DealId::new(row.get::<_, String>(0).map_err(|e| DomainError::Internal(e.to_string()))?),
        title: row.get::<_, String>(1).map_err(|e| DomainError::Internal(e.to_string()))?,
        value: row.get::<_, f64>(2).unwrap_or(0.0),
        priority: Priority::from_str(
            &row.get::<_, String>(3).unwrap_or_else(|_| "medium".to_string()),
        ),
        contact_name: row.get::<_, Option<String>>(4).ok().flatten(),
        stage: Stage::new(
            row.get::<_, String>(5).map_err(|e| DomainError::Internal(e.to_string()))?,
        ),
        order_index: row.get::<_, i64>(6).unwrap_or(0),
        created_at: parse_timestamp(row.get::<_, Option<String>>(7).ok().flatten()),
        updated_at: parse_timestamp(row.get::<_, Option<String>>(8).ok().flatten()),
    })
}
