use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{Fields, RecordId, SeatOption, SeatType, SyncRecord};

pub struct SeatOptionRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct SeatOptionRow {
    id: String,
    bar_id: String,
    seat_type: String,
    enabled: bool,
    available_count: i32,
    min_people: i32,
    max_people: i32,
}

const SELECT_COLUMNS: &str =
    "SELECT id, bar_id, type AS seat_type, enabled, available_count, min_people, max_people FROM seat_options";

impl SeatOptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<SeatOption>, GatewayError> {
        let row: Option<SeatOptionRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(hydrate).transpose()
    }
}

fn hydrate(row: SeatOptionRow) -> Result<SeatOption, GatewayError> {
    let seat_type = SeatType::from_str(&row.seat_type).map_err(GatewayError::InvalidRow)?;
    Ok(SeatOption {
        id: RecordId::persisted(row.id),
        bar_id: row.bar_id,
        seat_type,
        enabled: row.enabled,
        available_count: row.available_count,
        min_people: row.min_people,
        max_people: row.max_people,
    })
}

#[async_trait]
impl Gateway<SeatOption> for SeatOptionRepository {
    async fn list(&self, bar_id: &str) -> Result<Vec<SeatOption>, GatewayError> {
        let rows: Vec<SeatOptionRow> =
            sqlx::query_as(&format!("{} WHERE bar_id = ? ORDER BY type", SELECT_COLUMNS))
                .bind(bar_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(hydrate).collect()
    }

    async fn create(&self, fields: Fields) -> Result<SeatOption, GatewayError> {
        let id = Uuid::new_v4().to_string();
        let option = SeatOption::from_fields(RecordId::persisted(id.clone()), fields)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO seat_options (id, bar_id, type, enabled, available_count, min_people, max_people, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(option.bar_id())
        .bind(option.seat_type.to_string())
        .bind(option.enabled)
        .bind(option.available_count)
        .bind(option.min_people)
        .bind(option.max_people)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or(GatewayError::NotFound(id))
    }

    async fn update(&self, id: &str, fields: Fields) -> Result<SeatOption, GatewayError> {
        let option = SeatOption::from_fields(RecordId::persisted(id), fields)?;

        let result = sqlx::query(
            r#"
            UPDATE seat_options
            SET bar_id = ?, type = ?, enabled = ?, available_count = ?,
                min_people = ?, max_people = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(option.bar_id())
        .bind(option.seat_type.to_string())
        .bind(option.enabled)
        .bind(option.available_count)
        .bind(option.min_people)
        .bind(option.max_people)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(id.to_string()));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        sqlx::query("DELETE FROM seat_options WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
