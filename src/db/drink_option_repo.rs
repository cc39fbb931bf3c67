use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{DrinkOption, DrinkType, Fields, RecordId, SyncRecord};

pub struct DrinkOptionRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DrinkOptionRow {
    id: String,
    bar_id: String,
    drink_type: String,
    name: Option<String>,
    price: f64,
}

const SELECT_COLUMNS: &str =
    "SELECT id, bar_id, type AS drink_type, name, price FROM drink_options";

impl DrinkOptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<DrinkOption>, GatewayError> {
        let row: Option<DrinkOptionRow> =
            sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(hydrate).transpose()
    }
}

fn hydrate(row: DrinkOptionRow) -> Result<DrinkOption, GatewayError> {
    Ok(DrinkOption {
        id: RecordId::persisted(row.id),
        bar_id: row.bar_id,
        drink_type: DrinkType::from_str(&row.drink_type).map_err(GatewayError::InvalidRow)?,
        name: row.name,
        price: row.price,
    })
}

#[async_trait]
impl Gateway<DrinkOption> for DrinkOptionRepository {
    async fn list(&self, bar_id: &str) -> Result<Vec<DrinkOption>, GatewayError> {
        let rows: Vec<DrinkOptionRow> = sqlx::query_as(&format!(
            "{} WHERE bar_id = ? ORDER BY created_at, id",
            SELECT_COLUMNS
        ))
        .bind(bar_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate).collect()
    }

    async fn create(&self, fields: Fields) -> Result<DrinkOption, GatewayError> {
        let id = Uuid::new_v4().to_string();
        let drink = DrinkOption::from_fields(RecordId::persisted(id.clone()), fields)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO drink_options (id, bar_id, type, name, price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(drink.bar_id())
        .bind(drink.drink_type.to_string())
        .bind(&drink.name)
        .bind(drink.price)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or(GatewayError::NotFound(id))
    }

    async fn update(&self, id: &str, fields: Fields) -> Result<DrinkOption, GatewayError> {
        let drink = DrinkOption::from_fields(RecordId::persisted(id), fields)?;

        let result = sqlx::query(
            r#"
            UPDATE drink_options
            SET bar_id = ?, type = ?, name = ?, price = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(drink.bar_id())
        .bind(drink.drink_type.to_string())
        .bind(&drink.name)
        .bind(drink.price)
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
        sqlx::query("DELETE FROM drink_options WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
