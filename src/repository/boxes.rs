//! Boxes repository, always joined through the owning item

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::gear_box::{CreateGearBox, GearBox},
};

#[derive(Clone)]
pub struct BoxesRepository {
    pool: SqlitePool,
}

impl BoxesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Boxes of an item owned by `owner_id`
    pub async fn list(&self, owner_id: Uuid, item_id: Uuid) -> AppResult<Vec<GearBox>> {
        let boxes = sqlx::query_as::<_, GearBox>(
            r#"
            SELECT b.id, b.item_id, b.name, b.description, b.created_at
            FROM boxes b JOIN items i ON i.id = b.item_id
            WHERE b.item_id = ? AND i.owner_id = ?
            ORDER BY b.created_at, b.name
            "#,
        )
        .bind(item_id)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(boxes)
    }

    /// Create a box under an item; the caller has already resolved the item
    /// for its owner.
    pub async fn create(&self, item_id: Uuid, data: &CreateGearBox) -> AppResult<GearBox> {
        let gear_box = sqlx::query_as::<_, GearBox>(
            r#"
            INSERT INTO boxes (id, item_id, name, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, item_id, name, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(gear_box)
    }

    pub async fn delete(&self, owner_id: Uuid, item_id: Uuid, box_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM boxes
            WHERE id = ? AND item_id IN (SELECT id FROM items WHERE id = ? AND owner_id = ?)
            "#,
        )
        .bind(box_id)
        .bind(item_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Box not found".to_string()));
        }
        Ok(())
    }
}
