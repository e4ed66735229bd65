//! Items repository for database operations

use chrono::Utc;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{is_unique_violation, push_search};
use crate::{
    error::{AppError, AppResult},
    models::{
        item::{
            Item, ItemImage, ItemQuery, ItemRecord, ItemRow, MaintenanceRecord, MaintenanceRecordRow,
            MaintenanceSchedule, UsageRecord, UsageRecordRow,
        },
        query::{sort_column, SortOrder},
    },
};

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.owner_id, i.name, i.brand, i.model, i.serial_number, i.category_id,
           i.location_id, i.purchase_date, i.purchase_price, i.condition, i.description,
           i.specifications, i.qr_code, i.maintenance_frequency, i.last_maintenance,
           i.next_maintenance, i.created_at, i.updated_at,
           c.name AS category_name, c.color AS category_color,
           l.name AS location_name, l.location_type AS location_type,
           l.latitude AS location_latitude, l.longitude AS location_longitude
    FROM items i
    LEFT JOIN categories c ON c.id = i.category_id
    LEFT JOIN locations l ON l.id = i.location_id
"#;

const SORT_KEYS: &[(&str, &str)] = &[
    ("name", "i.name"),
    ("brand", "i.brand"),
    ("condition", "i.condition"),
    ("purchaseDate", "i.purchase_date"),
    ("purchasePrice", "i.purchase_price"),
    ("createdAt", "i.created_at"),
    ("updatedAt", "i.updated_at"),
];

fn serial_conflict(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Validation("Serial number already in use".to_string())
    } else {
        AppError::Database(err)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, owner_id: Uuid, query: &ItemQuery) {
    builder.push(" WHERE i.owner_id = ").push_bind(owner_id);
    if let Some(category_id) = query.category {
        builder.push(" AND i.category_id = ").push_bind(category_id);
    }
    if let Some(location_id) = query.location {
        builder.push(" AND i.location_id = ").push_bind(location_id);
    }
    push_search(builder, &["i.name", "i.description", "i.brand"], query.search.as_deref());
}

/// Insert image rows. `stored` marks files the image store wrote for this
/// item; only those are purged when the item goes away.
async fn insert_images(
    conn: &mut SqliteConnection,
    item_id: Uuid,
    images: &[ItemImage],
    stored: bool,
) -> AppResult<()> {
    let now = Utc::now();
    for image in images {
        sqlx::query(
            "INSERT INTO item_images (item_id, url, caption, is_primary, stored, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item_id)
        .bind(&image.url)
        .bind(&image.caption)
        .bind(image.is_primary)
        .bind(stored)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct ItemsRepository {
    pool: SqlitePool,
}

impl ItemsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load images and records for a row and compute derived fields
    async fn assemble(&self, row: ItemRow) -> AppResult<Item> {
        let images = sqlx::query_as::<_, ItemImage>(
            "SELECT url, caption, is_primary FROM item_images WHERE item_id = ? ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let maintenance = sqlx::query_as::<_, MaintenanceRecordRow>(
            r#"
            SELECT id, record_type, performed_on, description, cost, performed_by, attachments, created_at
            FROM maintenance_records WHERE item_id = ? ORDER BY performed_on, created_at
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let usage = sqlx::query_as::<_, UsageRecordRow>(
            r#"
            SELECT id, used_on, duration_minutes, location_id, weather_captured, wind_speed,
                   wind_direction, temperature, conditions, notes, created_at
            FROM usage_records WHERE item_id = ? ORDER BY used_on, created_at
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Item::assemble(
            row,
            images,
            maintenance.into_iter().map(MaintenanceRecord::from).collect(),
            usage.into_iter().map(UsageRecord::from).collect(),
        ))
    }

    /// List the owner's items with filters, search, sort and pagination
    pub async fn list(&self, owner_id: Uuid, query: &ItemQuery) -> AppResult<(Vec<Item>, i64)> {
        let page = query.page_request();

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM items i");
        push_filters(&mut count, owner_id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(ITEM_SELECT);
        push_filters(&mut select, owner_id, query);
        select.push(format!(
            " ORDER BY {} {}, i.id LIMIT ",
            sort_column(query.sort.as_deref(), SORT_KEYS),
            SortOrder::parse(query.order.as_deref()).as_sql()
        ));
        select.push_bind(page.limit).push(" OFFSET ").push_bind(page.offset());

        let rows = select.build_query_as::<ItemRow>().fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(self.assemble(row).await?);
        }
        Ok((items, total))
    }

    /// Find an item matching both id and owner
    pub async fn find(&self, owner_id: Uuid, id: Uuid) -> AppResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!("{} WHERE i.id = ? AND i.owner_id = ?", ITEM_SELECT))
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> AppResult<Item> {
        self.find(owner_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    /// Whether a serial number is taken by any item, optionally ignoring one
    pub async fn serial_in_use(&self, serial_number: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM items WHERE serial_number = ? AND (? IS NULL OR id != ?))",
        )
        .bind(serial_number)
        .bind(exclude)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert an item and its images in one transaction. `linked` images
    /// are client URLs, `stored` ones were written by the image store.
    pub async fn create(&self, record: &ItemRecord, linked: &[ItemImage], stored: &[ItemImage]) -> AppResult<Item> {
        let now = Utc::now();
        let schedule = &record.maintenance_schedule;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO items (id, owner_id, name, brand, model, serial_number, category_id, location_id,
                               purchase_date, purchase_price, condition, description, specifications,
                               qr_code, maintenance_frequency, last_maintenance, next_maintenance,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.name)
        .bind(&record.brand)
        .bind(&record.model)
        .bind(&record.serial_number)
        .bind(record.category_id)
        .bind(record.location_id)
        .bind(record.purchase_date)
        .bind(record.purchase_price)
        .bind(record.condition)
        .bind(&record.description)
        .bind(Json(&record.specifications))
        .bind(&record.qr_code)
        .bind(schedule.frequency)
        .bind(schedule.last_maintenance)
        .bind(schedule.next_maintenance)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(serial_conflict)?;

        insert_images(&mut tx, record.id, linked, false).await?;
        insert_images(&mut tx, record.id, stored, true).await?;

        tx.commit().await?;
        self.get(record.owner_id, record.id).await
    }

    /// Write the item columns and append new images in one transaction
    pub async fn update(&self, record: &ItemRecord, linked: &[ItemImage], stored: &[ItemImage]) -> AppResult<Item> {
        let schedule = &record.maintenance_schedule;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE items
            SET name = ?, brand = ?, model = ?, serial_number = ?, category_id = ?, location_id = ?,
                purchase_date = ?, purchase_price = ?, condition = ?, description = ?,
                specifications = ?, maintenance_frequency = ?, last_maintenance = ?,
                next_maintenance = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&record.name)
        .bind(&record.brand)
        .bind(&record.model)
        .bind(&record.serial_number)
        .bind(record.category_id)
        .bind(record.location_id)
        .bind(record.purchase_date)
        .bind(record.purchase_price)
        .bind(record.condition)
        .bind(&record.description)
        .bind(Json(&record.specifications))
        .bind(schedule.frequency)
        .bind(schedule.last_maintenance)
        .bind(schedule.next_maintenance)
        .bind(Utc::now())
        .bind(record.id)
        .bind(record.owner_id)
        .execute(&mut *tx)
        .await
        .map_err(serial_conflict)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item not found".to_string()));
        }

        insert_images(&mut tx, record.id, linked, false).await?;
        insert_images(&mut tx, record.id, stored, true).await?;

        tx.commit().await?;
        self.get(record.owner_id, record.id).await
    }

    /// Delete an item with its records and boxes. Returns the images whose
    /// files were stored for it so they can be purged.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> AppResult<Vec<ItemImage>> {
        let mut tx = self.pool.begin().await?;

        let images = sqlx::query_as::<_, ItemImage>(
            r#"
            SELECT im.url, im.caption, im.is_primary
            FROM item_images im JOIN items i ON i.id = im.item_id
            WHERE im.item_id = ? AND i.owner_id = ? AND im.stored = 1
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM items WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item not found".to_string()));
        }

        tx.commit().await?;
        Ok(images)
    }

    /// Replace the stored QR payload
    pub async fn set_qr_code(&self, owner_id: Uuid, id: Uuid, qr_code: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE items SET qr_code = ?, updated_at = ? WHERE id = ? AND owner_id = ?")
            .bind(qr_code)
            .bind(Utc::now())
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item not found".to_string()));
        }
        Ok(())
    }

    /// Append a maintenance record and store the rolled-forward schedule
    pub async fn add_maintenance(
        &self,
        item: &Item,
        record: &MaintenanceRecord,
        schedule: &MaintenanceSchedule,
    ) -> AppResult<Item> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO maintenance_records (id, item_id, record_type, performed_on, description,
                                             cost, performed_by, attachments, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(item.id)
        .bind(record.record_type)
        .bind(record.date)
        .bind(&record.description)
        .bind(record.cost)
        .bind(&record.performed_by)
        .bind(Json(&record.attachments))
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE items SET last_maintenance = ?, next_maintenance = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(schedule.last_maintenance)
        .bind(schedule.next_maintenance)
        .bind(Utc::now())
        .bind(item.id)
        .bind(item.owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get(item.owner_id, item.id).await
    }

    /// Remove one maintenance record of an owned item
    pub async fn delete_maintenance(&self, owner_id: Uuid, item_id: Uuid, record_id: Uuid) -> AppResult<Item> {
        let result = sqlx::query(
            r#"
            DELETE FROM maintenance_records
            WHERE id = ? AND item_id IN (SELECT id FROM items WHERE id = ? AND owner_id = ?)
            "#,
        )
        .bind(record_id)
        .bind(item_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Maintenance record not found".to_string()));
        }
        self.get(owner_id, item_id).await
    }

    /// Append a usage record
    pub async fn add_usage(&self, item: &Item, record: &UsageRecord) -> AppResult<Item> {
        let weather = record.weather_conditions.clone().unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO usage_records (id, item_id, used_on, duration_minutes, location_id,
                                       weather_captured, wind_speed, wind_direction, temperature,
                                       conditions, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(item.id)
        .bind(record.date)
        .bind(record.duration)
        .bind(record.location_id)
        .bind(record.weather_conditions.is_some())
        .bind(weather.wind_speed)
        .bind(&weather.wind_direction)
        .bind(weather.temperature)
        .bind(&weather.conditions)
        .bind(&record.notes)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        self.get(item.owner_id, item.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{Condition, MaintenanceType};
    use crate::repository::test_support::{insert_user, memory_pool};
    use std::collections::BTreeMap;

    fn record(owner_id: Uuid, name: &str, serial: Option<&str>) -> ItemRecord {
        ItemRecord {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            brand: Some("Severne".to_string()),
            model: None,
            serial_number: serial.map(str::to_string),
            category_id: None,
            location_id: None,
            purchase_date: None,
            purchase_price: Some(899.0),
            condition: Condition::Good,
            description: None,
            specifications: BTreeMap::from([("size".to_string(), "6.5".to_string())]),
            qr_code: Some("data:application/json;base64,e30=".to_string()),
            maintenance_schedule: MaintenanceSchedule::default(),
        }
    }

    fn image(url: &str) -> ItemImage {
        ItemImage { url: url.to_string(), caption: None, is_primary: false }
    }

    #[tokio::test]
    async fn create_update_and_delete_round_trip() {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "alice@example.com").await;
        let repo = ItemsRepository::new(pool);

        let item = repo
            .create(&record(alice, "Freeride 6.5", None), &[image("https://cdn.example.com/a.jpg")], &[])
            .await
            .unwrap();
        assert_eq!(item.images.len(), 1);
        assert_eq!(item.specifications.get("size").map(String::as_str), Some("6.5"));

        let mut changed = ItemRecord::from_item(&item);
        changed.condition = Condition::Fair;
        let item = repo.update(&changed, &[], &[image("/uploads/b.jpg")]).await.unwrap();
        assert_eq!(item.condition, Condition::Fair);
        assert_eq!(item.images.len(), 2);

        // Only the stored file is handed back for purging
        let images = repo.delete(alice, item.id).await.unwrap();
        assert_eq!(images, vec![image("/uploads/b.jpg")]);
        assert!(repo.find(alice, item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn serial_numbers_are_globally_unique() {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "alice@example.com").await;
        let bob = insert_user(&pool, "bob@example.com").await;
        let repo = ItemsRepository::new(pool);

        repo.create(&record(alice, "Board", Some("SN-1")), &[], &[]).await.unwrap();
        assert!(repo.serial_in_use("SN-1", None).await.unwrap());

        let err = repo.create(&record(bob, "Board", Some("SN-1")), &[], &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Items without a serial never conflict
        repo.create(&record(bob, "Harness", None), &[], &[]).await.unwrap();
        repo.create(&record(bob, "Boom", None), &[], &[]).await.unwrap();
    }

    #[tokio::test]
    async fn maintenance_records_are_scoped_by_owner() {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "alice@example.com").await;
        let bob = insert_user(&pool, "bob@example.com").await;
        let repo = ItemsRepository::new(pool);

        let item = repo.create(&record(alice, "Mast", None), &[], &[]).await.unwrap();
        let now = Utc::now();
        let entry = MaintenanceRecord {
            id: Uuid::new_v4(),
            record_type: MaintenanceType::Repair,
            date: now,
            description: Some("Fixed".to_string()),
            cost: Some(40.0),
            performed_by: None,
            attachments: vec![],
            created_at: now,
        };
        let item = repo.add_maintenance(&item, &entry, &item.maintenance_schedule.clone()).await.unwrap();
        assert_eq!(item.maintenance_records.len(), 1);
        assert_eq!(item.total_maintenance_cost, 40.0);

        let err = repo.delete_maintenance(bob, item.id, entry.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let item = repo.delete_maintenance(alice, item.id, entry.id).await.unwrap();
        assert!(item.maintenance_records.is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_owner_and_search() {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "alice@example.com").await;
        let bob = insert_user(&pool, "bob@example.com").await;
        let repo = ItemsRepository::new(pool);

        repo.create(&record(alice, "Freeride 6.5", None), &[], &[]).await.unwrap();
        repo.create(&record(alice, "Wave 4.7", None), &[], &[]).await.unwrap();
        repo.create(&record(bob, "Freeride 7.0", None), &[], &[]).await.unwrap();

        let query = ItemQuery { search: Some("FREE".into()), ..Default::default() };
        let (items, total) = repo.list(alice, &query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "Freeride 6.5");

        let query = ItemQuery { search: Some("severne".into()), ..Default::default() };
        let (_, total) = repo.list(alice, &query).await.unwrap();
        assert_eq!(total, 2);
    }
}
