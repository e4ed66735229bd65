//! Locations repository for database operations

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{is_unique_violation, push_search};
use crate::{
    error::{AppError, AppResult},
    models::{
        location::{CreateLocation, Location, LocationRow},
        query::{name_key, sort_column, ListQuery, SortOrder},
    },
};

const LOCATION_COLUMNS: &str = "id, owner_id, name, description, street, city, state, country, \
    postal_code, latitude, longitude, location_type, wind_average_speed, wind_direction, \
    created_at, updated_at";

const SORT_KEYS: &[(&str, &str)] = &[
    ("name", "name"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("type", "location_type"),
];

fn duplicate_name(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::DuplicateName("Location with this name already exists".to_string())
    } else {
        AppError::Database(err)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, owner_id: Uuid, search: Option<&str>) {
    builder.push(" WHERE owner_id = ").push_bind(owner_id);
    push_search(builder, &["name", "description"], search);
}

#[derive(Clone)]
pub struct LocationsRepository {
    pool: SqlitePool,
}

impl LocationsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the owner's locations with search, sort and pagination
    pub async fn list(&self, owner_id: Uuid, query: &ListQuery) -> AppResult<(Vec<Location>, i64)> {
        let page = query.page_request();

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM locations");
        push_filters(&mut count, owner_id, query.search.as_deref());
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM locations", LOCATION_COLUMNS));
        push_filters(&mut select, owner_id, query.search.as_deref());
        select.push(format!(
            " ORDER BY {} {}, id LIMIT ",
            sort_column(query.sort.as_deref(), SORT_KEYS),
            SortOrder::parse(query.order.as_deref()).as_sql()
        ));
        select.push_bind(page.limit).push(" OFFSET ").push_bind(page.offset());

        let rows = select
            .build_query_as::<LocationRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Location::from).collect(), total))
    }

    /// Find a location matching both id and owner
    pub async fn find(&self, owner_id: Uuid, id: Uuid) -> AppResult<Option<Location>> {
        let row = sqlx::query_as::<_, LocationRow>(&format!(
            "SELECT {} FROM locations WHERE id = ? AND owner_id = ?",
            LOCATION_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Location::from))
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> AppResult<Location> {
        self.find(owner_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Location not found".to_string()))
    }

    /// Whether the owner already has a location with this name (case-insensitive, Unicode-aware)
    pub async fn name_exists(&self, owner_id: Uuid, name: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM locations
                WHERE owner_id = ? AND name_key = ? AND (? IS NULL OR id != ?)
            )
            "#,
        )
        .bind(owner_id)
        .bind(name_key(name))
        .bind(exclude)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a location
    pub async fn create(&self, owner_id: Uuid, data: &CreateLocation) -> AppResult<Location> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let address = data.address.clone().unwrap_or_default();
        let wind = data.wind_conditions;

        sqlx::query(
            r#"
            INSERT INTO locations (id, owner_id, name, name_key, description, street, city, state,
                                   country, postal_code, latitude, longitude, location_type,
                                   wind_average_speed, wind_direction, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(data.name.trim())
        .bind(name_key(&data.name))
        .bind(&data.description)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.country)
        .bind(&address.postal_code)
        .bind(data.coordinates.latitude)
        .bind(data.coordinates.longitude)
        .bind(data.location_type)
        .bind(wind.and_then(|w| w.average_speed))
        .bind(wind.and_then(|w| w.direction))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(duplicate_name)?;

        self.get(owner_id, id).await
    }

    /// Persist the full state of an existing location
    pub async fn update(&self, location: &Location) -> AppResult<Location> {
        let wind = location.wind_conditions;
        let result = sqlx::query(
            r#"
            UPDATE locations
            SET name = ?, name_key = ?, description = ?, street = ?, city = ?, state = ?, country = ?,
                postal_code = ?, latitude = ?, longitude = ?, location_type = ?,
                wind_average_speed = ?, wind_direction = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&location.name)
        .bind(name_key(&location.name))
        .bind(&location.description)
        .bind(&location.address.street)
        .bind(&location.address.city)
        .bind(&location.address.state)
        .bind(&location.address.country)
        .bind(&location.address.postal_code)
        .bind(location.coordinates.latitude)
        .bind(location.coordinates.longitude)
        .bind(location.location_type)
        .bind(wind.and_then(|w| w.average_speed))
        .bind(wind.and_then(|w| w.direction))
        .bind(Utc::now())
        .bind(location.id)
        .bind(location.owner_id)
        .execute(&self.pool)
        .await
        .map_err(duplicate_name)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Location not found".to_string()));
        }
        self.get(location.owner_id, location.id).await
    }

    /// Delete a location; items and usage records referencing it are
    /// detached by the schema.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Location not found".to_string()));
        }
        Ok(())
    }
}
