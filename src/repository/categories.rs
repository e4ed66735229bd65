//! Categories repository for database operations

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{is_foreign_key_violation, is_unique_violation, push_search};
use crate::{
    error::{AppError, AppResult},
    models::{
        category::Category,
        query::{name_key, sort_column, ListQuery, SortOrder},
    },
};

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.owner_id, c.name, c.description, c.color,
           (SELECT COUNT(*) FROM items i WHERE i.category_id = c.id AND i.owner_id = c.owner_id) AS item_count,
           c.created_at, c.updated_at
    FROM categories c
"#;

const SORT_KEYS: &[(&str, &str)] = &[
    ("name", "c.name"),
    ("createdAt", "c.created_at"),
    ("updatedAt", "c.updated_at"),
    ("itemCount", "item_count"),
];

fn duplicate_name(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::DuplicateName("Category with this name already exists".to_string())
    } else {
        AppError::Database(err)
    }
}

/// An item written between the dependents check and the delete still
/// blocks it through the foreign key.
fn still_in_use(err: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&err) {
        AppError::HasDependents("Cannot delete category. Items are associated with it.".to_string())
    } else {
        AppError::Database(err)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, owner_id: Uuid, search: Option<&str>) {
    builder.push(" WHERE c.owner_id = ").push_bind(owner_id);
    push_search(builder, &["c.name", "c.description"], search);
}

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: SqlitePool,
}

impl CategoriesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the owner's categories with item counts
    pub async fn list(&self, owner_id: Uuid, query: &ListQuery) -> AppResult<(Vec<Category>, i64)> {
        let page = query.page_request();

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM categories c");
        push_filters(&mut count, owner_id, query.search.as_deref());
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(CATEGORY_SELECT);
        push_filters(&mut select, owner_id, query.search.as_deref());
        select.push(format!(
            " ORDER BY {} {}, c.id LIMIT ",
            sort_column(query.sort.as_deref(), SORT_KEYS),
            SortOrder::parse(query.order.as_deref()).as_sql()
        ));
        select.push_bind(page.limit).push(" OFFSET ").push_bind(page.offset());

        let rows = select.build_query_as::<Category>().fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Find a category matching both id and owner
    pub async fn find(&self, owner_id: Uuid, id: Uuid) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "{} WHERE c.id = ? AND c.owner_id = ?",
            CATEGORY_SELECT
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> AppResult<Category> {
        self.find(owner_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    /// Whether the owner already has a category with this name (case-insensitive, Unicode-aware)
    pub async fn name_exists(&self, owner_id: Uuid, name: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM categories
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

    /// Create a category
    pub async fn create(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
        color: &str,
    ) -> AppResult<Category> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO categories (id, owner_id, name, name_key, description, color, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .bind(name_key(name))
        .bind(description)
        .bind(color)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(duplicate_name)?;

        self.get(owner_id, id).await
    }

    /// Persist name, description and color of an existing category
    pub async fn update(&self, category: &Category) -> AppResult<Category> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET name = ?, name_key = ?, description = ?, color = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&category.name)
        .bind(name_key(&category.name))
        .bind(&category.description)
        .bind(&category.color)
        .bind(Utc::now())
        .bind(category.id)
        .bind(category.owner_id)
        .execute(&self.pool)
        .await
        .map_err(duplicate_name)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        self.get(category.owner_id, category.id).await
    }

    /// Delete a category, refusing while any of the owner's items uses it
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let item_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE category_id = ? AND owner_id = ?")
                .bind(id)
                .bind(owner_id)
                .fetch_one(&mut *tx)
                .await?;
        if item_count > 0 {
            return Err(AppError::HasDependents(format!(
                "Cannot delete category. It has {} items associated with it.",
                item_count
            )));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(still_in_use)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete several of the owner's categories at once. Nothing is deleted
    /// if any of them still holds items. Returns the number of rows removed;
    /// ids that are unknown or foreign are skipped.
    pub async fn delete_many(&self, owner_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let mut in_use = QueryBuilder::<Sqlite>::new(
            "SELECT c.name FROM categories c WHERE c.owner_id = ",
        );
        in_use.push_bind(owner_id);
        in_use.push(" AND EXISTS (SELECT 1 FROM items i WHERE i.category_id = c.id AND i.owner_id = c.owner_id)");
        in_use.push(" AND c.id IN (");
        let mut separated = in_use.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY c.name");

        let blocked: Vec<String> = in_use.build_query_scalar().fetch_all(&mut *tx).await?;
        if !blocked.is_empty() {
            return Err(AppError::HasDependents(format!(
                "Cannot delete categories that have items: {}",
                blocked.join(", ")
            )));
        }

        let mut delete = QueryBuilder::<Sqlite>::new("DELETE FROM categories WHERE owner_id = ");
        delete.push_bind(owner_id);
        delete.push(" AND id IN (");
        let mut separated = delete.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = delete.build().execute(&mut *tx).await.map_err(still_in_use)?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
