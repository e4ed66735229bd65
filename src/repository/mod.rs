//! Repository layer for database operations

pub mod boxes;
pub mod categories;
pub mod items;
pub mod locations;
pub mod users;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::query::like_pattern;

/// Main repository struct holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: SqlitePool,
    pub users: users::UsersRepository,
    pub locations: locations::LocationsRepository,
    pub categories: categories::CategoriesRepository,
    pub items: items::ItemsRepository,
    pub boxes: boxes::BoxesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            locations: locations::LocationsRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            items: items::ItemsRepository::new(pool.clone()),
            boxes: boxes::BoxesRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Whether a database error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Whether a database error is a FOREIGN KEY constraint violation
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Append a case-insensitive substring match over `columns`, OR-ed together.
/// Blank search terms add nothing.
pub(crate) fn push_search(builder: &mut QueryBuilder<'_, Sqlite>, columns: &[&str], term: Option<&str>) {
    let Some(term) = term.filter(|t| !t.trim().is_empty()) else {
        return;
    };
    let pattern = like_pattern(term);

    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder
            .push(format!("LOWER(COALESCE({}, '')) LIKE LOWER(", column))
            .push_bind(pattern.clone())
            .push(") ESCAPE '\\'");
    }
    builder.push(")");
}
