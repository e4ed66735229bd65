//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

use super::is_unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::user::{LoginEntry, NewUser, Preferences, User, UserRow, LOGIN_HISTORY_LIMIT},
};

const USER_COLUMNS: &str = "id, email, password, first_name, last_name, role, is_verified, \
    verification_token, reset_password_token, reset_password_expires, preferences, \
    last_login, created_at, updated_at";

#[derive(Clone)]
pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the login history of a fetched row
    async fn with_history(&self, row: Option<UserRow>) -> AppResult<Option<User>> {
        match row {
            Some(row) => {
                let mut user = User::from(row);
                user.login_history = self.login_history(user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn find_by_text_column(&self, column: &str, value: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        self.with_history(row).await
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.with_history(row).await
    }

    /// Get a user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Find a user by email (stored lower-cased)
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.find_by_text_column("email", &email.trim().to_lowercase()).await
    }

    pub async fn find_by_verification_token(&self, token: &str) -> AppResult<Option<User>> {
        self.find_by_text_column("verification_token", token).await
    }

    pub async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<User>> {
        self.find_by_text_column("reset_password_token", token).await
    }

    /// Check if an email is already registered
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(email.trim().to_lowercase())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create a new user
    pub async fn create(&self, data: &NewUser) -> AppResult<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password, first_name, last_name, role, is_verified,
                               verification_token, preferences, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'user', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(data.email.trim().to_lowercase())
        .bind(&data.password_hash)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.is_verified)
        .bind(&data.verification_token)
        .bind(Json(Preferences::default()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation("User already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        self.get_by_id(id).await
    }

    /// Mark the account verified and consume the verification token
    pub async fn mark_verified(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET is_verified = 1, verification_token = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_verification_token(&self, id: Uuid, token: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET verification_token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_reset_token(&self, id: Uuid, token: &str, expires: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET reset_password_token = ?, reset_password_expires = ?, updated_at = ? WHERE id = ?",
        )
        .bind(token)
        .bind(expires)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and clear any pending reset token
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password = ?, reset_password_token = NULL, reset_password_expires = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Update names and preferences
    pub async fn update_profile(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
        preferences: &Preferences,
    ) -> AppResult<User> {
        sqlx::query(
            "UPDATE users SET first_name = ?, last_name = ?, preferences = ?, updated_at = ? WHERE id = ?",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(Json(preferences))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Append a login history entry, update `last_login` and keep only the
    /// most recent entries.
    pub async fn record_login(&self, id: Uuid, ip: Option<&str>, user_agent: Option<&str>) -> AppResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO login_history (user_id, logged_at, ip, user_agent) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(now)
            .bind(ip)
            .bind(user_agent)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM login_history
            WHERE user_id = ?
              AND id NOT IN (SELECT id FROM login_history WHERE user_id = ? ORDER BY id DESC LIMIT ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .bind(LOGIN_HISTORY_LIMIT)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Most recent logins, newest first
    pub async fn login_history(&self, id: Uuid) -> AppResult<Vec<LoginEntry>> {
        let entries = sqlx::query_as::<_, LoginEntry>(
            "SELECT logged_at, ip, user_agent FROM login_history WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(id)
        .bind(LOGIN_HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
