//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::{Role, Theme};
use crate::error::AppError;

/// Number of login history entries kept per user
pub const LOGIN_HISTORY_LIMIT: i64 = 10;

/// Notification switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email: bool,
    pub maintenance: bool,
    pub usage: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            maintenance: true,
            usage: true,
        }
    }
}

/// Per-user client preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub theme: Theme,
    pub notifications: NotificationPreferences,
    pub default_location_id: Option<Uuid>,
}

/// Partial preferences update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferences {
    pub theme: Option<Theme>,
    pub notifications: Option<UpdateNotificationPreferences>,
    pub default_location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationPreferences {
    pub email: Option<bool>,
    pub maintenance: Option<bool>,
    pub usage: Option<bool>,
}

impl Preferences {
    /// Apply a partial update on top of the current preferences
    pub fn merge(&self, update: &UpdatePreferences) -> Preferences {
        let mut merged = self.clone();
        if let Some(theme) = update.theme {
            merged.theme = theme;
        }
        if let Some(ref n) = update.notifications {
            merged.notifications.email = n.email.unwrap_or(merged.notifications.email);
            merged.notifications.maintenance =
                n.maintenance.unwrap_or(merged.notifications.maintenance);
            merged.notifications.usage = n.usage.unwrap_or(merged.notifications.usage);
        }
        if update.default_location_id.is_some() {
            merged.default_location_id = update.default_location_id;
        }
        merged
    }
}

/// One successful sign-in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginEntry {
    pub logged_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    id: Uuid,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: Role,
    is_verified: bool,
    verification_token: Option<String>,
    reset_password_token: Option<String>,
    reset_password_expires: Option<DateTime<Utc>>,
    preferences: Json<Preferences>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password: row.password,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            is_verified: row.is_verified,
            verification_token: row.verification_token,
            reset_password_token: row.reset_password_token,
            reset_password_expires: row.reset_password_expires,
            preferences: row.preferences.0,
            last_login: row.last_login,
            login_history: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Full user model
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub preferences: Preferences,
    pub last_login: Option<DateTime<Utc>>,
    /// Most recent sign-ins, newest first
    pub login_history: Vec<LoginEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => "User".to_string(),
        }
    }
}

/// User representation returned by register/login
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_verified: bool,
    pub role: Role,
    pub preferences: Preferences,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_verified: user.is_verified,
            role: user.role,
            preferences: user.preferences.clone(),
        }
    }
}

/// Data needed to persist a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_verified: bool,
    pub verification_token: Option<String>,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(max = 100, message = "First name cannot exceed 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "Last name cannot exceed 100 characters"))]
    pub last_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Verification token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
}

/// Update own profile request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(length(max = 100, message = "First name cannot exceed 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "Last name cannot exceed 100 characters"))]
    pub last_name: Option<String>,
    pub preferences: Option<UpdatePreferences>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub new_password: String,
}

/// Authenticated identity attached to a request by the authorization gate
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        CurrentUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            is_verified: user.is_verified,
        }
    }
}

impl CurrentUser {
    /// Require a verified email address
    pub fn require_verified(&self) -> Result<(), AppError> {
        if self.is_verified {
            Ok(())
        } else {
            Err(AppError::Authorization("Email verification required".to_string()))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Admin access required".to_string()))
        }
    }
}

/// What a signed token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    EmailVerification,
    PasswordReset,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: Uuid,
    pub purpose: TokenPurpose,
    /// Unique token id, so two tokens issued in the same second differ
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl TokenClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and validate a JWT token (signature and expiry)
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(role: Role, is_verified: bool) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "rider@example.com".to_string(),
            role,
            is_verified,
        }
    }

    #[test]
    fn gates_reject_unverified_and_non_admin() {
        assert!(current(Role::User, false).require_verified().is_err());
        assert!(current(Role::User, true).require_verified().is_ok());
        assert!(current(Role::User, true).require_admin().is_err());
        assert!(current(Role::Admin, false).require_admin().is_ok());
    }

    #[test]
    fn preference_merge_keeps_unspecified_fields() {
        let current = Preferences::default();
        let update = UpdatePreferences {
            theme: Some(Theme::Dark),
            notifications: Some(UpdateNotificationPreferences {
                usage: Some(false),
                ..Default::default()
            }),
            default_location_id: None,
        };
        let merged = current.merge(&update);
        assert_eq!(merged.theme, Theme::Dark);
        assert!(merged.notifications.email);
        assert!(merged.notifications.maintenance);
        assert!(!merged.notifications.usage);
        assert_eq!(merged.default_location_id, None);
    }

    #[test]
    fn preferences_deserialize_from_empty_object() {
        let prefs: Preferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn register_request_validation() {
        let ok = RegisterRequest {
            email: "alice@example.com".into(),
            password: "Secret123!".into(),
            first_name: None,
            last_name: None,
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            first_name: None,
            last_name: None,
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }
}
