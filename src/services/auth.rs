//! Authentication and account management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        ChangePasswordRequest, CurrentUser, LoginRequest, NewUser, RegisterRequest, ResetPasswordRequest,
        TokenPurpose, UpdateProfile, User,
    },
    repository::Repository,
};

use super::{email::EmailService, tokens::TokenService};

/// Where a login came from, recorded in the login history
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    tokens: TokenService,
    email: EmailService,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, tokens: TokenService, email: EmailService, config: AuthConfig) -> Self {
        Self {
            repository,
            tokens,
            email,
            config,
        }
    }

    /// Hash a password using Argon2
    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    fn verify_password(user: &User, password: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(&user.password)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Resolve a session token to the identity attached to the request.
    /// Every failure is an authentication failure.
    pub async fn authenticate(&self, token: &str) -> AppResult<CurrentUser> {
        let user_id = self.tokens.verify(token, TokenPurpose::Session)?;
        let user = self
            .repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid token".to_string()))?;
        Ok(CurrentUser::from(&user))
    }

    /// Create an account and return a session token
    pub async fn register(&self, data: &RegisterRequest) -> AppResult<(String, User)> {
        data.validate()?;

        if self.repository.users.email_exists(&data.email).await? {
            return Err(AppError::Validation("User already exists".to_string()));
        }

        let new_user = NewUser {
            email: data.email.clone(),
            password_hash: Self::hash_password(&data.password)?,
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            is_verified: self.config.auto_verify,
            verification_token: None,
        };
        let mut user = self.repository.users.create(&new_user).await?;
        tracing::info!(user_id = %user.id, "User registered");

        if !user.is_verified {
            let token = self.tokens.issue(user.id, TokenPurpose::EmailVerification)?;
            self.repository.users.set_verification_token(user.id, &token).await?;
            user.verification_token = Some(token.clone());

            if let Err(e) = self.email.send_verification(&user.email, &user.full_name(), &token).await {
                tracing::warn!(user_id = %user.id, "Failed to send verification email: {}", e);
            }
        }

        let session = self.tokens.issue(user.id, TokenPurpose::Session)?;
        Ok((session, user))
    }

    /// Check credentials, record the login and return a session token
    pub async fn login(&self, data: &LoginRequest, context: &LoginContext) -> AppResult<(String, User)> {
        data.validate()?;

        let invalid = || AppError::Authentication("Invalid credentials".to_string());
        let user = self
            .repository
            .users
            .find_by_email(&data.email)
            .await?
            .ok_or_else(invalid)?;

        if !Self::verify_password(&user, &data.password)? {
            return Err(invalid());
        }

        self.record_login(user.id, context).await?;
        let token = self.tokens.issue(user.id, TokenPurpose::Session)?;
        tracing::info!(user_id = %user.id, "User logged in");

        let user = self.repository.users.get_by_id(user.id).await?;
        Ok((token, user))
    }

    /// Post-authentication hook: append to the login history
    pub async fn record_login(&self, user_id: Uuid, context: &LoginContext) -> AppResult<()> {
        self.repository
            .users
            .record_login(user_id, context.ip.as_deref(), context.user_agent.as_deref())
            .await
    }

    /// Consume an email verification token
    pub async fn verify_email(&self, token: &str) -> AppResult<()> {
        let invalid = || AppError::Validation("Invalid verification token".to_string());

        let user_id = self
            .tokens
            .verify(token, TokenPurpose::EmailVerification)
            .map_err(|_| invalid())?;
        let user = self
            .repository
            .users
            .find_by_verification_token(token)
            .await?
            .filter(|u| u.id == user_id)
            .ok_or_else(invalid)?;

        self.repository.users.mark_verified(user.id).await?;
        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Start a password reset. Succeeds whether or not the account exists.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.repository.users.find_by_email(email).await? else {
            return Ok(());
        };

        let token = self.tokens.issue(user.id, TokenPurpose::PasswordReset)?;
        let expires = Utc::now() + self.tokens.lifetime(TokenPurpose::PasswordReset);
        self.repository.users.set_reset_token(user.id, &token, expires).await?;

        if let Err(e) = self.email.send_password_reset(&user.email, &user.full_name(), &token).await {
            tracing::warn!(user_id = %user.id, "Failed to send password reset email: {}", e);
        }
        Ok(())
    }

    /// Set a new password with a reset token
    pub async fn reset_password(&self, data: &ResetPasswordRequest) -> AppResult<()> {
        data.validate()?;
        let invalid = || AppError::Validation("Invalid or expired reset token".to_string());

        let user_id = self
            .tokens
            .verify(&data.token, TokenPurpose::PasswordReset)
            .map_err(|_| invalid())?;
        let user = self
            .repository
            .users
            .find_by_reset_token(&data.token)
            .await?
            .filter(|u| u.id == user_id)
            .filter(|u| u.reset_password_expires.map_or(false, |exp| exp > Utc::now()))
            .ok_or_else(invalid)?;

        let hash = Self::hash_password(&data.password)?;
        self.repository.users.update_password(user.id, &hash).await?;
        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Update names and preferences of the caller
    pub async fn update_profile(&self, user_id: Uuid, data: &UpdateProfile) -> AppResult<User> {
        data.validate()?;
        let user = self.repository.users.get_by_id(user_id).await?;

        let preferences = match data.preferences {
            Some(ref update) => {
                if let Some(location_id) = update.default_location_id {
                    if self.repository.locations.find(user_id, location_id).await?.is_none() {
                        return Err(AppError::InvalidReference("Default location not found".to_string()));
                    }
                }
                user.preferences.merge(update)
            }
            None => user.preferences.clone(),
        };

        let first_name = data.first_name.as_deref().or(user.first_name.as_deref());
        let last_name = data.last_name.as_deref().or(user.last_name.as_deref());

        self.repository
            .users
            .update_profile(user_id, first_name, last_name, &preferences)
            .await
    }

    /// Change the caller's password after checking the current one
    pub async fn change_password(&self, user_id: Uuid, data: &ChangePasswordRequest) -> AppResult<()> {
        data.validate()?;
        let user = self.repository.users.get_by_id(user_id).await?;

        if !Self::verify_password(&user, &data.current_password)? {
            return Err(AppError::Validation("Current password is incorrect".to_string()));
        }

        let hash = Self::hash_password(&data.new_password)?;
        self.repository.users.update_password(user_id, &hash).await?;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}
