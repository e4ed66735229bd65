//! Signed bearer tokens for sessions, email verification and password reset

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{TokenClaims, TokenPurpose},
};

#[derive(Clone)]
pub struct TokenService {
    config: AuthConfig,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Lifetime of a token of the given purpose
    pub fn lifetime(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::Session => Duration::hours(self.config.session_ttl_hours),
            TokenPurpose::EmailVerification => Duration::hours(self.config.verification_ttl_hours),
            TokenPurpose::PasswordReset => Duration::minutes(self.config.reset_ttl_minutes),
        }
    }

    /// Issue a token for `user_id`
    pub fn issue(&self, user_id: Uuid, purpose: TokenPurpose) -> AppResult<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            purpose,
            jti: Uuid::new_v4(),
            exp: (now + self.lifetime(purpose)).timestamp(),
            iat: now.timestamp(),
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Check signature, expiry and purpose, returning the user id
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> AppResult<Uuid> {
        let claims = TokenClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid token".to_string()))?;

        if claims.purpose != purpose {
            return Err(AppError::Authentication("Invalid token".to_string()));
        }
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn service() -> TokenService {
        TokenService::new(AuthConfig {
            jwt_secret: SECRET.to_string(),
            session_ttl_hours: 168,
            verification_ttl_hours: 24,
            reset_ttl_minutes: 60,
            auto_verify: false,
        })
    }

    #[test]
    fn issued_token_verifies_for_its_purpose_only() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id, TokenPurpose::Session).unwrap();

        assert_eq!(tokens.verify(&token, TokenPurpose::Session).unwrap(), user_id);
        assert!(tokens.verify(&token, TokenPurpose::PasswordReset).is_err());
    }

    #[test]
    fn tampered_and_foreign_tokens_are_rejected() {
        let tokens = service();
        let token = tokens.issue(Uuid::new_v4(), TokenPurpose::Session).unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(tokens.verify(&tampered, TokenPurpose::Session).is_err());

        let other = TokenService::new(AuthConfig {
            jwt_secret: "another-secret-another-secret-!!".to_string(),
            ..service().config
        });
        assert!(other.verify(&token, TokenPurpose::Session).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            purpose: TokenPurpose::Session,
            jti: Uuid::new_v4(),
            // Past the validation leeway
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
        };
        let token = claims.create_token(SECRET).unwrap();
        assert!(service().verify(&token, TokenPurpose::Session).is_err());
    }

    #[test]
    fn lifetimes_per_purpose() {
        let tokens = service();
        assert_eq!(tokens.lifetime(TokenPurpose::Session), Duration::days(7));
        assert_eq!(tokens.lifetime(TokenPurpose::EmailVerification), Duration::hours(24));
        assert_eq!(tokens.lifetime(TokenPurpose::PasswordReset), Duration::hours(1));
    }

    #[test]
    fn two_tokens_issued_together_differ() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let a = tokens.issue(user_id, TokenPurpose::EmailVerification).unwrap();
        let b = tokens.issue(user_id, TokenPurpose::EmailVerification).unwrap();
        assert_ne!(a, b);
    }
}
