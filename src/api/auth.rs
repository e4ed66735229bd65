//! Authentication and profile endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        UpdateProfile, User, UserSummary, VerifyEmailRequest,
    },
    AppState,
};

use super::{AppJson, AuthenticatedUser, ClientInfo, Empty, Envelope};

/// Session token and the account it belongs to
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: User,
}

/// Create an account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Invalid input or email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Envelope<SessionResponse>>)> {
    let (token, user) = state.services.auth.register(&request).await?;
    let message = if user.is_verified {
        "Registration successful"
    } else {
        "Registration successful. Please check your email for verification."
    };

    Ok((
        StatusCode::CREATED,
        Envelope::with_message(
            message,
            SessionResponse {
                token,
                user: UserSummary::from(&user),
            },
        ),
    ))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientInfo(context): ClientInfo,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<Envelope<SessionResponse>>> {
    let (token, user) = state.services.auth.login(&request, &context).await?;
    Ok(Envelope::ok(SessionResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

/// Confirm an email address
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified"),
        (status = 400, description = "Invalid verification token", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    AppJson(request): AppJson<VerifyEmailRequest>,
) -> AppResult<Json<Envelope<Empty>>> {
    validator::Validate::validate(&request)?;
    state.services.auth.verify_email(&request.token).await?;
    Ok(Envelope::message("Email verified successfully"))
}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset requested")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<Envelope<Empty>>> {
    state.services.auth.forgot_password(&request.email).await?;
    Ok(Envelope::message(
        "If a user with this email exists, a password reset link will be sent",
    ))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired reset token", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<Envelope<Empty>>> {
    state.services.auth.reset_password(&request).await?;
    Ok(Envelope::message("Password reset successful"))
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
) -> AppResult<Json<Envelope<ProfileResponse>>> {
    let user = state.services.auth.profile(current.id).await?;
    Ok(Envelope::ok(ProfileResponse { user }))
}

/// Update names and preferences
#[utoipa::path(
    put,
    path = "/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    AppJson(request): AppJson<UpdateProfile>,
) -> AppResult<Json<Envelope<ProfileResponse>>> {
    let user = state.services.auth.update_profile(current.id, &request).await?;
    Ok(Envelope::with_message("Profile updated successfully", ProfileResponse { user }))
}

/// Change password
#[utoipa::path(
    put,
    path = "/auth/change-password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is incorrect", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(current): AuthenticatedUser,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> AppResult<Json<Envelope<Empty>>> {
    state.services.auth.change_password(current.id, &request).await?;
    Ok(Envelope::message("Password changed successfully"))
}
