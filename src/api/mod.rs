//! API handlers for the gear tracker REST endpoints

pub mod auth;
pub mod boxes;
pub mod categories;
pub mod health;
pub mod items;
pub mod locations;
pub mod openapi;

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, DefaultBodyLimit, FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::headers::{HeaderMapExt, UserAgent};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::{
    error::AppError,
    models::user::CurrentUser,
    services::auth::LoginContext,
    AppState,
};

/// JSON body extractor whose rejections use the error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejections use the error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path extractor whose rejections use the error envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Success envelope: `{success: true, message?, ...payload}`
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

/// Payload for responses that only carry a message
#[derive(Serialize)]
pub struct Empty {}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data,
        })
    }
}

impl Envelope<Empty> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Self::with_message(message, Empty {})
    }
}

/// Extractor for the user behind a bearer session token
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("No authentication token provided".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let user = state.services.auth.authenticate(token).await?;
        Ok(AuthenticatedUser(user))
    }
}

/// Authenticated user whose email address has been verified
pub struct VerifiedUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        user.require_verified()?;
        Ok(VerifiedUser(user))
    }
}

/// Client address and user agent, recorded on login
pub struct ClientInfo(pub LoginContext);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        let user_agent = parts
            .headers
            .typed_get::<UserAgent>()
            .map(|ua| ua.as_str().to_string());

        Ok(ClientInfo(LoginContext { ip, user_agent }))
    }
}

/// Build the application router: `/api` routes, health, uploads and docs
pub fn router(state: AppState) -> Router {
    let uploads = state.config.uploads.clone();
    // Room for a full batch of images plus the JSON part
    let body_limit = uploads.max_files * uploads.max_file_bytes + 1024 * 1024;

    let api = Router::new()
        .route("/health", get(health::health_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/auth/change-password", axum::routing::put(auth::change_password))
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/bulk-delete", post(categories::bulk_delete_categories))
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Locations
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/locations/:id",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route("/locations/:id/weather", get(locations::location_weather))
        // Items
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item).put(items::update_item).delete(items::delete_item),
        )
        .route("/items/:id/maintenance", post(items::add_maintenance))
        .route(
            "/items/:id/maintenance/:record_id",
            delete(items::remove_maintenance),
        )
        .route("/items/:id/usage", post(items::add_usage))
        .route("/items/:id/qr", post(items::regenerate_qr))
        // Boxes
        .route("/items/:id/boxes", get(boxes::list_boxes).post(boxes::create_box))
        .route("/items/:id/boxes/:box_id", delete(boxes::delete_box))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health_check))
        .with_state(state)
        .nest("/api", api)
        .nest_service(&uploads.public_path, ServeDir::new(&uploads.dir))
        .merge(openapi::create_openapi_router())
}
