//! Location endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        location::{CreateLocation, Location, UpdateLocation},
        query::{ListQuery, Pagination},
    },
    services::weather::CurrentWeather,
    AppState,
};

use super::{AppJson, AppPath, AppQuery, AuthenticatedUser, Empty, Envelope, VerifiedUser};

#[derive(Serialize, ToSchema)]
pub struct LocationList {
    pub locations: Vec<Location>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct LocationResponse {
    pub location: Location,
}

#[derive(Serialize, ToSchema)]
pub struct WeatherResponse {
    pub weather: CurrentWeather,
}

#[utoipa::path(
    get,
    path = "/locations",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "The caller's locations", body = LocationList),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_locations(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Json<Envelope<LocationList>>> {
    let (locations, pagination) = state.services.locations.list(user.id, &query).await?;
    Ok(Envelope::ok(LocationList { locations, pagination }))
}

#[utoipa::path(
    get,
    path = "/locations/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location", body = LocationResponse),
        (status = 404, description = "Location not found")
    )
)]
pub async fn get_location(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<LocationResponse>>> {
    let location = state.services.locations.get(user.id, id).await?;
    Ok(Envelope::ok(LocationResponse { location }))
}

#[utoipa::path(
    post,
    path = "/locations",
    tag = "locations",
    security(("bearer_auth" = [])),
    request_body = CreateLocation,
    responses(
        (status = 201, description = "Location created", body = LocationResponse),
        (status = 400, description = "Invalid input or duplicate name", body = crate::error::ErrorResponse),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn create_location(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppJson(request): AppJson<CreateLocation>,
) -> AppResult<(StatusCode, Json<Envelope<LocationResponse>>)> {
    let location = state.services.locations.create(user.id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Location created successfully", LocationResponse { location }),
    ))
}

#[utoipa::path(
    put,
    path = "/locations/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = UpdateLocation,
    responses(
        (status = 200, description = "Location updated", body = LocationResponse),
        (status = 400, description = "Invalid input or duplicate name", body = crate::error::ErrorResponse),
        (status = 404, description = "Location not found")
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateLocation>,
) -> AppResult<Json<Envelope<LocationResponse>>> {
    let location = state.services.locations.update(user.id, id, &request).await?;
    Ok(Envelope::with_message("Location updated successfully", LocationResponse { location }))
}

/// Delete a location; items and usage records referencing it lose the reference
#[utoipa::path(
    delete,
    path = "/locations/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location deleted"),
        (status = 404, description = "Location not found")
    )
)]
pub async fn delete_location(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<Empty>>> {
    state.services.locations.delete(user.id, id).await?;
    Ok(Envelope::message("Location deleted successfully"))
}

/// Current weather at a location
#[utoipa::path(
    get,
    path = "/locations/{id}/weather",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Current weather, possibly unavailable", body = WeatherResponse),
        (status = 404, description = "Location not found")
    )
)]
pub async fn location_weather(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<WeatherResponse>>> {
    let weather = state.services.locations.weather(user.id, id).await?;
    Ok(Envelope::ok(WeatherResponse { weather }))
}
