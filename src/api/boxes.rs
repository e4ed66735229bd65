//! Box endpoints, nested under items

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::gear_box::{CreateGearBox, GearBox},
    AppState,
};

use super::{AppJson, AppPath, AuthenticatedUser, Empty, Envelope, VerifiedUser};

#[derive(Serialize, ToSchema)]
pub struct BoxList {
    pub boxes: Vec<GearBox>,
}

#[derive(Serialize, ToSchema)]
pub struct BoxResponse {
    #[serde(rename = "box")]
    pub gear_box: GearBox,
}

#[utoipa::path(
    get,
    path = "/items/{id}/boxes",
    tag = "boxes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Boxes of the item", body = BoxList),
        (status = 404, description = "Item not found")
    )
)]
pub async fn list_boxes(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppPath(item_id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<BoxList>>> {
    let boxes = state.services.boxes.list(user.id, item_id).await?;
    Ok(Envelope::ok(BoxList { boxes }))
}

#[utoipa::path(
    post,
    path = "/items/{id}/boxes",
    tag = "boxes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = CreateGearBox,
    responses(
        (status = 201, description = "Box created", body = BoxResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn create_box(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(item_id): AppPath<Uuid>,
    AppJson(request): AppJson<CreateGearBox>,
) -> AppResult<(StatusCode, Json<Envelope<BoxResponse>>)> {
    let gear_box = state.services.boxes.create(user.id, item_id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Box created successfully", BoxResponse { gear_box }),
    ))
}

#[utoipa::path(
    delete,
    path = "/items/{id}/boxes/{box_id}",
    tag = "boxes",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("box_id" = Uuid, Path, description = "Box ID")
    ),
    responses(
        (status = 200, description = "Box deleted"),
        (status = 404, description = "Box not found")
    )
)]
pub async fn delete_box(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath((item_id, box_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<Envelope<Empty>>> {
    state.services.boxes.delete(user.id, item_id, box_id).await?;
    Ok(Envelope::message("Box deleted successfully"))
}
