//! Gear item endpoints

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use axum_extra::extract::Multipart;
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{CreateItem, ImageUpload, Item, ItemQuery, NewMaintenanceRecord, NewUsageRecord, UpdateItem},
        query::Pagination,
    },
    services::weather::CurrentWeather,
    AppState,
};

use super::{AppJson, AppPath, AppQuery, AuthenticatedUser, Empty, Envelope, VerifiedUser};

#[derive(Serialize, ToSchema)]
pub struct ItemList {
    pub items: Vec<Item>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct ItemResponse {
    pub item: Item,
}

/// Item detail with the weather at its location
#[derive(Serialize, ToSchema)]
pub struct ItemDetail {
    pub item: Item,
    pub weather: Option<CurrentWeather>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub qr_code: String,
}

/// Item create/update body. Either plain JSON, or `multipart/form-data`
/// with the JSON document in a `data` field, files in `images` fields and
/// optional `caption{n}` fields for the n-th file.
pub struct ItemPayload<T> {
    pub data: T,
    pub uploads: Vec<ImageUpload>,
}

#[async_trait]
impl<T> FromRequest<AppState> for ItemPayload<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let AppJson(data) = AppJson::<T>::from_request(req, state).await?;
            return Ok(ItemPayload { data, uploads: Vec::new() });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut data = None;
        let mut uploads = Vec::new();
        let mut captions = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "data" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid data field: {}", e)))?;
                    let parsed = serde_json::from_str::<T>(&text)
                        .map_err(|e| AppError::Validation(format!("Invalid item data: {}", e)))?;
                    data = Some(parsed);
                }
                "images" => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid image upload: {}", e)))?;
                    uploads.push(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                        caption: None,
                    });
                }
                other => {
                    if let Some(index) = other.strip_prefix("caption").and_then(|i| i.parse::<usize>().ok()) {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| AppError::Validation(format!("Invalid caption: {}", e)))?;
                        captions.push((index, text));
                    }
                }
            }
        }

        for (index, caption) in captions {
            if let Some(upload) = uploads.get_mut(index) {
                upload.caption = Some(caption);
            }
        }

        // Without a data field the body is treated as an empty document
        let data = match data {
            Some(data) => data,
            None => serde_json::from_str::<T>("{}")
                .map_err(|e| AppError::Validation(format!("Invalid item data: {}", e)))?,
        };

        Ok(ItemPayload { data, uploads })
    }
}

#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    params(ItemQuery),
    responses(
        (status = 200, description = "The caller's items", body = ItemList),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppQuery(query): AppQuery<ItemQuery>,
) -> AppResult<Json<Envelope<ItemList>>> {
    let (items, pagination) = state.services.items.list(user.id, &query).await?;
    Ok(Envelope::ok(ItemList { items, pagination }))
}

/// Item detail, with current weather when the item has a location
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item", body = ItemDetail),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<ItemDetail>>> {
    let (item, weather) = state.services.items.get_with_weather(user.id, id).await?;
    Ok(Envelope::ok(ItemDetail { item, weather }))
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Invalid input or reference", body = crate::error::ErrorResponse),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    payload: ItemPayload<CreateItem>,
) -> AppResult<(StatusCode, Json<Envelope<ItemResponse>>)> {
    let item = state
        .services
        .items
        .create(user.id, &payload.data, payload.uploads)
        .await?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Item created successfully", ItemResponse { item }),
    ))
}

#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Invalid input or reference", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
    payload: ItemPayload<UpdateItem>,
) -> AppResult<Json<Envelope<ItemResponse>>> {
    let item = state
        .services
        .items
        .update(user.id, id, &payload.data, payload.uploads)
        .await?;
    Ok(Envelope::with_message("Item updated successfully", ItemResponse { item }))
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<Empty>>> {
    state.services.items.delete(user.id, id).await?;
    Ok(Envelope::message("Item deleted successfully"))
}

#[utoipa::path(
    post,
    path = "/items/{id}/maintenance",
    tag = "items",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = NewMaintenanceRecord,
    responses(
        (status = 201, description = "Maintenance recorded", body = ItemResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn add_maintenance(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<NewMaintenanceRecord>,
) -> AppResult<(StatusCode, Json<Envelope<ItemResponse>>)> {
    let item = state.services.items.add_maintenance(user.id, id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Maintenance record added successfully", ItemResponse { item }),
    ))
}

#[utoipa::path(
    delete,
    path = "/items/{id}/maintenance/{record_id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("record_id" = Uuid, Path, description = "Maintenance record ID")
    ),
    responses(
        (status = 200, description = "Maintenance record removed", body = ItemResponse),
        (status = 404, description = "Item or record not found")
    )
)]
pub async fn remove_maintenance(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath((id, record_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<Envelope<ItemResponse>>> {
    let item = state.services.items.remove_maintenance(user.id, id, record_id).await?;
    Ok(Envelope::with_message("Maintenance record removed successfully", ItemResponse { item }))
}

#[utoipa::path(
    post,
    path = "/items/{id}/usage",
    tag = "items",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = NewUsageRecord,
    responses(
        (status = 201, description = "Usage recorded", body = ItemResponse),
        (status = 400, description = "Invalid input or location", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn add_usage(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<NewUsageRecord>,
) -> AppResult<(StatusCode, Json<Envelope<ItemResponse>>)> {
    let item = state.services.items.add_usage(user.id, id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Usage record added successfully", ItemResponse { item }),
    ))
}

/// Replace the item's QR payload
#[utoipa::path(
    post,
    path = "/items/{id}/qr",
    tag = "items",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "QR code regenerated", body = QrResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn regenerate_qr(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<QrResponse>>> {
    let qr_code = state.services.items.regenerate_qr(user.id, id).await?;
    Ok(Envelope::with_message("QR code regenerated successfully", QrResponse { qr_code }))
}
