//! Category endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        category::{BulkDeleteCategories, Category, CreateCategory, UpdateCategory},
        query::{ListQuery, Pagination},
    },
    AppState,
};

use super::{AppJson, AppPath, AppQuery, AuthenticatedUser, Empty, Envelope, VerifiedUser};

#[derive(Serialize, ToSchema)]
pub struct CategoryList {
    pub categories: Vec<Category>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryResponse {
    pub category: Category,
}

/// List the caller's categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Categories with item counts", body = CategoryList),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Json<Envelope<CategoryList>>> {
    let (categories, pagination) = state.services.categories.list(user.id, &query).await?;
    Ok(Envelope::ok(CategoryList { categories, pagination }))
}

/// Get one category
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<CategoryResponse>>> {
    let category = state.services.categories.get(user.id, id).await?;
    Ok(Envelope::ok(CategoryResponse { category }))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid input or duplicate name", body = crate::error::ErrorResponse),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppJson(request): AppJson<CreateCategory>,
) -> AppResult<(StatusCode, Json<Envelope<CategoryResponse>>)> {
    let category = state.services.categories.create(user.id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Category created successfully", CategoryResponse { category }),
    ))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Invalid input or duplicate name", body = crate::error::ErrorResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateCategory>,
) -> AppResult<Json<Envelope<CategoryResponse>>> {
    let category = state.services.categories.update(user.id, id, &request).await?;
    Ok(Envelope::with_message("Category updated successfully", CategoryResponse { category }))
}

/// Delete a category that no item references
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 400, description = "Category still has items", body = crate::error::ErrorResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Envelope<Empty>>> {
    state.services.categories.delete(user.id, id).await?;
    Ok(Envelope::message("Category deleted successfully"))
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub deleted_count: u64,
}

/// Delete several categories at once
#[utoipa::path(
    post,
    path = "/categories/bulk-delete",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = BulkDeleteCategories,
    responses(
        (status = 200, description = "Categories deleted", body = BulkDeleteResponse),
        (status = 400, description = "Empty list or a category still has items", body = crate::error::ErrorResponse)
    )
)]
pub async fn bulk_delete_categories(
    State(state): State<AppState>,
    VerifiedUser(user): VerifiedUser,
    AppJson(request): AppJson<BulkDeleteCategories>,
) -> AppResult<Json<Envelope<BulkDeleteResponse>>> {
    let deleted_count = state.services.categories.bulk_delete(user.id, &request).await?;
    Ok(Envelope::with_message(
        format!("Successfully deleted {} categories", deleted_count),
        BulkDeleteResponse { deleted_count },
    ))
}
