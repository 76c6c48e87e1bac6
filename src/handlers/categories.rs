use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::created_response;
use crate::{
    auth::AuthUser,
    entities::{category, status::ItemType},
    errors::ServiceError,
    services::categories::{CategoryDraft, CategoryUpdate},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryQuery {
    /// Only categories for this catalog
    #[serde(rename = "type")]
    pub category_type: Option<ItemType>,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    summary = "List categories",
    params(CategoryQuery),
    responses(
        (status = 200, description = "Categories ordered by name", body = ApiResponse<Vec<category::Model>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Vec<category::Model>> {
    let categories = state
        .services
        .categories
        .list_categories(query.category_type)
        .await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    summary = "Get category",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<category::Model>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<category::Model> {
    let category = state.services.categories.get_category(id).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    summary = "Create category",
    request_body = CategoryDraft,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<category::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<CategoryDraft>,
) -> Result<(StatusCode, Json<ApiResponse<category::Model>>), ServiceError> {
    user.require_admin()?;
    let category = state.services.categories.create_category(draft).await?;
    Ok(created_response(category))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    summary = "Update category",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryUpdate,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<category::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<CategoryUpdate>,
) -> ApiResult<category::Model> {
    user.require_admin()?;
    let category = state
        .services
        .categories
        .update_category(id, update)
        .await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    summary = "Delete category",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Category still has items", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    user.require_admin()?;
    state.services.categories.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
