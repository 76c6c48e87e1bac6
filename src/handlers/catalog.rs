//! Costume and accessory endpoints. Both catalogs share one service; each route
//! pins the [`ItemType`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{created_response, page_number, paginated};
use crate::{
    auth::AuthUser,
    entities::status::{ItemStatus, ItemType},
    errors::ServiceError,
    services::catalog::{InventoryItem, ItemDraft, ItemFilter, ItemUpdate},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ItemListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category_id: Option<Uuid>,
    pub status: Option<ItemStatus>,
    /// Substring match on the item name
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemStatusRequest {
    pub status: ItemStatus,
}

type CreatedItem = (StatusCode, Json<ApiResponse<InventoryItem>>);

async fn list(
    state: AppState,
    item_type: ItemType,
    query: ItemListQuery,
) -> ApiResult<PaginatedResponse<InventoryItem>> {
    let page = page_number(query.page);
    let limit = state.config.page_size(query.limit);
    let filter = ItemFilter {
        category_id: query.category_id,
        status: query.status,
        search: query.search,
    };
    let (items, total) = state
        .services
        .catalog
        .list_items(item_type, filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

async fn get(state: AppState, item_type: ItemType, id: Uuid) -> ApiResult<InventoryItem> {
    let item = state.services.catalog.get_item(item_type, id).await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn create(
    state: AppState,
    user: AuthUser,
    item_type: ItemType,
    draft: ItemDraft,
) -> Result<CreatedItem, ServiceError> {
    user.require_admin()?;
    let item = state.services.catalog.create_item(item_type, draft).await?;
    Ok(created_response(item))
}

async fn update(
    state: AppState,
    user: AuthUser,
    item_type: ItemType,
    id: Uuid,
    update: ItemUpdate,
) -> ApiResult<InventoryItem> {
    user.require_admin()?;
    let item = state
        .services
        .catalog
        .update_item(item_type, id, update)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn set_status(
    state: AppState,
    user: AuthUser,
    item_type: ItemType,
    id: Uuid,
    status: ItemStatus,
) -> ApiResult<InventoryItem> {
    user.require_admin()?;
    let item = state
        .services
        .catalog
        .set_status(item_type, id, status)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn delete(
    state: AppState,
    user: AuthUser,
    item_type: ItemType,
    id: Uuid,
) -> Result<StatusCode, ServiceError> {
    user.require_admin()?;
    state.services.catalog.delete_item(item_type, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Costumes

#[utoipa::path(
    get,
    path = "/api/v1/costumes",
    summary = "List costumes",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Costumes retrieved", body = ApiResponse<PaginatedResponse<InventoryItem>>),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse),
    ),
    tag = "costumes"
)]
pub async fn list_costumes(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> ApiResult<PaginatedResponse<InventoryItem>> {
    list(state, ItemType::Costume, query).await
}

#[utoipa::path(
    get,
    path = "/api/v1/costumes/{id}",
    summary = "Get costume",
    params(("id" = Uuid, Path, description = "Costume ID")),
    responses(
        (status = 200, description = "Costume found", body = ApiResponse<InventoryItem>),
        (status = 404, description = "Costume not found", body = crate::errors::ErrorResponse),
    ),
    tag = "costumes"
)]
pub async fn get_costume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InventoryItem> {
    get(state, ItemType::Costume, id).await
}

#[utoipa::path(
    post,
    path = "/api/v1/costumes",
    summary = "Create costume",
    request_body = ItemDraft,
    responses(
        (status = 201, description = "Costume created", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "costumes"
)]
pub async fn create_costume(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<ItemDraft>,
) -> Result<CreatedItem, ServiceError> {
    create(state, user, ItemType::Costume, draft).await
}

#[utoipa::path(
    put,
    path = "/api/v1/costumes/{id}",
    summary = "Update costume",
    params(("id" = Uuid, Path, description = "Costume ID")),
    request_body = ItemUpdate,
    responses(
        (status = 200, description = "Costume updated", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Costume not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "costumes"
)]
pub async fn update_costume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ItemUpdate>,
) -> ApiResult<InventoryItem> {
    update(state, user, ItemType::Costume, id, body).await
}

#[utoipa::path(
    put,
    path = "/api/v1/costumes/{id}/status",
    summary = "Set costume status",
    description = "Direct admin edit, e.g. returning a costume from cleaning",
    params(("id" = Uuid, Path, description = "Costume ID")),
    request_body = ItemStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<InventoryItem>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Costume not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "costumes"
)]
pub async fn set_costume_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ItemStatusRequest>,
) -> ApiResult<InventoryItem> {
    set_status(state, user, ItemType::Costume, id, body.status).await
}

#[utoipa::path(
    delete,
    path = "/api/v1/costumes/{id}",
    summary = "Delete costume",
    params(("id" = Uuid, Path, description = "Costume ID")),
    responses(
        (status = 204, description = "Costume deleted"),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Costume not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Costume is on an active booking", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "costumes"
)]
pub async fn delete_costume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    delete(state, user, ItemType::Costume, id).await
}

// Accessories

#[utoipa::path(
    get,
    path = "/api/v1/accessories",
    summary = "List accessories",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Accessories retrieved", body = ApiResponse<PaginatedResponse<InventoryItem>>),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse),
    ),
    tag = "accessories"
)]
pub async fn list_accessories(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> ApiResult<PaginatedResponse<InventoryItem>> {
    list(state, ItemType::Accessory, query).await
}

#[utoipa::path(
    get,
    path = "/api/v1/accessories/{id}",
    summary = "Get accessory",
    params(("id" = Uuid, Path, description = "Accessory ID")),
    responses(
        (status = 200, description = "Accessory found", body = ApiResponse<InventoryItem>),
        (status = 404, description = "Accessory not found", body = crate::errors::ErrorResponse),
    ),
    tag = "accessories"
)]
pub async fn get_accessory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InventoryItem> {
    get(state, ItemType::Accessory, id).await
}

#[utoipa::path(
    post,
    path = "/api/v1/accessories",
    summary = "Create accessory",
    request_body = ItemDraft,
    responses(
        (status = 201, description = "Accessory created", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "accessories"
)]
pub async fn create_accessory(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<ItemDraft>,
) -> Result<CreatedItem, ServiceError> {
    create(state, user, ItemType::Accessory, draft).await
}

#[utoipa::path(
    put,
    path = "/api/v1/accessories/{id}",
    summary = "Update accessory",
    params(("id" = Uuid, Path, description = "Accessory ID")),
    request_body = ItemUpdate,
    responses(
        (status = 200, description = "Accessory updated", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Accessory not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "accessories"
)]
pub async fn update_accessory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ItemUpdate>,
) -> ApiResult<InventoryItem> {
    update(state, user, ItemType::Accessory, id, body).await
}

#[utoipa::path(
    put,
    path = "/api/v1/accessories/{id}/status",
    summary = "Set accessory status",
    params(("id" = Uuid, Path, description = "Accessory ID")),
    request_body = ItemStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<InventoryItem>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Accessory not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "accessories"
)]
pub async fn set_accessory_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ItemStatusRequest>,
) -> ApiResult<InventoryItem> {
    set_status(state, user, ItemType::Accessory, id, body.status).await
}

#[utoipa::path(
    delete,
    path = "/api/v1/accessories/{id}",
    summary = "Delete accessory",
    params(("id" = Uuid, Path, description = "Accessory ID")),
    responses(
        (status = 204, description = "Accessory deleted"),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Accessory not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Accessory is on an active booking", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "accessories"
)]
pub async fn delete_accessory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    delete(state, user, ItemType::Accessory, id).await
}
