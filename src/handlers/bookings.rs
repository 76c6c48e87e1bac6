use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{created_response, page_number, paginated};
use crate::{
    auth::{AuthUser, MaybeAuthUser},
    entities::status::{BookingStatus, ItemType, PaymentStatus},
    errors::ServiceError,
    services::bookings::{
        BookingDraft, BookingFilter, BookingItemDraft, BookingResponse, BookingStatusFilter,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub item_id: Uuid,
    pub item_type: ItemType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub available: bool,
}

/// Booking details plus the requested items.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    #[serde(flatten)]
    pub booking: BookingDraft,
    pub items: Vec<BookingItemDraft>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BookingListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// `active`, `overdue`, `completed` or `cancelled`
    pub status: Option<BookingStatusFilter>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[utoipa::path(
    post,
    path = "/api/v1/availability",
    summary = "Check item availability",
    description = "Whether an item is available and has no active booking overlapping the window",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability decided", body = ApiResponse<AvailabilityResponse>),
        (status = 400, description = "Invalid date window", body = crate::errors::ErrorResponse),
    ),
    tag = "bookings"
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Json(request): Json<AvailabilityRequest>,
) -> ApiResult<AvailabilityResponse> {
    let available = state
        .services
        .bookings
        .check_availability(
            request.item_id,
            request.item_type,
            request.start_date,
            request.end_date,
        )
        .await?;
    Ok(Json(ApiResponse::success(AvailabilityResponse { available })))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    summary = "Create booking",
    description = "Guests may book without a token. Bookings made by a signed-in customer are \
                   linked to their account; bookings entered by an admin are not.",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = ApiResponse<BookingResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Payment status requires admin", body = crate::errors::ErrorResponse),
        (status = 409, description = "An item is not available", body = crate::errors::ErrorResponse),
    ),
    security((), ("Bearer" = [])),
    tag = "bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingResponse>>), ServiceError> {
    let is_admin = user.as_ref().is_some_and(AuthUser::is_admin);
    if !is_admin
        && request
            .booking
            .payment_status
            .is_some_and(|p| p != PaymentStatus::Pending)
    {
        return Err(ServiceError::Forbidden(
            "Only admins can record a payment status".to_string(),
        ));
    }

    let owner = user.filter(|u| !u.is_admin()).map(|u| u.user_id);
    let booking = state
        .services
        .bookings
        .create_booking(owner, request.booking, request.items)
        .await?;
    let response = state.services.bookings.get_booking(booking.id).await?;
    Ok(created_response(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    summary = "List bookings",
    params(BookingListQuery),
    responses(
        (status = 200, description = "Bookings retrieved", body = ApiResponse<PaginatedResponse<BookingResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "bookings"
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<PaginatedResponse<BookingResponse>> {
    user.require_admin()?;
    let page = page_number(query.page);
    let limit = state.config.page_size(query.limit);
    let filter = BookingFilter {
        status: query.status,
        user_id: None,
    };
    let (bookings, total) = state
        .services
        .bookings
        .list_bookings(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginated(
        bookings, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    summary = "Get booking",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking found", body = ApiResponse<BookingResponse>),
        (status = 403, description = "Not your booking", body = crate::errors::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingResponse> {
    let booking = state.services.bookings.get_booking(id).await?;
    if !user.can_access(booking.user_id) {
        return Err(ServiceError::Forbidden(
            "You do not have access to this booking".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(booking)))
}

#[utoipa::path(
    put,
    path = "/api/v1/bookings/{id}/status",
    summary = "Set booking status",
    description = "Admins may complete or cancel any booking. Customers may only cancel their own.",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = BookingStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<BookingResponse>),
        (status = 400, description = "Booking is already closed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "bookings"
)]
pub async fn set_booking_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<BookingStatusRequest>,
) -> ApiResult<BookingResponse> {
    if !user.is_admin() {
        let existing = state.services.bookings.get_booking(id).await?;
        if !user.can_access(existing.user_id) || body.status != BookingStatus::Cancelled {
            return Err(ServiceError::Forbidden(
                "Customers may only cancel their own bookings".to_string(),
            ));
        }
    }

    state
        .services
        .booking_status
        .set_booking_status(id, body.status)
        .await?;
    info!(booking_id = %id, user_id = %user.user_id, status = %body.status, "Booking status set via API");

    let booking = state.services.bookings.get_booking(id).await?;
    Ok(Json(ApiResponse::success(booking)))
}

#[utoipa::path(
    put,
    path = "/api/v1/bookings/{id}/payment-status",
    summary = "Set payment status",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = PaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated", body = ApiResponse<BookingResponse>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "bookings"
)]
pub async fn set_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentStatusRequest>,
) -> ApiResult<BookingResponse> {
    user.require_admin()?;
    state
        .services
        .booking_status
        .set_payment_status(id, body.payment_status)
        .await?;
    let booking = state.services.bookings.get_booking(id).await?;
    Ok(Json(ApiResponse::success(booking)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/bookings",
    summary = "List my bookings",
    params(BookingListQuery),
    responses(
        (status = 200, description = "Bookings retrieved", body = ApiResponse<PaginatedResponse<BookingResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "bookings"
)]
pub async fn list_my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<PaginatedResponse<BookingResponse>> {
    let page = page_number(query.page);
    let limit = state.config.page_size(query.limit);
    let (bookings, total) = state
        .services
        .bookings
        .list_user_bookings(user.user_id, query.status, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginated(
        bookings, total, page, limit,
    ))))
}
