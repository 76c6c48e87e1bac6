use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    db::{self, DbPool},
    entities::{
        booking, booking_item,
        status::{BookingStatus, DisplayStatus, ItemStatus, ItemType, PaymentStatus},
    },
    errors::{format_validation_errors, ServiceError},
    events::{Event, EventSender},
    services::{
        catalog::{self, InventoryItem},
        rental_rules::{self, validate_amount, validate_non_negative},
    },
};

fn validate_window(draft: &BookingDraft) -> Result<(), ValidationError> {
    if draft.end_date <= draft.start_date {
        let mut err = ValidationError::new("date_range");
        err.message = Some("end_date must be after start_date".into());
        return Err(err);
    }
    Ok(())
}

/// Customer and window details of a booking request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_window", skip_on_field_errors = false))]
pub struct BookingDraft {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub customer_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub customer_email: String,
    #[validate(length(max = 50))]
    pub customer_phone: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Ignored in favour of the server-side computation when present.
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub total_amount: Option<Decimal>,
    /// Ignored in favour of the server-side computation when present.
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>)]
    pub security_deposit: Option<Decimal>,
    /// Defaults to `active`, the only status a booking can start in.
    pub status: Option<BookingStatus>,
    /// Defaults to `pending`. Point-of-sale bookings may arrive already `paid`.
    pub payment_status: Option<PaymentStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// One requested line of a booking.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookingItemDraft {
    pub item_type: ItemType,
    pub item_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub item_name: String,
    #[validate(length(min = 1, max = 50))]
    pub size: Option<String>,
    #[validate(custom = "validate_amount")]
    #[schema(value_type = String, example = "25.00")]
    pub price_per_day: Decimal,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingItemResponse {
    pub id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub item_name: String,
    pub size: Option<String>,
    #[schema(value_type = String)]
    pub price_per_day: Decimal,
    pub quantity: i32,
}

impl From<booking_item::Model> for BookingItemResponse {
    fn from(model: booking_item::Model) -> Self {
        Self {
            id: model.id,
            item_type: model.item_type,
            item_id: model.item_id,
            item_name: model.item_name,
            size: model.size,
            price_per_day: model.price_per_day,
            quantity: model.quantity,
        }
    }
}

/// A booking with its lines and the status derived at read time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingResponse {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[schema(value_type = String, example = "60.00")]
    pub total_amount: Decimal,
    #[schema(value_type = String, example = "30.00")]
    pub security_deposit: Decimal,
    /// Stored lifecycle status
    pub status: BookingStatus,
    /// `overdue` for an active booking past its end date, otherwise `status`
    pub display_status: DisplayStatus,
    pub is_overdue: bool,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub items: Vec<BookingItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingResponse {
    pub fn from_parts(
        booking: booking::Model,
        items: Vec<booking_item::Model>,
        now: DateTime<Utc>,
    ) -> Self {
        let is_overdue = rental_rules::is_overdue(&booking, now);
        let display_status = rental_rules::display_status(&booking, now);
        Self {
            id: booking.id,
            user_id: booking.user_id,
            customer_name: booking.customer_name,
            customer_email: booking.customer_email,
            customer_phone: booking.customer_phone,
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_amount: booking.total_amount,
            security_deposit: booking.security_deposit,
            status: booking.status,
            display_status,
            is_overdue,
            payment_status: booking.payment_status,
            notes: booking.notes,
            items: items.into_iter().map(BookingItemResponse::from).collect(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// Filter for booking lists. `Overdue` selects active bookings past their end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatusFilter {
    Active,
    Overdue,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatusFilter>,
    pub user_id: Option<Uuid>,
}

/// Availability decisions, booking creation and booking reads.
#[derive(Clone)]
pub struct BookingService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

/// Whether `item` can be rented over `[start, end]`: it must exist, be
/// `available`, and no active booking of it may overlap the window.
pub async fn is_item_available<C>(
    conn: &C,
    item_type: ItemType,
    item_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let item = catalog::find_item(conn, item_type, item_id).await?;
    Ok(rentable(conn, item, item_type, item_id, start, end)
        .await?
        .is_some())
}

/// Hands `item` back when it passes the availability rules for `[start, end]`.
async fn rentable<C>(
    conn: &C,
    item: Option<InventoryItem>,
    item_type: ItemType,
    item_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<InventoryItem>, ServiceError>
where
    C: ConnectionTrait,
{
    let Some(item) = item else {
        debug!(item_id = %item_id, "Item does not exist");
        return Ok(None);
    };
    if !item.is_available() {
        debug!(item_id = %item_id, status = %item.status, "Item is not in the available state");
        return Ok(None);
    }

    let overlapping = catalog::active_bookings_for_item(conn, item_type, item_id)
        .await?
        .into_iter()
        .find(|b| rental_rules::ranges_overlap(start, end, b.start_date, b.end_date));

    if let Some(existing) = overlapping {
        debug!(item_id = %item_id, booking_id = %existing.id, "Window overlaps an active booking");
        return Ok(None);
    }
    Ok(Some(item))
}

/// A booking that lost a lock race to a concurrent one is reported like any
/// other unavailable item.
fn contention_as_unavailable(err: ServiceError) -> ServiceError {
    match err {
        ServiceError::DatabaseError(e) if db::is_lock_contention(&e) => {
            warn!(error = %e, "Booking lost a lock race to a concurrent booking");
            ServiceError::Unavailable(
                "The requested items are not available for the requested dates".to_string(),
            )
        }
        other => other,
    }
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ServiceError> {
    if end <= start {
        return Err(ServiceError::ValidationError(
            "end_date must be after start_date".to_string(),
        ));
    }
    Ok(())
}

/// Collects every field-level problem of a booking request into one error.
fn validate_request(draft: &BookingDraft, items: &[BookingItemDraft]) -> Result<(), ServiceError> {
    let mut messages = Vec::new();

    if let Err(errors) = draft.validate() {
        messages.extend(format_validation_errors(&errors));
    }
    if let Some(status) = draft.status {
        if status != BookingStatus::Active {
            messages.push(format!("status: a new booking cannot start as {}", status));
        }
    }

    if items.is_empty() {
        messages.push("items: at least one item is required".to_string());
    }
    let mut seen = HashSet::new();
    for (index, item) in items.iter().enumerate() {
        if let Err(errors) = item.validate() {
            messages.extend(
                format_validation_errors(&errors)
                    .into_iter()
                    .map(|m| format!("items[{}].{}", index, m)),
            );
        }
        if !seen.insert((item.item_type, item.item_id)) {
            messages.push(format!(
                "items[{}].item_id: {} is listed more than once",
                index, item.item_name
            ));
        }
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(messages.join("; ")))
    }
}

impl BookingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Whether an item can be rented for the window. Unknown items and items
    /// that are not `available` yield `false`.
    #[instrument(skip(self), fields(item_id = %item_id, item_type = %item_type))]
    pub async fn check_availability(
        &self,
        item_id: Uuid,
        item_type: ItemType,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        check_window(start_date, end_date)?;
        is_item_available(&*self.db_pool, item_type, item_id, start_date, end_date).await
    }

    /// Creates a booking and marks every referenced item as rented.
    ///
    /// Availability checks and all writes share one transaction: if any item is
    /// unavailable nothing is written. Item rows are locked for the length of the
    /// transaction, so of two concurrent requests for overlapping windows exactly
    /// one succeeds and the other fails with [`ServiceError::Unavailable`].
    #[instrument(skip(self, draft, items), fields(customer_email = %draft.customer_email, item_count = items.len()))]
    pub async fn create_booking(
        &self,
        user_id: Option<Uuid>,
        draft: BookingDraft,
        items: Vec<BookingItemDraft>,
    ) -> Result<booking::Model, ServiceError> {
        validate_request(&draft, &items)?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for booking creation");
            ServiceError::DatabaseError(e)
        })?;

        let (booking, lines) = match insert_booking(&txn, user_id, draft, &items).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back booking creation");
                }
                return Err(contention_as_unavailable(e));
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, booking_id = %booking.id, "Failed to commit booking creation");
            contention_as_unavailable(ServiceError::DatabaseError(e))
        })?;

        info!(
            booking_id = %booking.id,
            total_amount = %booking.total_amount,
            "Booking created"
        );

        if let Some(event_sender) = &self.event_sender {
            event_sender
                .send_or_log(Event::BookingCreated {
                    booking_id: booking.id,
                    item_count: lines.len(),
                    start_date: booking.start_date,
                    end_date: booking.end_date,
                })
                .await;
            for line in &lines {
                event_sender
                    .send_or_log(Event::ItemStatusChanged {
                        item_id: line.item_id,
                        item_type: line.item_type,
                        old_status: ItemStatus::Available,
                        new_status: ItemStatus::Rented,
                    })
                    .await;
            }
        }

        Ok(booking)
    }

    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn get_booking(&self, booking_id: Uuid) -> Result<BookingResponse, ServiceError> {
        let db = &*self.db_pool;
        let booking = booking::Entity::find_by_id(booking_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

        let items = booking_item::Entity::find()
            .filter(booking_item::Column::BookingId.eq(booking_id))
            .order_by_asc(booking_item::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(BookingResponse::from_parts(booking, items, Utc::now()))
    }

    /// Lists bookings newest first with their items. `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn list_bookings(
        &self,
        filter: BookingFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<BookingResponse>, u64), ServiceError> {
        let db = &*self.db_pool;
        let page = page.max(1);
        let per_page = per_page.max(1);
        let now = Utc::now();

        let mut query = booking::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(booking::Column::UserId.eq(user_id));
        }
        query = match filter.status {
            None => query,
            Some(BookingStatusFilter::Active) | Some(BookingStatusFilter::Overdue) => {
                query.filter(booking::Column::Status.eq(BookingStatus::Active))
            }
            Some(BookingStatusFilter::Completed) => {
                query.filter(booking::Column::Status.eq(BookingStatus::Completed))
            }
            Some(BookingStatusFilter::Cancelled) => {
                query.filter(booking::Column::Status.eq(BookingStatus::Cancelled))
            }
        };
        let query = query.order_by_desc(booking::Column::CreatedAt);

        let (bookings, total) = if filter.status == Some(BookingStatusFilter::Overdue) {
            // derived state, so the page is cut after filtering in memory
            let overdue: Vec<booking::Model> = query
                .all(db)
                .await?
                .into_iter()
                .filter(|b| rental_rules::is_overdue(b, now))
                .collect();
            let total = overdue.len() as u64;
            let page_rows = overdue
                .into_iter()
                .skip(((page - 1) * per_page) as usize)
                .take(per_page as usize)
                .collect();
            (page_rows, total)
        } else {
            let paginator = query.paginate(db, per_page);
            let total = paginator.num_items().await?;
            (paginator.fetch_page(page - 1).await?, total)
        };

        let responses = self.attach_items(bookings, now).await?;
        Ok((responses, total))
    }

    /// Bookings owned by one account.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_user_bookings(
        &self,
        user_id: Uuid,
        status: Option<BookingStatusFilter>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<BookingResponse>, u64), ServiceError> {
        self.list_bookings(
            BookingFilter {
                status,
                user_id: Some(user_id),
            },
            page,
            per_page,
        )
        .await
    }

    async fn attach_items(
        &self,
        bookings: Vec<booking::Model>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingResponse>, ServiceError> {
        if bookings.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
        let mut lines = booking_item::Entity::find()
            .filter(booking_item::Column::BookingId.is_in(ids))
            .order_by_asc(booking_item::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let (own, rest): (Vec<_>, Vec<_>) =
                    lines.drain(..).partition(|line| line.booking_id == booking.id);
                lines = rest;
                BookingResponse::from_parts(booking, own, now)
            })
            .collect())
    }
}

/// Transaction body of [`BookingService::create_booking`].
async fn insert_booking(
    txn: &DatabaseTransaction,
    user_id: Option<Uuid>,
    draft: BookingDraft,
    items: &[BookingItemDraft],
) -> Result<(booking::Model, Vec<booking_item::Model>), ServiceError> {
    // rows are locked in item id order so bookings sharing items cannot deadlock
    let mut lock_order: Vec<usize> = (0..items.len()).collect();
    lock_order.sort_by_key(|&index| items[index].item_id);

    let mut locked: Vec<Option<InventoryItem>> = vec![None; items.len()];
    for index in lock_order {
        let requested = &items[index];
        let item = catalog::lock_item(txn, requested.item_type, requested.item_id).await?;
        let Some(item) = rentable(
            txn,
            item,
            requested.item_type,
            requested.item_id,
            draft.start_date,
            draft.end_date,
        )
        .await?
        else {
            warn!(item_id = %requested.item_id, "Booking rejected: item unavailable");
            return Err(ServiceError::Unavailable(format!(
                "{} is not available for the requested dates",
                requested.item_name
            )));
        };

        if !item.offers_size(requested.size.as_deref()) {
            return Err(ServiceError::ValidationError(format!(
                "size: {} is not offered in size {}",
                item.name,
                requested.size.as_deref().unwrap_or_default()
            )));
        }
        locked[index] = Some(item);
    }
    let catalog_items: Vec<InventoryItem> = locked.into_iter().flatten().collect();

    let quote = rental_rules::quote(
        catalog_items
            .iter()
            .zip(items)
            .map(|(item, requested)| (item.price_per_day, requested.quantity)),
        draft.start_date,
        draft.end_date,
    )
    .filter(|quote| quote.total_amount <= rental_rules::MAX_AMOUNT)
    .ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "total_amount: the booking total exceeds {}",
            rental_rules::MAX_AMOUNT
        ))
    })?;

    let booking = booking::ActiveModel {
        user_id: Set(user_id),
        customer_name: Set(draft.customer_name),
        customer_email: Set(draft.customer_email),
        customer_phone: Set(draft.customer_phone),
        start_date: Set(draft.start_date),
        end_date: Set(draft.end_date),
        total_amount: Set(quote.total_amount),
        security_deposit: Set(quote.security_deposit),
        status: Set(BookingStatus::Active),
        payment_status: Set(draft.payment_status.unwrap_or(PaymentStatus::Pending)),
        notes: Set(draft.notes),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert booking");
        ServiceError::DatabaseError(e)
    })?;

    let mut lines = Vec::with_capacity(items.len());
    for (item, requested) in catalog_items.iter().zip(items) {
        let line = booking_item::ActiveModel {
            booking_id: Set(booking.id),
            item_type: Set(item.item_type),
            item_id: Set(item.id),
            item_name: Set(item.name.clone()),
            size: Set(requested.size.clone()),
            price_per_day: Set(item.price_per_day),
            quantity: Set(requested.quantity),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(|e| {
            error!(error = %e, booking_id = %booking.id, "Failed to insert booking item");
            ServiceError::DatabaseError(e)
        })?;
        lines.push(line);

        catalog::update_item_status(txn, item.item_type, item.id, ItemStatus::Rented).await?;
    }

    Ok((booking, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn draft(start: DateTime<Utc>, end: DateTime<Utc>) -> BookingDraft {
        BookingDraft {
            customer_name: "Gomez Addams".into(),
            customer_email: "gomez@example.com".into(),
            customer_phone: None,
            start_date: start,
            end_date: end,
            total_amount: None,
            security_deposit: None,
            status: None,
            payment_status: None,
            notes: None,
        }
    }

    fn line(quantity: i32) -> BookingItemDraft {
        BookingItemDraft {
            item_type: ItemType::Costume,
            item_id: Uuid::new_v4(),
            item_name: "Pinstripe Suit".into(),
            size: None,
            price_per_day: dec!(10),
            quantity,
        }
    }

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn request_with_valid_fields_passes() {
        assert!(validate_request(&draft(jan(1), jan(4)), &[line(2)]).is_ok());
    }

    #[test]
    fn reversed_window_is_rejected() {
        let err = validate_request(&draft(jan(4), jan(1)), &[line(1)]).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("end_date must be after start_date"));
    }

    #[test]
    fn item_errors_are_reported_with_their_index() {
        let mut bad = line(0);
        bad.price_per_day = dec!(-5);
        let err = validate_request(&draft(jan(1), jan(2)), &[line(1), bad]).unwrap_err();
        let ServiceError::ValidationError(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("items[1].quantity: must be between 1 and 1000"), "{msg}");
        assert!(msg.contains("items[1].price_per_day: must not be negative"), "{msg}");
    }

    #[test]
    fn oversized_lines_are_rejected_before_pricing() {
        let mut bulk = line(i32::MAX);
        bulk.price_per_day = dec!(10.001);
        let err = validate_request(&draft(jan(1), jan(2)), &[bulk]).unwrap_err();
        let ServiceError::ValidationError(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("items[0].quantity: must be between 1 and 1000"), "{msg}");
        assert!(msg.contains("items[0].price_per_day: must have at most two decimal places"), "{msg}");
    }

    #[test]
    fn empty_and_duplicate_item_lists_are_rejected() {
        let err = validate_request(&draft(jan(1), jan(2)), &[]).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("at least one item"));

        let item = line(1);
        let err = validate_request(&draft(jan(1), jan(2)), &[item.clone(), item]).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("more than once"));
    }

    #[test]
    fn bookings_cannot_start_in_a_terminal_status() {
        let mut d = draft(jan(1), jan(2));
        d.status = Some(BookingStatus::Completed);
        assert_matches!(
            validate_request(&d, &[line(1)]),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn missing_customer_fields_are_reported() {
        let mut d = draft(jan(1), jan(2));
        d.customer_name = String::new();
        d.customer_email = "not-an-email".into();
        let err = validate_request(&d, &[line(1)]).unwrap_err();
        let ServiceError::ValidationError(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("customer_name: is required"), "{msg}");
        assert!(msg.contains("customer_email: must be a valid email address"), "{msg}");
    }

    #[test]
    fn response_derives_overdue_from_end_date() {
        let now = Utc::now();
        let booking = booking::Model {
            id: Uuid::new_v4(),
            user_id: None,
            customer_name: "Wednesday".into(),
            customer_email: "wednesday@example.com".into(),
            customer_phone: None,
            start_date: now - Duration::days(5),
            end_date: now - Duration::days(1),
            total_amount: dec!(40),
            security_deposit: dec!(20),
            status: BookingStatus::Active,
            payment_status: PaymentStatus::Paid,
            notes: None,
            created_at: now - Duration::days(6),
            updated_at: now - Duration::days(6),
        };
        let response = BookingResponse::from_parts(booking, vec![], now);
        assert!(response.is_overdue);
        assert_eq!(response.display_status, DisplayStatus::Overdue);
        assert_eq!(response.status, BookingStatus::Active);
    }
}
