use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, TransactionTrait,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        booking, booking_item,
        status::{BookingStatus, ItemStatus, ItemType, PaymentStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog,
};

/// Item status change made as a side effect of a booking transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRelease {
    pub item_id: Uuid,
    pub item_type: ItemType,
    pub old_status: ItemStatus,
}

/// Whether a booking may move from `from` to `to`. Re-applying the current
/// status is allowed and changes nothing.
pub fn is_valid_transition(from: BookingStatus, to: BookingStatus) -> bool {
    match (from, to) {
        (BookingStatus::Active, BookingStatus::Completed) => true,
        (BookingStatus::Active, BookingStatus::Cancelled) => true,
        _ if from == to => true,
        _ => false,
    }
}

/// Booking lifecycle transitions and payment labels.
#[derive(Clone)]
pub struct BookingStatusService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl BookingStatusService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Moves a booking to `new_status` and syncs its items:
    ///
    /// * `completed` returns every item to `available`, whatever its state.
    /// * `cancelled` returns only items still `rented`; `cleaning` and `damaged`
    ///   items stay as they are.
    #[instrument(skip(self), fields(booking_id = %booking_id, new_status = %new_status))]
    pub async fn set_booking_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<booking::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            ServiceError::DatabaseError(e)
        })?;

        let (old_status, updated, releases) =
            match transition_in_txn(&txn, booking_id, new_status).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    if let Err(rollback_err) = txn.rollback().await {
                        error!(error = %rollback_err, "Failed to roll back status change");
                    }
                    return Err(e);
                }
            };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit booking status change");
            ServiceError::DatabaseError(e)
        })?;

        if old_status == new_status {
            return Ok(updated);
        }

        info!(
            old_status = %old_status,
            released_items = releases.len(),
            "Booking status updated"
        );

        if let Some(event_sender) = &self.event_sender {
            event_sender
                .send_or_log(Event::BookingStatusChanged {
                    booking_id,
                    old_status,
                    new_status,
                })
                .await;
            for release in &releases {
                event_sender
                    .send_or_log(Event::ItemStatusChanged {
                        item_id: release.item_id,
                        item_type: release.item_type,
                        old_status: release.old_status,
                        new_status: ItemStatus::Available,
                    })
                    .await;
            }
        }

        Ok(updated)
    }

    /// Updates the payment label. No money moves.
    #[instrument(skip(self), fields(booking_id = %booking_id, payment_status = %payment_status))]
    pub async fn set_payment_status(
        &self,
        booking_id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<booking::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = booking::Entity::find_by_id(booking_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

        let old_status = existing.payment_status;
        if old_status == payment_status {
            return Ok(existing);
        }

        let mut active: booking::ActiveModel = existing.into();
        active.payment_status = Set(payment_status);
        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, "Failed to update payment status");
            ServiceError::DatabaseError(e)
        })?;

        info!(old_status = %old_status, "Payment status updated");

        if let Some(event_sender) = &self.event_sender {
            event_sender
                .send_or_log(Event::PaymentStatusChanged {
                    booking_id,
                    old_status,
                    new_status: payment_status,
                })
                .await;
        }

        Ok(updated)
    }
}

async fn transition_in_txn(
    txn: &DatabaseTransaction,
    booking_id: Uuid,
    new_status: BookingStatus,
) -> Result<(BookingStatus, booking::Model, Vec<ItemRelease>), ServiceError> {
    let existing = booking::Entity::find_by_id(booking_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

    let old_status = existing.status;
    if !is_valid_transition(old_status, new_status) {
        warn!(old_status = %old_status, "Rejected booking status transition");
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot transition booking from '{}' to '{}'",
            old_status, new_status
        )));
    }
    if old_status == new_status {
        return Ok((old_status, existing, Vec::new()));
    }

    let mut active: booking::ActiveModel = existing.into();
    active.status = Set(new_status);
    let updated = active.update(txn).await.map_err(|e| {
        error!(error = %e, "Failed to update booking status");
        ServiceError::DatabaseError(e)
    })?;

    let lines = booking_item::Entity::find()
        .filter(booking_item::Column::BookingId.eq(booking_id))
        .all(txn)
        .await?;

    let mut releases = Vec::new();
    for line in lines {
        let Some(item) = catalog::find_item(txn, line.item_type, line.item_id).await? else {
            // the item was deleted from the catalog after the booking ended
            continue;
        };
        let release = match new_status {
            BookingStatus::Completed => item.status != ItemStatus::Available,
            BookingStatus::Cancelled => item.status == ItemStatus::Rented,
            BookingStatus::Active => false,
        };
        if release {
            catalog::update_item_status(txn, line.item_type, line.item_id, ItemStatus::Available)
                .await?;
            releases.push(ItemRelease {
                item_id: line.item_id,
                item_type: line.item_type,
                old_status: item.status,
            });
        }
    }

    Ok((old_status, updated, releases))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BookingStatus::Active, BookingStatus::Completed, true)]
    #[case(BookingStatus::Active, BookingStatus::Cancelled, true)]
    #[case(BookingStatus::Active, BookingStatus::Active, true)]
    #[case(BookingStatus::Completed, BookingStatus::Completed, true)]
    #[case(BookingStatus::Completed, BookingStatus::Active, false)]
    #[case(BookingStatus::Completed, BookingStatus::Cancelled, false)]
    #[case(BookingStatus::Cancelled, BookingStatus::Active, false)]
    #[case(BookingStatus::Cancelled, BookingStatus::Completed, false)]
    fn transitions(#[case] from: BookingStatus, #[case] to: BookingStatus, #[case] ok: bool) {
        assert_eq!(is_valid_transition(from, to), ok);
    }
}
