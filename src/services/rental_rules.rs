//! Pure booking arithmetic: window overlap, rental-day counting, pricing and the
//! derived `overdue` state. Nothing here touches the database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use validator::ValidationError;

use crate::entities::{
    booking,
    status::{BookingStatus, DisplayStatus},
};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Share of the rental total held as a security deposit.
pub const DEPOSIT_RATE: Decimal = dec!(0.5);

/// Largest amount the `decimal(12, 2)` money columns hold.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

/// Inclusive overlap of two booking windows. Windows that merely touch at an
/// endpoint still overlap.
pub fn ranges_overlap(
    start_a: DateTime<Utc>,
    end_a: DateTime<Utc>,
    start_b: DateTime<Utc>,
    end_b: DateTime<Utc>,
) -> bool {
    start_a <= end_b && start_b <= end_a
}

/// Whole days billed for a window: partial days round up, and every booking is
/// billed at least one day.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        return 1;
    }
    let days = millis / MILLIS_PER_DAY + i64::from(millis % MILLIS_PER_DAY != 0);
    days.max(1)
}

/// Price summary for a prospective booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub rental_days: i64,
    pub total_amount: Decimal,
    pub security_deposit: Decimal,
}

/// Prices `(price_per_day, quantity)` lines over a window. The deposit is exactly
/// half the total, so an odd-cent total yields a deposit with a third decimal place.
///
/// Returns `None` when the total does not fit in a `Decimal`.
pub fn quote<I>(lines: I, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Quote>
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let days = rental_days(start, end);
    let mut per_day = Decimal::ZERO;
    for (price, quantity) in lines {
        per_day = per_day.checked_add(price.checked_mul(Decimal::from(quantity))?)?;
    }
    let total_amount = per_day.checked_mul(Decimal::from(days))?;

    Some(Quote {
        rental_days: days,
        total_amount,
        security_deposit: total_amount * DEPOSIT_RATE,
    })
}

/// An active booking whose end date has passed. Completed and cancelled bookings
/// are never overdue.
pub fn is_overdue(booking: &booking::Model, now: DateTime<Utc>) -> bool {
    booking.status == BookingStatus::Active && booking.end_date < now
}

/// Status shown to readers of a booking at `now`.
pub fn display_status(booking: &booking::Model, now: DateTime<Utc>) -> DisplayStatus {
    if is_overdue(booking, now) {
        DisplayStatus::Overdue
    } else {
        booking.status.into()
    }
}

/// `validator` hook for money fields.
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// `validator` hook for catalog prices: non-negative, whole cents, and within
/// [`MAX_AMOUNT`].
pub fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(value)?;
    if value.normalize().scale() > 2 {
        let mut err = ValidationError::new("scale");
        err.message = Some("must have at most two decimal places".into());
        return Err(err);
    }
    if *value > MAX_AMOUNT {
        let mut err = ValidationError::new("max_amount");
        err.message = Some(format!("must not exceed {}", MAX_AMOUNT).into());
        return Err(err);
    }
    Ok(())
}
