use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which catalog a rentable item (or a category) belongs to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemType {
    #[sea_orm(string_value = "costume")]
    Costume,
    #[sea_orm(string_value = "accessory")]
    Accessory,
}

/// Physical state of a catalog item.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "rented")]
    Rented,
    #[sea_orm(string_value = "cleaning")]
    Cleaning,
    #[sea_orm(string_value = "damaged")]
    Damaged,
}

/// Persisted booking lifecycle state. `overdue` is never stored; see
/// [`crate::services::rental_rules::is_overdue`].
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

/// Payment label. No payment processing happens behind it.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// Status shown to readers: the stored status, or `overdue` for an active booking
/// past its end date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisplayStatus {
    Active,
    Overdue,
    Completed,
    Cancelled,
}

impl From<BookingStatus> for DisplayStatus {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Active => DisplayStatus::Active,
            BookingStatus::Completed => DisplayStatus::Completed,
            BookingStatus::Cancelled => DisplayStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn statuses_use_lowercase_wire_names() {
        assert_eq!(ItemStatus::Available.to_string(), "available");
        assert_eq!(BookingStatus::from_str("cancelled").ok(), Some(BookingStatus::Cancelled));
        assert_eq!(ItemType::from_str("accessory").ok(), Some(ItemType::Accessory));
        assert!(PaymentStatus::from_str("refund").is_err());
        assert_eq!(
            serde_json::to_string(&DisplayStatus::Overdue).unwrap(),
            "\"overdue\""
        );
    }

    #[test]
    fn only_completed_and_cancelled_are_terminal() {
        assert!(!BookingStatus::Active.is_terminal());
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }
}
