//! Property-based tests for the booking arithmetic.
//!
//! Windows are generated as millisecond offsets from a fixed epoch so that
//! shrinking produces readable counterexamples.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use rental_api::services::rental_rules::{quote, ranges_overlap, rental_days};

const DAY_MS: i64 = 86_400_000;

fn at(offset_ms: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(offset_ms)
}

// Strategies for generating test data
fn window_strategy() -> impl Strategy<Value = (i64, i64)> {
    (0i64..60 * DAY_MS, 0i64..20 * DAY_MS).prop_map(|(start, len)| (start, start + len))
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// The three containment cases the storefront used to test one by one.
fn overlaps_by_cases(new: (i64, i64), existing: (i64, i64)) -> bool {
    let start_inside = new.0 >= existing.0 && new.0 <= existing.1;
    let end_inside = new.1 >= existing.0 && new.1 <= existing.1;
    let contains = new.0 <= existing.0 && new.1 >= existing.1;
    start_inside || end_inside || contains
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn overlap_matches_the_containment_cases(a in window_strategy(), b in window_strategy()) {
        prop_assert_eq!(
            ranges_overlap(at(a.0), at(a.1), at(b.0), at(b.1)),
            overlaps_by_cases(a, b)
        );
    }

    #[test]
    fn overlap_is_symmetric(a in window_strategy(), b in window_strategy()) {
        prop_assert_eq!(
            ranges_overlap(at(a.0), at(a.1), at(b.0), at(b.1)),
            ranges_overlap(at(b.0), at(b.1), at(a.0), at(a.1))
        );
    }

    #[test]
    fn every_window_overlaps_itself(a in window_strategy()) {
        prop_assert!(ranges_overlap(at(a.0), at(a.1), at(a.0), at(a.1)));
    }

    #[test]
    fn rental_days_round_up_and_never_drop_below_one((start, end) in window_strategy()) {
        let days = rental_days(at(start), at(end));
        prop_assert!(days >= 1);
        prop_assert!(days * DAY_MS >= end - start);
        if end - start > DAY_MS {
            prop_assert!((days - 1) * DAY_MS < end - start);
        }
    }

    #[test]
    fn deposit_is_half_the_total(
        prices in proptest::collection::vec((price_strategy(), 1i32..5), 1..6),
        (start, end) in window_strategy(),
    ) {
        let q = quote(prices.clone(), at(start), at(end)).expect("small prices never overflow");
        let expected: Decimal = prices
            .iter()
            .map(|(price, qty)| *price * Decimal::from(*qty))
            .sum::<Decimal>()
            * Decimal::from(q.rental_days);

        prop_assert_eq!(q.total_amount, expected);
        prop_assert_eq!(q.security_deposit * Decimal::TWO, q.total_amount);
        prop_assert!(q.total_amount >= Decimal::ZERO);
    }
}
