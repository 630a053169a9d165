//! Property-based tests for currency operations.
//!
//! - Property 1: Rate lookup never looks ahead
//! - Property 2: Local conversion rounding

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::Currency;

use super::conversion::convert_to_local;
use super::exchange::{ExchangeRateRow, pick_rate};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Strategy to generate rows on distinct day offsets with positive USD rates.
fn usd_rows() -> impl Strategy<Value = Vec<ExchangeRateRow>> {
    prop::collection::btree_map(0u64..120, 1i64..100_000i64, 0..20).prop_map(|rates| {
        rates
            .into_iter()
            .map(|(offset, rate)| {
                ExchangeRateRow::new(base_date() + Days::new(offset))
                    .with_rate(Currency::Usd, Decimal::new(rate, 4))
            })
            .collect()
    })
}

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive exchange rates (0.0001 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1.1: The picked row is dated on or before the query date and no
    /// other eligible row is more recent.
    #[test]
    fn prop_pick_is_most_recent_not_after(
        rows in usd_rows(),
        offset in 0u64..150,
    ) {
        let query = base_date() + Days::new(offset);
        let picked = pick_rate(&rows, Currency::Usd, query);

        let eligible: Vec<&ExchangeRateRow> = rows.iter().filter(|row| row.date <= query).collect();
        match picked {
            None => prop_assert!(eligible.is_empty()),
            Some((date, rate)) => {
                prop_assert!(date <= query);
                prop_assert!(eligible.iter().all(|row| row.date <= date));
                prop_assert_eq!(rows.iter().find(|row| row.date == date).and_then(|row| row.rate_for(Currency::Usd)), Some(rate));
            }
        }
    }

    /// Property 1.2: Input order does not change the picked rate.
    #[test]
    fn prop_pick_ignores_row_order(
        rows in usd_rows(),
        offset in 0u64..150,
    ) {
        let query = base_date() + Days::new(offset);
        let mut reversed = rows.clone();
        reversed.reverse();

        prop_assert_eq!(
            pick_rate(&rows, Currency::Usd, query),
            pick_rate(&reversed, Currency::Usd, query)
        );
    }

    /// Property 2.1: Local amounts have at most 2 decimal places.
    #[test]
    fn prop_local_amount_has_cents(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let local = convert_to_local(amount, rate);
        prop_assert!(local.scale() <= 2, "{} should have at most 2 decimal places", local);
    }

    /// Property 2.2: Rounding moves the value by at most half a cent.
    #[test]
    fn prop_rounding_error_bounded(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let exact = amount * rate;
        let local = convert_to_local(amount, rate);
        prop_assert!((exact - local).abs() <= Decimal::new(5, 3));
    }
}
