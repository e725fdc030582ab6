//! Property tests for the pure pieces: terms merging, business-day
//! arithmetic, and the message scanner.

use chrono::{Datelike, TimeZone, Utc, Weekday};
use dealroom_core::filter::ContactScanner;
use dealroom_core::signature::add_business_days;
use dealroom_core::terms::{Compensation, Terms, TermsDelta};
use proptest::prelude::*;

fn compensation() -> impl Strategy<Value = Compensation> {
    prop_oneof![
        (1u32..=1000).prop_map(|basis_points| Compensation::PercentageOfSale { basis_points }),
        (1u64..=100_000_000).prop_map(|amount_cents| Compensation::FlatFee { amount_cents }),
    ]
}

fn terms() -> impl Strategy<Value = Terms> {
    (compensation(), 1u32..=36, proptest::option::of("[a-z ]{0,40}")).prop_map(
        |(compensation, agreement_length_months, notes)| Terms {
            compensation,
            agreement_length_months,
            notes,
        },
    )
}

fn delta() -> impl Strategy<Value = TermsDelta> {
    (
        proptest::option::of(compensation()),
        proptest::option::of(1u32..=36),
        proptest::option::of("[a-z ]{0,40}"),
    )
        .prop_map(|(compensation, agreement_length_months, notes)| TermsDelta {
            compensation,
            agreement_length_months,
            notes,
        })
}

proptest! {
    #[test]
    fn merge_takes_delta_fields_and_keeps_the_rest(base in terms(), d in delta()) {
        let merged = d.merge(&base);

        match &d.compensation {
            Some(c) => prop_assert_eq!(&merged.compensation, c),
            None => prop_assert_eq!(&merged.compensation, &base.compensation),
        }
        match d.agreement_length_months {
            Some(m) => prop_assert_eq!(merged.agreement_length_months, m),
            None => prop_assert_eq!(merged.agreement_length_months, base.agreement_length_months),
        }
        match &d.notes {
            Some(n) => prop_assert_eq!(merged.notes.as_ref(), Some(n)),
            None => prop_assert_eq!(merged.notes.as_ref(), base.notes.as_ref()),
        }
    }

    #[test]
    fn merge_is_idempotent(base in terms(), d in delta()) {
        let once = d.merge(&base);
        let twice = d.merge(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn empty_delta_is_identity(base in terms()) {
        prop_assert_eq!(TermsDelta::default().merge(&base), base);
    }

    #[test]
    fn business_day_result_is_never_a_weekend(
        offset_days in 0i64..3650,
        days in 1u32..30,
    ) {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 9, 0, 0).unwrap()
            + chrono::Duration::days(offset_days);
        let end = add_business_days(start, days);
        prop_assert!(end > start);
        prop_assert!(!matches!(end.weekday(), Weekday::Sat | Weekday::Sun));
    }

    #[test]
    fn business_days_are_monotonic(
        offset_days in 0i64..3650,
        days in 0u32..29,
    ) {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 9, 0, 0).unwrap()
            + chrono::Duration::days(offset_days);
        prop_assert!(add_business_days(start, days + 1) > add_business_days(start, days));
    }

    #[test]
    fn scanner_never_panics(body in ".{0,200}") {
        let _ = ContactScanner::new().scan(&body);
    }

    #[test]
    fn plain_prose_is_clean(body in "[a-zA-Z ,.]{0,120}") {
        // No digits, no @: nothing for any pattern to match except the
        // obfuscated-email form, which needs both "at" and "dot" around
        // dotted tokens.
        prop_assume!(!body.to_lowercase().contains(" at "));
        prop_assert!(ContactScanner::new().is_clean(&body));
    }
}
