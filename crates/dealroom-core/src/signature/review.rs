//! Attorney-review holds.
//!
//! Some governing states impose a mandatory attorney-review period after
//! both parties sign. Agreements governed by such a state divert to
//! `attorney_review_pending` for a business-day hold before auto-advancing
//! to `fully_signed`; everywhere else the agreement executes immediately.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// Default hold length, in business days.
pub const DEFAULT_HOLD_BUSINESS_DAYS: u32 = 3;

/// Which governing states require a hold, and for how long.
#[derive(Debug, Clone)]
pub struct ReviewHoldPolicy {
    states: HashSet<String>,
    hold_business_days: u32,
}

impl Default for ReviewHoldPolicy {
    fn default() -> Self {
        Self {
            states: HashSet::from(["NJ".to_string()]),
            hold_business_days: DEFAULT_HOLD_BUSINESS_DAYS,
        }
    }
}

impl ReviewHoldPolicy {
    /// Creates a policy for the given state codes and hold length.
    #[must_use]
    pub fn new(states: impl IntoIterator<Item = String>, hold_business_days: u32) -> Self {
        Self {
            states: states.into_iter().collect(),
            hold_business_days,
        }
    }

    /// Whether agreements governed by `state` take the review hold.
    #[must_use]
    pub fn requires_hold(&self, state: &str) -> bool {
        self.states.contains(state)
    }

    /// When a hold starting at `signed_at` ends.
    #[must_use]
    pub fn hold_end(&self, signed_at: DateTime<Utc>) -> DateTime<Utc> {
        add_business_days(signed_at, self.hold_business_days)
    }
}

/// Advances `start` by `days` business days, skipping Saturdays and
/// Sundays. A count of zero returns `start` unchanged, even on a weekend.
#[must_use]
pub fn add_business_days(start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let mut current = start;
    for _ in 0..days {
        current += Duration::days(1);
        while matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += Duration::days(1);
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_midweek_hold_stays_in_week() {
        // Monday + 3 business days = Thursday.
        assert_eq!(add_business_days(utc(2026, 3, 2), 3), utc(2026, 3, 5));
    }

    #[test]
    fn test_hold_skips_weekend() {
        // Friday + 3 business days = Wednesday.
        assert_eq!(add_business_days(utc(2026, 3, 6), 3), utc(2026, 3, 11));
    }

    #[test]
    fn test_weekend_signature_starts_monday() {
        // Saturday + 1 business day = Monday.
        assert_eq!(add_business_days(utc(2026, 3, 7), 1), utc(2026, 3, 9));
    }

    #[test]
    fn test_zero_days_is_identity() {
        let saturday = utc(2026, 3, 7);
        assert_eq!(add_business_days(saturday, 0), saturday);
    }

    #[test]
    fn test_policy_matches_configured_states() {
        let policy = ReviewHoldPolicy::default();
        assert!(policy.requires_hold("NJ"));
        assert!(!policy.requires_hold("TX"));
        assert!(!policy.requires_hold("nj"), "state codes are exact-match");
    }
}
