//! Anti-circumvention message filter.
//!
//! Until a room's agreement is fully signed, parties must not exchange
//! direct contact details through the platform. [`ContactScanner::scan`]
//! detects e-mail addresses, phone numbers in the common US and
//! international formats, and social-handle tokens. Callers reject a
//! message on any violation and record only the offending categories,
//! never the message body.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A category of blocked contact information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    /// An e-mail address.
    Email,
    /// A phone number.
    PhoneNumber,
    /// A social-media handle or profile link.
    SocialHandle,
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::PhoneNumber => write!(f, "phone_number"),
            Self::SocialHandle => write!(f, "social_handle"),
        }
    }
}

/// One detected violation.
///
/// Deliberately carries no excerpt of the matched text: audit entries built
/// from violations must never leak the contact details they blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// What was detected.
    pub category: ViolationCategory,
    /// How many matches of this category were found.
    pub count: usize,
}

struct ContactPattern {
    category: ViolationCategory,
    regex: Regex,
}

impl ContactPattern {
    fn new(category: ViolationCategory, pattern: &str) -> Self {
        Self {
            category,
            regex: Regex::new(pattern).expect("invalid contact pattern"),
        }
    }
}

/// Patterns for contact-information exchange.
///
/// Phone patterns require separators or a leading `+`/`(` so that plain
/// large numbers (prices, square footage) do not trip the filter.
static CONTACT_PATTERNS: LazyLock<Vec<ContactPattern>> = LazyLock::new(|| {
    vec![
        ContactPattern::new(
            ViolationCategory::Email,
            r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}",
        ),
        // Obfuscated e-mail: "name at domain dot com".
        ContactPattern::new(
            ViolationCategory::Email,
            r"(?i)\b[a-z0-9._%+\-]+\s+(?:at|\(at\)|\[at\])\s+[a-z0-9.\-]+\s+(?:dot|\(dot\)|\[dot\])\s+[a-z]{2,}\b",
        ),
        // 555-123-4567, 555.123.4567, 555 123 4567
        ContactPattern::new(
            ViolationCategory::PhoneNumber,
            r"\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b",
        ),
        // (555) 123-4567
        ContactPattern::new(
            ViolationCategory::PhoneNumber,
            r"\(\d{3}\)\s*\d{3}[-.\s]?\d{4}",
        ),
        // +1 555 123 4567 and bare international +44 20 7946 0958
        ContactPattern::new(
            ViolationCategory::PhoneNumber,
            r"\+\d{1,3}[-.\s]?\(?\d{1,4}\)?(?:[-.\s]?\d{2,4}){2,3}",
        ),
        // @handle (not part of an e-mail, handled by match offsets below)
        ContactPattern::new(
            ViolationCategory::SocialHandle,
            r"(?:^|[^A-Za-z0-9._%+\-])@[A-Za-z0-9_.]{3,30}\b",
        ),
        // "ig: name", "insta - name"; bare "@name" is caught above.
        ContactPattern::new(
            ViolationCategory::SocialHandle,
            r"(?i)\b(?:ig|insta|instagram)\s*[:\-]\s*@?[a-z0-9_.]{3,30}\b",
        ),
        ContactPattern::new(
            ViolationCategory::SocialHandle,
            r"(?i)\b(?:instagram\.com|facebook\.com|fb\.com|t\.me|wa\.me|linkedin\.com/in)/[a-z0-9_.\-]+",
        ),
        ContactPattern::new(
            ViolationCategory::SocialHandle,
            r"(?i)\b(?:telegram|whatsapp|signal)\s*[:\-]\s*\S+",
        ),
    ]
});

/// Scans message bodies for contact-information exchange.
#[derive(Debug, Clone, Default)]
pub struct ContactScanner;

impl ContactScanner {
    /// Creates a scanner with the built-in pattern set.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Scans a message body. Returns one [`Violation`] per detected
    /// category, ordered by category; an empty list means the message is
    /// clean.
    #[must_use]
    pub fn scan(&self, body: &str) -> Vec<Violation> {
        let mut counts = std::collections::BTreeMap::new();
        for pattern in CONTACT_PATTERNS.iter() {
            let found = pattern.regex.find_iter(body).count();
            if found > 0 {
                *counts.entry(pattern.category).or_insert(0usize) += found;
            }
        }
        counts
            .into_iter()
            .map(|(category, count)| Violation { category, count })
            .collect()
    }

    /// Convenience predicate: `true` if the body contains any violation.
    #[must_use]
    pub fn is_clean(&self, body: &str) -> bool {
        self.scan(body).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(body: &str) -> Vec<ViolationCategory> {
        ContactScanner::new()
            .scan(body)
            .into_iter()
            .map(|v| v.category)
            .collect()
    }

    #[test]
    fn test_clean_message() {
        assert!(ContactScanner::new().is_clean(
            "The list price is $450,000 and the property is 2,400 sq ft. \
             Can you do 2.25% if we extend to 9 months?"
        ));
    }

    #[test]
    fn test_email_detected() {
        assert_eq!(
            categories("reach me at jane.doe+deals@example.com any time"),
            vec![ViolationCategory::Email]
        );
    }

    #[test]
    fn test_obfuscated_email_detected() {
        assert_eq!(
            categories("write to jane dot doe at example dot com"),
            vec![ViolationCategory::Email]
        );
    }

    #[test]
    fn test_dashed_phone_detected() {
        assert_eq!(
            categories("call 555-123-4567 after 5"),
            vec![ViolationCategory::PhoneNumber]
        );
    }

    #[test]
    fn test_dotted_and_spaced_phone_detected() {
        assert_eq!(
            categories("555.123.4567 or 555 123 4567"),
            vec![ViolationCategory::PhoneNumber]
        );
    }

    #[test]
    fn test_parenthesized_phone_detected() {
        assert_eq!(
            categories("my cell is (555) 123-4567"),
            vec![ViolationCategory::PhoneNumber]
        );
    }

    #[test]
    fn test_international_phone_detected() {
        assert_eq!(
            categories("ring +44 20 7946 0958"),
            vec![ViolationCategory::PhoneNumber]
        );
    }

    #[test]
    fn test_handle_detected() {
        assert_eq!(
            categories("find me, I'm @dealmaker_99"),
            vec![ViolationCategory::SocialHandle]
        );
    }

    #[test]
    fn test_instagram_link_detected() {
        assert_eq!(
            categories("instagram.com/dealmaker99 has my listings"),
            vec![ViolationCategory::SocialHandle]
        );
    }

    #[test]
    fn test_messenger_hint_detected() {
        assert_eq!(
            categories("telegram: dealmaker99"),
            vec![ViolationCategory::SocialHandle]
        );
    }

    #[test]
    fn test_email_not_double_counted_as_handle() {
        assert_eq!(
            categories("jane@example.com"),
            vec![ViolationCategory::Email]
        );
    }

    #[test]
    fn test_multiple_categories_reported_once_each() {
        let violations = ContactScanner::new()
            .scan("email jane@example.com or call 555-123-4567 / 555.987.6543");
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].category, ViolationCategory::Email);
        assert_eq!(violations[0].count, 1);
        assert_eq!(violations[1].category, ViolationCategory::PhoneNumber);
        assert_eq!(violations[1].count, 2);
    }

    #[test]
    fn test_price_is_not_a_phone_number() {
        assert!(ContactScanner::new().is_clean("asking 4501234567 is a lot"));
    }
}
