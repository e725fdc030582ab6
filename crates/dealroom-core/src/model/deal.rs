//! Deal entity: the investor's property opportunity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::terms::Terms;

/// Deal lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// Open for negotiation (or already locked to a winner).
    Active,
    /// Kept for the record but no longer negotiable.
    Archived,
    /// Abandoned or administratively purged.
    Voided,
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
            Self::Voided => write!(f, "voided"),
        }
    }
}

/// Location of the property under negotiation.
///
/// The street address and postal code are the sensitive half; the redaction
/// gate collapses a deal to city/state for agents without a fully signed
/// agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDetails {
    /// Street address, including unit.
    pub street_address: String,
    /// City.
    pub city: String,
    /// Two-letter state code. Also the governing state of generated
    /// agreements.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
}

/// Identity of the property's seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerIdentity {
    /// Seller's full name.
    pub name: String,
    /// Contact e-mail, if the investor provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone, if the investor provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The investor's property opportunity.
///
/// `locked_agent_id` and `locked_room_id` are either both `None` or both
/// `Some`. They are set exactly once, through
/// [`crate::store::EntityStore::try_lock_deal`], and cleared only by an
/// administrative unlock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Entity id.
    pub id: String,
    /// Owning investor.
    pub investor_id: String,
    /// Property location.
    pub property: PropertyDetails,
    /// Seller identity (redacted for unsigned agents).
    pub seller: SellerIdentity,
    /// The investor's currently proposed base terms.
    pub terms: Terms,
    /// Winning agent, once the deal is locked.
    pub locked_agent_id: Option<String>,
    /// Winning room, once the deal is locked.
    pub locked_room_id: Option<String>,
    /// Lifecycle status.
    pub status: DealStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// Creates an active, unlocked deal.
    #[must_use]
    pub fn new(
        investor_id: impl Into<String>,
        property: PropertyDetails,
        seller: SellerIdentity,
        terms: Terms,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            investor_id: investor_id.into(),
            property,
            seller,
            terms,
            locked_agent_id: None,
            locked_room_id: None,
            status: DealStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` once a winning room has been fixed.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked_room_id.is_some()
    }
}
