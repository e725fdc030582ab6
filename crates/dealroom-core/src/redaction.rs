//! Redaction gate for sensitive deal fields.
//!
//! Agents must not learn the exact property address or the seller's
//! identity before their own room's agreement is fully executed. The gate
//! is a pure function over the deal, the room, and the viewer's role, and
//! is computed strictly per room: room A reaching full signature never
//! discloses anything to room B's agent.

use serde::{Deserialize, Serialize};

use crate::model::{Deal, ParticipantRole, Room};
use crate::terms::Terms;

/// The marker substituted for withheld seller fields.
pub const REDACTED_SENTINEL: &str = "[redacted]";

/// Property location as disclosed to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyView {
    /// Street address; absent until disclosure is permitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    /// City (always disclosed).
    pub city: String,
    /// State (always disclosed).
    pub state: String,
    /// Postal code; absent until disclosure is permitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// Seller identity as disclosed to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerView {
    /// Seller name, or [`REDACTED_SENTINEL`].
    pub name: String,
    /// Seller e-mail, or [`REDACTED_SENTINEL`] when one exists but may not
    /// be disclosed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Seller phone, with the same redaction behavior as `email`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A deal as visible to one viewer through one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedDealView {
    /// The deal id.
    pub deal_id: String,
    /// Whether sensitive fields were withheld from this view.
    pub redacted: bool,
    /// Property location.
    pub property: PropertyView,
    /// Seller identity.
    pub seller: SellerView,
    /// The room's effective terms (never sensitive).
    pub terms: Terms,
}

/// Computes the view of `deal` for `viewer` inside `room`.
///
/// Investors and operators always see the unredacted view. Agents see it
/// only once this specific room's agreement is fully signed.
#[must_use]
pub fn redact(deal: &Deal, room: &Room, viewer: ParticipantRole) -> RedactedDealView {
    let disclose = match viewer {
        ParticipantRole::Investor | ParticipantRole::Admin => true,
        ParticipantRole::Agent => room.is_fully_signed(),
    };

    if disclose {
        RedactedDealView {
            deal_id: deal.id.clone(),
            redacted: false,
            property: PropertyView {
                street_address: Some(deal.property.street_address.clone()),
                city: deal.property.city.clone(),
                state: deal.property.state.clone(),
                postal_code: Some(deal.property.postal_code.clone()),
            },
            seller: SellerView {
                name: deal.seller.name.clone(),
                email: deal.seller.email.clone(),
                phone: deal.seller.phone.clone(),
            },
            terms: room.terms.clone(),
        }
    } else {
        RedactedDealView {
            deal_id: deal.id.clone(),
            redacted: true,
            property: PropertyView {
                street_address: None,
                city: deal.property.city.clone(),
                state: deal.property.state.clone(),
                postal_code: None,
            },
            seller: SellerView {
                name: REDACTED_SENTINEL.to_string(),
                email: deal.seller.email.as_ref().map(|_| REDACTED_SENTINEL.to_string()),
                phone: deal.seller.phone.as_ref().map(|_| REDACTED_SENTINEL.to_string()),
            },
            terms: room.terms.clone(),
        }
    }
}
