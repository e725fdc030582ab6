//! Entity model for the negotiation engine.
//!
//! These are the records the engine reads and writes through the
//! [`crate::store::EntityStore`] seam. Persistence itself is an external
//! collaborator; this module only defines shapes, status alphabets, and the
//! transition predicates the components rely on.
//!
//! # Entities
//!
//! - [`Deal`]: the investor's property opportunity, including the lock refs
//! - [`Room`]: one isolated investor/agent negotiation channel
//! - [`CounterOffer`]: a proposed terms change within one scope
//! - [`AgreementVersion`]: an immutable, hashed contract snapshot
//! - [`ActivityEntry`]: append-only audit record of a state transition

mod activity;
mod agreement;
mod counter;
mod deal;
mod room;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use activity::ActivityEntry;
pub use agreement::{AgreementStatus, AgreementVersion, SignatureBlock, SignerMode};
pub use counter::{CounterOffer, CounterStatus};
pub use deal::{Deal, DealStatus, PropertyDetails, SellerIdentity};
pub use room::{RequestStatus, Room};

/// Mints a fresh entity id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A viewer or actor identity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// The investor who owns the deal.
    Investor,
    /// A candidate agent negotiating in one room.
    Agent,
    /// Operator identity, used only for administrative overrides.
    Admin,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Investor => write!(f, "investor"),
            Self::Agent => write!(f, "agent"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// One of the two negotiating parties. Counter-offers and signatures are
/// always exchanged between exactly these two roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// The deal-owning investor.
    Investor,
    /// The room's candidate agent.
    Agent,
}

impl PartyRole {
    /// The counterparty of this role.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Investor => Self::Agent,
            Self::Agent => Self::Investor,
        }
    }
}

impl From<PartyRole> for ParticipantRole {
    fn from(role: PartyRole) -> Self {
        match role {
            PartyRole::Investor => Self::Investor,
            PartyRole::Agent => Self::Agent,
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Investor => write!(f, "investor"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// The scope a counter-offer or agreement version is negotiated under.
///
/// New records are always room-scoped. The deal variant exists for data
/// migrated from before rooms were introduced and is accepted read-side
/// only where a single live room makes it unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NegotiationScope {
    /// Scoped to one room (the normal case).
    Room(String),
    /// Legacy deal-wide scope.
    Deal(String),
}

impl NegotiationScope {
    /// The room id, when room-scoped.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::Room(id) => Some(id),
            Self::Deal(_) => None,
        }
    }
}

impl fmt::Display for NegotiationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(id) => write!(f, "room:{id}"),
            Self::Deal(id) => write!(f, "deal:{id}"),
        }
    }
}
