//! Room entity: one isolated investor/agent negotiation channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agreement::AgreementStatus;
use super::new_id;
use crate::terms::Terms;

/// Room request lifecycle.
///
/// At most one room exists per (deal, agent) pair, and exactly one room per
/// deal may ever reach [`RequestStatus::Locked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Agent requested to negotiate; investor has not responded.
    Requested,
    /// Investor accepted; negotiation is open.
    Accepted,
    /// Investor declined the agent.
    Rejected,
    /// This room won the deal.
    Locked,
    /// A sibling room won; this room is closed.
    Expired,
    /// Room (or its whole deal) was voided.
    Voided,
}

impl RequestStatus {
    /// Whether the room can still exchange counter-offers and signatures.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Requested | Self::Accepted)
    }

    /// Whether this status can never change again (other than by purge).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Locked | Self::Expired | Self::Voided)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Locked => write!(f, "locked"),
            Self::Expired => write!(f, "expired"),
            Self::Voided => write!(f, "voided"),
        }
    }
}

/// One isolated negotiation channel between a deal's investor and exactly
/// one candidate agent.
///
/// `agreement_status` mirrors the status of the version pointed to by
/// `current_agreement_id`, so the redaction gate and the message filter can
/// consult the room without a second read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Entity id.
    pub id: String,
    /// The deal this room negotiates.
    pub deal_id: String,
    /// The deal's investor.
    pub investor_id: String,
    /// The candidate agent on the other side.
    pub agent_id: String,
    /// Request lifecycle status.
    pub request_status: RequestStatus,
    /// Mirror of the current agreement version's status.
    pub agreement_status: AgreementStatus,
    /// Per-room effective terms. Accepting a counter-offer updates these
    /// for this room only.
    pub terms: Terms,
    /// The currently active agreement version, if one has been generated.
    pub current_agreement_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Creates a requested room seeded with the deal's base terms.
    #[must_use]
    pub fn new(
        deal_id: impl Into<String>,
        investor_id: impl Into<String>,
        agent_id: impl Into<String>,
        terms: Terms,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            deal_id: deal_id.into(),
            investor_id: investor_id.into(),
            agent_id: agent_id.into(),
            request_status: RequestStatus::Requested,
            agreement_status: AgreementStatus::Draft,
            terms,
            current_agreement_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether negotiation can proceed in this room.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.request_status.is_live()
    }

    /// Whether this room's agreement is fully executed, which is the
    /// disclosure precondition for the redaction gate and the bypass
    /// condition for the message filter.
    #[must_use]
    pub fn is_fully_signed(&self) -> bool {
        self.agreement_status == AgreementStatus::FullySigned
    }
}
