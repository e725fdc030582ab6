//! Counter-offer entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NegotiationScope, PartyRole, new_id};
use crate::terms::{Terms, TermsDelta};

/// Counter-offer lifecycle.
///
/// Within one scope at most one counter-offer is `pending` at any time;
/// proposing a new one supersedes the prior pending offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterStatus {
    /// Awaiting a response from the target role.
    Pending,
    /// Accepted; its delta became the room's effective terms.
    Accepted,
    /// Replaced by a newer offer in the same scope.
    Superseded,
    /// Declined by the target role.
    Rejected,
}

impl std::fmt::Display for CounterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Superseded => write!(f, "superseded"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A proposed change to a room's terms.
///
/// Carries both the delta and a snapshot of the terms it was proposed
/// against, so acceptance merges against exactly what the proposer saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterOffer {
    /// Entity id.
    pub id: String,
    /// Negotiation scope (room, or legacy deal-wide).
    pub scope: NegotiationScope,
    /// The enclosing deal.
    pub deal_id: String,
    /// Who proposed.
    pub from_role: PartyRole,
    /// Who must respond.
    pub to_role: PartyRole,
    /// Lifecycle status.
    pub status: CounterStatus,
    /// The proposed change.
    pub delta: TermsDelta,
    /// Effective terms at proposal time.
    pub terms_snapshot: Terms,
    /// Proposal time.
    pub created_at: DateTime<Utc>,
    /// When the offer left `pending` (accepted, superseded, or rejected).
    pub resolved_at: Option<DateTime<Utc>>,
}

impl CounterOffer {
    /// Creates a pending counter-offer targeting the proposer's
    /// counterparty.
    #[must_use]
    pub fn new(
        scope: NegotiationScope,
        deal_id: impl Into<String>,
        from_role: PartyRole,
        delta: TermsDelta,
        terms_snapshot: Terms,
    ) -> Self {
        Self {
            id: new_id(),
            scope,
            deal_id: deal_id.into(),
            from_role,
            to_role: from_role.opposite(),
            status: CounterStatus::Pending,
            delta,
            terms_snapshot,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Whether this offer is still awaiting a response.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == CounterStatus::Pending
    }
}
