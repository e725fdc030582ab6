//! Negotiation ledger error types.

use thiserror::Error;

use crate::model::{CounterStatus, PartyRole, RequestStatus};
use crate::store::StoreError;

/// Errors from counter-offer operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NegotiationError {
    /// The caller is not the participant the scope belongs to.
    #[error("actor {actor_id} is not the {role} for this scope")]
    NotParticipant {
        /// The role the caller claimed.
        role: PartyRole,
        /// The caller's identity.
        actor_id: String,
    },

    /// The room can no longer exchange counter-offers.
    #[error("room {room_id} is {status}, negotiation is closed")]
    RoomClosed {
        /// The room.
        room_id: String,
        /// Its request status.
        status: RequestStatus,
    },

    /// The counter-offer is not awaiting a response.
    #[error("counter-offer {counter_id} is {status}, expected pending")]
    NotPending {
        /// The counter-offer.
        counter_id: String,
        /// Its current status.
        status: CounterStatus,
    },

    /// Only the target role may respond to a counter-offer.
    #[error("counter-offer {counter_id} awaits the {expected}, not the {actual}")]
    NotTheRecipient {
        /// The counter-offer.
        counter_id: String,
        /// The role that must respond.
        expected: PartyRole,
        /// The role that tried to.
        actual: PartyRole,
    },

    /// A proposed delta contains no change.
    #[error("counter-offer delta proposes no change")]
    EmptyDelta,

    /// A legacy deal-scoped counter-offer cannot be resolved to a single
    /// room.
    #[error("deal {deal_id} has {live_rooms} live rooms, a deal-scoped counter is ambiguous")]
    AmbiguousLegacyScope {
        /// The deal.
        deal_id: String,
        /// How many rooms are live.
        live_rooms: usize,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
