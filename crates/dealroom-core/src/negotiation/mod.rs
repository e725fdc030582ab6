//! Term negotiation ledger.
//!
//! Counter-offers are an append-and-supersede log per negotiation scope:
//! proposing a new offer retires the scope's pending one, so at most one
//! offer awaits a response at any time. Accepting merges the offer's delta
//! onto the terms snapshot it was proposed against and makes the result
//! the room's effective terms. Only that room sees the change; sibling
//! rooms never do.
//!
//! Legacy deal-scoped counters (from before rooms existed) are accepted
//! only when the deal has exactly one live room, and are normalized to
//! that room's scope on write. Ambiguous multi-room legacy counters are
//! rejected rather than resolved arbitrarily.

mod error;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

pub use error::NegotiationError;

use crate::audit::{AuditRecorder, actions};
use crate::model::{CounterOffer, CounterStatus, NegotiationScope, PartyRole, Room};
use crate::store::EntityStore;
use crate::terms::TermsDelta;

/// The room (and its terms) a counter-offer was accepted into, handed back
/// so the caller can trigger agreement regeneration for that scope.
#[derive(Debug, Clone)]
pub struct AcceptedCounter {
    /// The accepted offer.
    pub counter: CounterOffer,
    /// The room whose effective terms changed.
    pub room: Room,
}

/// Proposes and resolves counter-offers.
pub struct NegotiationLedger {
    store: Arc<dyn EntityStore>,
    audit: AuditRecorder,
}

impl NegotiationLedger {
    /// Creates a ledger over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store));
        Self { store, audit }
    }

    /// Resolves a scope to its room, enforcing the caller's participation.
    async fn resolve_room(
        &self,
        scope: &NegotiationScope,
        role: PartyRole,
        actor_id: &str,
    ) -> Result<Room, NegotiationError> {
        let room = match scope {
            NegotiationScope::Room(room_id) => self.store.get_room(room_id).await?,
            NegotiationScope::Deal(deal_id) => {
                // Legacy path: only a deal with exactly one live room is
                // unambiguous.
                let rooms = self.store.rooms_for_deal(deal_id).await?;
                let mut live: Vec<Room> = rooms.into_iter().filter(Room::is_live).collect();
                if live.len() != 1 {
                    return Err(NegotiationError::AmbiguousLegacyScope {
                        deal_id: deal_id.clone(),
                        live_rooms: live.len(),
                    });
                }
                live.remove(0)
            }
        };

        let participant = match role {
            PartyRole::Investor => &room.investor_id,
            PartyRole::Agent => &room.agent_id,
        };
        if participant != actor_id {
            return Err(NegotiationError::NotParticipant { role, actor_id: actor_id.to_string() });
        }
        if !room.is_live() {
            return Err(NegotiationError::RoomClosed {
                room_id: room.id.clone(),
                status: room.request_status,
            });
        }
        Ok(room)
    }

    /// Proposes a counter-offer, superseding the scope's pending one.
    ///
    /// The offer snapshots the room's current effective terms so a later
    /// acceptance merges against exactly what the proposer saw.
    pub async fn propose_counter(
        &self,
        scope: &NegotiationScope,
        from_role: PartyRole,
        actor_id: &str,
        delta: TermsDelta,
    ) -> Result<CounterOffer, NegotiationError> {
        if delta.is_empty() {
            return Err(NegotiationError::EmptyDelta);
        }
        let room = self.resolve_room(scope, from_role, actor_id).await?;
        let room_scope = NegotiationScope::Room(room.id.clone());

        // Supersede the pending offer in the normalized room scope, plus
        // any pending legacy deal-scoped offer still on the deal, so the
        // single-pending invariant holds across both.
        for candidate_scope in [
            room_scope.clone(),
            NegotiationScope::Deal(room.deal_id.clone()),
        ] {
            if let Some(pending) = self.store.pending_counter_for_scope(&candidate_scope).await? {
                let mut superseded = pending.clone();
                superseded.status = CounterStatus::Superseded;
                superseded.resolved_at = Some(Utc::now());
                self.store.update_counter(&superseded).await?;
                self.audit
                    .record(
                        &room.deal_id,
                        Some(&room.id),
                        from_role.into(),
                        actor_id,
                        actions::COUNTER_SUPERSEDED,
                        serde_json::json!({
                            "counter_id": superseded.id,
                            "superseded_by_role": from_role,
                        }),
                    )
                    .await;
            }
        }

        // New offers are always written room-scoped, legacy input or not.
        let counter = CounterOffer::new(
            room_scope,
            &room.deal_id,
            from_role,
            delta,
            room.terms.clone(),
        );
        let counter = self.store.create_counter(counter).await?;

        info!(
            counter_id = %counter.id,
            room_id = %room.id,
            from = %from_role,
            "counter-offer proposed"
        );
        self.audit
            .record(
                &room.deal_id,
                Some(&room.id),
                from_role.into(),
                actor_id,
                actions::COUNTER_PROPOSED,
                serde_json::json!({
                    "counter_id": counter.id,
                    "delta": counter.delta,
                }),
            )
            .await;

        Ok(counter)
    }

    /// Accepts a pending counter-offer: the delta merged onto its snapshot
    /// becomes the room's effective terms. The caller regenerates the
    /// room's agreement afterwards.
    pub async fn accept_counter(
        &self,
        counter_id: &str,
        actor_role: PartyRole,
        actor_id: &str,
    ) -> Result<AcceptedCounter, NegotiationError> {
        let counter = self.store.get_counter(counter_id).await?;
        if counter.status != CounterStatus::Pending {
            return Err(NegotiationError::NotPending {
                counter_id: counter.id,
                status: counter.status,
            });
        }
        if actor_role != counter.to_role {
            return Err(NegotiationError::NotTheRecipient {
                counter_id: counter.id,
                expected: counter.to_role,
                actual: actor_role,
            });
        }
        let room = self
            .resolve_room(&counter.scope, actor_role, actor_id)
            .await?;

        let merged = counter.delta.merge(&counter.terms_snapshot);

        let mut accepted = counter.clone();
        accepted.status = CounterStatus::Accepted;
        accepted.resolved_at = Some(Utc::now());
        self.store.update_counter(&accepted).await?;

        let updated_room = Room {
            terms: merged,
            updated_at: Utc::now(),
            ..room
        };
        self.store.update_room(&updated_room).await?;

        info!(
            counter_id = %accepted.id,
            room_id = %updated_room.id,
            by = %actor_role,
            "counter-offer accepted"
        );
        self.audit
            .record(
                &updated_room.deal_id,
                Some(&updated_room.id),
                actor_role.into(),
                actor_id,
                actions::COUNTER_ACCEPTED,
                serde_json::json!({
                    "counter_id": accepted.id,
                    "terms": updated_room.terms,
                }),
            )
            .await;

        Ok(AcceptedCounter {
            counter: accepted,
            room: updated_room,
        })
    }

    /// Declines a pending counter-offer. The room's terms are untouched.
    pub async fn reject_counter(
        &self,
        counter_id: &str,
        actor_role: PartyRole,
        actor_id: &str,
    ) -> Result<CounterOffer, NegotiationError> {
        let counter = self.store.get_counter(counter_id).await?;
        if counter.status != CounterStatus::Pending {
            return Err(NegotiationError::NotPending {
                counter_id: counter.id,
                status: counter.status,
            });
        }
        if actor_role != counter.to_role {
            return Err(NegotiationError::NotTheRecipient {
                counter_id: counter.id,
                expected: counter.to_role,
                actual: actor_role,
            });
        }
        let room = self
            .resolve_room(&counter.scope, actor_role, actor_id)
            .await?;

        let mut rejected = counter.clone();
        rejected.status = CounterStatus::Rejected;
        rejected.resolved_at = Some(Utc::now());
        self.store.update_counter(&rejected).await?;

        self.audit
            .record(
                &room.deal_id,
                Some(&room.id),
                actor_role.into(),
                actor_id,
                actions::COUNTER_REJECTED,
                serde_json::json!({ "counter_id": rejected.id }),
            )
            .await;

        Ok(rejected)
    }
}
