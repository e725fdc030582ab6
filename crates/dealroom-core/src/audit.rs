//! Audit trail recording.
//!
//! Every state transition appends one immutable [`ActivityEntry`]. Appends
//! are best-effort: a failed append is logged and never blocks the
//! transition it records, so the primary workflow stays live even when the
//! activity table is degraded.

use std::sync::Arc;

use tracing::warn;

use crate::model::{ActivityEntry, ParticipantRole};
use crate::store::EntityStore;

/// Dotted action names used in activity entries.
pub mod actions {
    /// A counter-offer was proposed.
    pub const COUNTER_PROPOSED: &str = "counter.proposed";
    /// A pending counter-offer was replaced by a newer one.
    pub const COUNTER_SUPERSEDED: &str = "counter.superseded";
    /// A counter-offer was accepted.
    pub const COUNTER_ACCEPTED: &str = "counter.accepted";
    /// A counter-offer was rejected.
    pub const COUNTER_REJECTED: &str = "counter.rejected";
    /// A new agreement version was generated.
    pub const AGREEMENT_GENERATED: &str = "agreement.generated";
    /// A prior agreement version was retired by regeneration.
    pub const AGREEMENT_SUPERSEDED: &str = "agreement.superseded";
    /// An agreement went out for signature.
    pub const AGREEMENT_SENT: &str = "agreement.sent";
    /// A signature was recorded.
    pub const AGREEMENT_SIGNED: &str = "agreement.signed";
    /// An agreement version was voided.
    pub const AGREEMENT_VOIDED: &str = "agreement.voided";
    /// An attorney-review hold elapsed and the agreement fully executed.
    pub const REVIEW_RELEASED: &str = "review.released";
    /// The deal was locked to a winning room.
    pub const DEAL_LOCKED: &str = "deal.locked";
    /// Administrative lock reversal.
    pub const DEAL_UNLOCKED: &str = "deal.unlocked";
    /// A sibling room was closed out by lock-in.
    pub const ROOM_VOIDED: &str = "room.voided";
    /// A message was blocked by the anti-circumvention filter.
    pub const MESSAGE_BLOCKED: &str = "message.blocked";
}

/// Appends activity entries through the store, swallowing failures.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn EntityStore>,
}

impl AuditRecorder {
    /// Creates a recorder writing through the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Appends one entry. Failures are logged at `warn` and dropped.
    pub async fn record(
        &self,
        deal_id: &str,
        room_id: Option<&str>,
        actor_role: ParticipantRole,
        actor_id: &str,
        action: &str,
        detail: serde_json::Value,
    ) {
        let entry = ActivityEntry::new(
            deal_id,
            room_id.map(str::to_string),
            actor_role,
            actor_id,
            action,
            detail,
        );
        if let Err(err) = self.store.append_activity(entry).await {
            warn!(deal_id, action, error = %err, "failed to append audit entry");
        }
    }
}
