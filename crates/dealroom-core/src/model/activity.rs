//! Append-only activity entries for observability and dispute resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParticipantRole, new_id};

/// One immutable audit record of a state transition.
///
/// Entries are never updated or deleted individually; the only removal path
/// is a whole-deal purge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Entity id.
    pub id: String,
    /// The deal the transition belongs to.
    pub deal_id: String,
    /// The room, when the transition is room-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Role of the actor that caused the transition.
    pub actor_role: ParticipantRole,
    /// Identity of the actor (profile id, or `system` for sweeps).
    pub actor_id: String,
    /// Dotted action name, e.g. `counter.proposed` or `deal.locked`.
    pub action: String,
    /// Structured detail payload. Never contains redacted content or
    /// blocked message bodies.
    pub detail: serde_json::Value,
    /// When the transition occurred.
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(
        deal_id: impl Into<String>,
        room_id: Option<String>,
        actor_role: ParticipantRole,
        actor_id: impl Into<String>,
        action: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: new_id(),
            deal_id: deal_id.into(),
            room_id,
            actor_role,
            actor_id: actor_id.into(),
            action: action.into(),
            detail,
            occurred_at: Utc::now(),
        }
    }
}
