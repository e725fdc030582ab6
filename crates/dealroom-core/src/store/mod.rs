//! Entity storage seam.
//!
//! Persistent storage is an external collaborator: the engine consumes
//! create/get/filter/update operations per entity type through the
//! [`EntityStore`] trait and never assumes cross-entity transactions. The
//! one primitive with a hard atomicity requirement is
//! [`EntityStore::try_lock_deal`]: implementations must make it a genuine
//! conditional update at the storage layer (update only if the lock fields
//! are currently unset), because concurrent signature completions on
//! different workers race through it and exactly one writer may survive.
//!
//! [`MemoryStore`] is the in-process reference implementation used by the
//! test suites.

mod memory;
mod retry;


use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use retry::{RetryConfig, RetryPolicy};

use crate::model::{ActivityEntry, AgreementVersion, CounterOffer, Deal, NegotiationScope, Room};

/// Entity families the store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// [`Deal`] records.
    Deal,
    /// [`Room`] records.
    Room,
    /// [`CounterOffer`] records.
    CounterOffer,
    /// [`AgreementVersion`] records.
    Agreement,
    /// [`ActivityEntry`] records.
    Activity,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deal => write!(f, "deal"),
            Self::Room => write!(f, "room"),
            Self::CounterOffer => write!(f, "counter_offer"),
            Self::Agreement => write!(f, "agreement"),
            Self::Activity => write!(f, "activity"),
        }
    }
}

/// Errors surfaced by storage implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity family.
        kind: EntityKind,
        /// The id that was looked up.
        id: String,
    },

    /// An entity with this id already exists.
    #[error("{kind} already exists: {id}")]
    Duplicate {
        /// Entity family.
        kind: EntityKind,
        /// The duplicate id.
        id: String,
    },

    /// A storage-level invariant rejected the write (e.g. a second room
    /// for the same deal/agent pair).
    #[error("storage precondition failed: {detail}")]
    Precondition {
        /// What was violated.
        detail: String,
    },

    /// The backend asked the caller to slow down. Transient.
    #[error("storage rate limited")]
    RateLimited {
        /// Suggested wait before retrying, when the backend provides one.
        retry_after: Option<Duration>,
    },

    /// The backend was temporarily unreachable. Transient.
    #[error("storage unavailable: {detail}")]
    Unavailable {
        /// Backend-provided detail.
        detail: String,
    },

    /// Any other backend failure.
    #[error("storage backend error: {detail}")]
    Backend {
        /// Backend-provided detail.
        detail: String,
    },
}

impl StoreError {
    /// Whether a retry with backoff is worthwhile.
    ///
    /// Only rate limiting and temporary unavailability qualify; everything
    /// else is deterministic and would fail again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Unavailable { .. })
    }
}

/// Outcome of the deal-lock conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    /// The caller's room won: the lock fields were unset and are now fixed
    /// to the caller.
    Won,
    /// The deal was already locked (possibly to the caller's own room, in
    /// which case the caller should treat the attempt as a duplicate).
    AlreadyHeld {
        /// The room holding the lock.
        room_id: String,
        /// The agent holding the lock.
        agent_id: String,
    },
}

/// Storage operations the engine depends on.
///
/// Implementations provide per-entity create/read/update plus the
/// exact-match filters listed here. Reads are expected to see the
/// implementation's own completed writes; no ordering guarantee is assumed
/// across processes except for [`EntityStore::try_lock_deal`], which must
/// be atomic with respect to concurrent callers.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ── Deals ───────────────────────────────────────────────────────────

    /// Inserts a new deal.
    async fn create_deal(&self, deal: Deal) -> Result<Deal, StoreError>;

    /// Reads a deal by id.
    async fn get_deal(&self, deal_id: &str) -> Result<Deal, StoreError>;

    /// Replaces a deal record. The lock fields must be changed only through
    /// [`EntityStore::try_lock_deal`] / [`EntityStore::clear_deal_lock`];
    /// implementations may reject writes that alter them.
    async fn update_deal(&self, deal: &Deal) -> Result<(), StoreError>;

    /// Atomically sets `locked_room_id`/`locked_agent_id` if and only if
    /// both are currently unset. This is the single point of truth for
    /// which room won the deal.
    async fn try_lock_deal(
        &self,
        deal_id: &str,
        room_id: &str,
        agent_id: &str,
    ) -> Result<LockAttempt, StoreError>;

    /// Administrative override: clears the lock fields.
    async fn clear_deal_lock(&self, deal_id: &str) -> Result<(), StoreError>;

    /// All deals whose lock fields are set. Consumed by the reconciliation
    /// sweep.
    async fn locked_deals(&self) -> Result<Vec<Deal>, StoreError>;

    // ── Rooms ───────────────────────────────────────────────────────────

    /// Inserts a new room. At most one room may exist per (deal, agent)
    /// pair.
    async fn create_room(&self, room: Room) -> Result<Room, StoreError>;

    /// Reads a room by id.
    async fn get_room(&self, room_id: &str) -> Result<Room, StoreError>;

    /// Replaces a room record.
    async fn update_room(&self, room: &Room) -> Result<(), StoreError>;

    /// All rooms of a deal, ordered by creation time.
    async fn rooms_for_deal(&self, deal_id: &str) -> Result<Vec<Room>, StoreError>;

    // ── Counter-offers ──────────────────────────────────────────────────

    /// Inserts a new counter-offer.
    async fn create_counter(&self, counter: CounterOffer) -> Result<CounterOffer, StoreError>;

    /// Reads a counter-offer by id.
    async fn get_counter(&self, counter_id: &str) -> Result<CounterOffer, StoreError>;

    /// Replaces a counter-offer record.
    async fn update_counter(&self, counter: &CounterOffer) -> Result<(), StoreError>;

    /// The pending counter-offer in a scope, if one exists.
    async fn pending_counter_for_scope(
        &self,
        scope: &NegotiationScope,
    ) -> Result<Option<CounterOffer>, StoreError>;

    // ── Agreement versions ──────────────────────────────────────────────

    /// Inserts a new agreement version.
    async fn create_agreement(
        &self,
        version: AgreementVersion,
    ) -> Result<AgreementVersion, StoreError>;

    /// Reads an agreement version by id.
    async fn get_agreement(&self, version_id: &str) -> Result<AgreementVersion, StoreError>;

    /// Replaces an agreement version record.
    async fn update_agreement(&self, version: &AgreementVersion) -> Result<(), StoreError>;

    /// All versions in a scope, ordered by version number.
    async fn agreements_for_scope(
        &self,
        scope: &NegotiationScope,
    ) -> Result<Vec<AgreementVersion>, StoreError>;

    /// Resolves a version from the e-signature envelope attached to it.
    async fn agreement_by_envelope(
        &self,
        envelope_id: &str,
    ) -> Result<Option<AgreementVersion>, StoreError>;

    /// All versions currently in the attorney-review hold. Consumed by the
    /// review-release sweep.
    async fn agreements_in_review(&self) -> Result<Vec<AgreementVersion>, StoreError>;

    // ── Activity log ────────────────────────────────────────────────────

    /// Appends an audit entry. Entries are never updated or deleted except
    /// by [`EntityStore::purge_deal`].
    async fn append_activity(&self, entry: ActivityEntry) -> Result<(), StoreError>;

    /// All audit entries for a deal, in append order.
    async fn activities_for_deal(&self, deal_id: &str) -> Result<Vec<ActivityEntry>, StoreError>;

    // ── Purge ───────────────────────────────────────────────────────────

    /// Removes a deal and every child record (rooms, counter-offers,
    /// agreement versions, and finally activities).
    async fn purge_deal(&self, deal_id: &str) -> Result<(), StoreError>;
}
