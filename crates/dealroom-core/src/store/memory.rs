//! In-process reference store.
//!
//! Backs the test suites and documents the behavior real backends must
//! provide. A single `RwLock` guards all entity maps, which makes
//! [`MemoryStore::try_lock_deal`] trivially atomic: the check and the set
//! happen under one write guard.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::{EntityKind, EntityStore, LockAttempt, StoreError};
use crate::model::{
    ActivityEntry, AgreementStatus, AgreementVersion, CounterOffer, CounterStatus, Deal,
    NegotiationScope, Room,
};

#[derive(Default)]
struct Inner {
    deals: HashMap<String, Deal>,
    rooms: HashMap<String, Room>,
    counters: HashMap<String, CounterOffer>,
    agreements: HashMap<String, AgreementVersion>,
    activities: Vec<ActivityEntry>,
    /// Room ids whose next update fails with `Unavailable`. Test support
    /// for partial-failure paths; consumed on trigger.
    fail_room_updates: HashSet<String>,
}

/// In-memory [`EntityStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arranges for the next `update_room` on `room_id` to fail with a
    /// transient error. Used by tests exercising fan-out partial failure.
    pub async fn fail_next_room_update(&self, room_id: impl Into<String>) {
        self.inner
            .write()
            .await
            .fail_room_updates
            .insert(room_id.into());
    }

    /// Number of audit entries recorded so far.
    pub async fn activity_count(&self) -> usize {
        self.inner.read().await.activities.len()
    }
}

#[async_trait::async_trait]
impl EntityStore for MemoryStore {
    async fn create_deal(&self, deal: Deal) -> Result<Deal, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.deals.contains_key(&deal.id) {
            return Err(StoreError::Duplicate {
                kind: EntityKind::Deal,
                id: deal.id,
            });
        }
        inner.deals.insert(deal.id.clone(), deal.clone());
        Ok(deal)
    }

    async fn get_deal(&self, deal_id: &str) -> Result<Deal, StoreError> {
        self.inner
            .read()
            .await
            .deals
            .get(deal_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Deal,
                id: deal_id.to_string(),
            })
    }

    async fn update_deal(&self, deal: &Deal) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .deals
            .get(&deal.id)
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Deal,
                id: deal.id.clone(),
            })?;
        // Lock fields only move through try_lock_deal / clear_deal_lock.
        if existing.locked_room_id != deal.locked_room_id
            || existing.locked_agent_id != deal.locked_agent_id
        {
            return Err(StoreError::Precondition {
                detail: format!("deal {} lock fields are immutable in update_deal", deal.id),
            });
        }
        inner.deals.insert(deal.id.clone(), deal.clone());
        Ok(())
    }

    async fn try_lock_deal(
        &self,
        deal_id: &str,
        room_id: &str,
        agent_id: &str,
    ) -> Result<LockAttempt, StoreError> {
        let mut inner = self.inner.write().await;
        let deal = inner
            .deals
            .get_mut(deal_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Deal,
                id: deal_id.to_string(),
            })?;
        if let (Some(held_room), Some(held_agent)) =
            (deal.locked_room_id.clone(), deal.locked_agent_id.clone())
        {
            return Ok(LockAttempt::AlreadyHeld {
                room_id: held_room,
                agent_id: held_agent,
            });
        }
        deal.locked_room_id = Some(room_id.to_string());
        deal.locked_agent_id = Some(agent_id.to_string());
        deal.updated_at = chrono::Utc::now();
        Ok(LockAttempt::Won)
    }

    async fn clear_deal_lock(&self, deal_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let deal = inner
            .deals
            .get_mut(deal_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Deal,
                id: deal_id.to_string(),
            })?;
        deal.locked_room_id = None;
        deal.locked_agent_id = None;
        deal.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn locked_deals(&self) -> Result<Vec<Deal>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .deals
            .values()
            .filter(|d| d.is_locked())
            .cloned()
            .collect())
    }

    async fn create_room(&self, room: Room) -> Result<Room, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.rooms.contains_key(&room.id) {
            return Err(StoreError::Duplicate {
                kind: EntityKind::Room,
                id: room.id,
            });
        }
        let pair_taken = inner
            .rooms
            .values()
            .any(|r| r.deal_id == room.deal_id && r.agent_id == room.agent_id);
        if pair_taken {
            return Err(StoreError::Precondition {
                detail: format!(
                    "agent {} already has a room for deal {}",
                    room.agent_id, room.deal_id
                ),
            });
        }
        inner.rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn get_room(&self, room_id: &str) -> Result<Room, StoreError> {
        self.inner
            .read()
            .await
            .rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Room,
                id: room_id.to_string(),
            })
    }

    async fn update_room(&self, room: &Room) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.fail_room_updates.remove(&room.id) {
            return Err(StoreError::Unavailable {
                detail: format!("injected failure updating room {}", room.id),
            });
        }
        if !inner.rooms.contains_key(&room.id) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Room,
                id: room.id.clone(),
            });
        }
        inner.rooms.insert(room.id.clone(), room.clone());
        Ok(())
    }

    async fn rooms_for_deal(&self, deal_id: &str) -> Result<Vec<Room>, StoreError> {
        let mut rooms: Vec<Room> = self
            .inner
            .read()
            .await
            .rooms
            .values()
            .filter(|r| r.deal_id == deal_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }

    async fn create_counter(&self, counter: CounterOffer) -> Result<CounterOffer, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.counters.contains_key(&counter.id) {
            return Err(StoreError::Duplicate {
                kind: EntityKind::CounterOffer,
                id: counter.id,
            });
        }
        inner.counters.insert(counter.id.clone(), counter.clone());
        Ok(counter)
    }

    async fn get_counter(&self, counter_id: &str) -> Result<CounterOffer, StoreError> {
        self.inner
            .read()
            .await
            .counters
            .get(counter_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::CounterOffer,
                id: counter_id.to_string(),
            })
    }

    async fn update_counter(&self, counter: &CounterOffer) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.counters.contains_key(&counter.id) {
            return Err(StoreError::NotFound {
                kind: EntityKind::CounterOffer,
                id: counter.id.clone(),
            });
        }
        inner.counters.insert(counter.id.clone(), counter.clone());
        Ok(())
    }

    async fn pending_counter_for_scope(
        &self,
        scope: &NegotiationScope,
    ) -> Result<Option<CounterOffer>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .counters
            .values()
            .find(|c| c.status == CounterStatus::Pending && &c.scope == scope)
            .cloned())
    }

    async fn create_agreement(
        &self,
        version: AgreementVersion,
    ) -> Result<AgreementVersion, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.agreements.contains_key(&version.id) {
            return Err(StoreError::Duplicate {
                kind: EntityKind::Agreement,
                id: version.id,
            });
        }
        inner.agreements.insert(version.id.clone(), version.clone());
        Ok(version)
    }

    async fn get_agreement(&self, version_id: &str) -> Result<AgreementVersion, StoreError> {
        self.inner
            .read()
            .await
            .agreements
            .get(version_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Agreement,
                id: version_id.to_string(),
            })
    }

    async fn update_agreement(&self, version: &AgreementVersion) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.agreements.contains_key(&version.id) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Agreement,
                id: version.id.clone(),
            });
        }
        inner.agreements.insert(version.id.clone(), version.clone());
        Ok(())
    }

    async fn agreements_for_scope(
        &self,
        scope: &NegotiationScope,
    ) -> Result<Vec<AgreementVersion>, StoreError> {
        let mut versions: Vec<AgreementVersion> = self
            .inner
            .read()
            .await
            .agreements
            .values()
            .filter(|v| &v.scope == scope)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn agreement_by_envelope(
        &self,
        envelope_id: &str,
    ) -> Result<Option<AgreementVersion>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .agreements
            .values()
            .find(|v| v.envelope_id.as_deref() == Some(envelope_id))
            .cloned())
    }

    async fn agreements_in_review(&self) -> Result<Vec<AgreementVersion>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .agreements
            .values()
            .filter(|v| v.status == AgreementStatus::AttorneyReviewPending)
            .cloned()
            .collect())
    }

    async fn append_activity(&self, entry: ActivityEntry) -> Result<(), StoreError> {
        self.inner.write().await.activities.push(entry);
        Ok(())
    }

    async fn activities_for_deal(&self, deal_id: &str) -> Result<Vec<ActivityEntry>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .activities
            .iter()
            .filter(|a| a.deal_id == deal_id)
            .cloned()
            .collect())
    }

    async fn purge_deal(&self, deal_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.deals.remove(deal_id).is_none() {
            return Err(StoreError::NotFound {
                kind: EntityKind::Deal,
                id: deal_id.to_string(),
            });
        }
        inner.rooms.retain(|_, r| r.deal_id != deal_id);
        inner.counters.retain(|_, c| c.deal_id != deal_id);
        inner.agreements.retain(|_, v| v.deal_id != deal_id);
        // Activities go last so a failed purge still leaves the trail.
        inner.activities.retain(|a| a.deal_id != deal_id);
        Ok(())
    }
}
