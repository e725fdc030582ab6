//! Lock-in resolution: first room fully executed wins the deal.
//!
//! Multiple agents can complete the winning signature for the same deal at
//! overlapping times on different workers, so the winner is fixed by a
//! single storage-level compare-and-set
//! ([`crate::store::EntityStore::try_lock_deal`]) and nothing else. Losing
//! that race is benign: the losing room is closed out and its agreement
//! voided, but the caller sees a normal resolution, not an error.
//!
//! Sibling cleanup after the compare-and-set is a fan-out of independent,
//! idempotent steps. One sibling failing to void must not block the others
//! or the winner, so each step is attempted and failures are aggregated
//! into the resolution for operators; [`LockInResolver::sweep`] re-applies
//! any missed steps later.

mod error;


use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

pub use error::LockInError;

use crate::audit::{AuditRecorder, actions};
use crate::model::{
    AgreementStatus, AgreementVersion, NegotiationScope, ParticipantRole, RequestStatus, Room,
};
use crate::store::{EntityStore, LockAttempt};

/// A sibling-cleanup step that failed and is left to the sweep.
#[derive(Debug, Clone)]
pub struct SiblingFailure {
    /// The room whose cleanup failed.
    pub room_id: String,
    /// What went wrong.
    pub detail: String,
}

/// Outcome of one lock-in attempt.
#[derive(Debug, Clone)]
pub enum LockResolution {
    /// This room won the deal.
    Won {
        /// The winning room.
        room_id: String,
        /// Sibling rooms closed out.
        voided_siblings: usize,
        /// E-signature envelopes belonging to voided versions; the caller
        /// voids them at the provider.
        voided_envelopes: Vec<String>,
        /// Cleanup steps that failed and await the sweep.
        failures: Vec<SiblingFailure>,
    },
    /// The deal was already locked to this same room; a retried event,
    /// nothing to do.
    AlreadyLocked {
        /// The winning room (this one).
        room_id: String,
    },
    /// A sibling won first. This room was closed out.
    Lost {
        /// The room that holds the deal.
        winning_room_id: String,
        /// This room's envelope, if one should be voided at the provider.
        voided_envelopes: Vec<String>,
    },
}

/// Report of one reconciliation pass over a locked deal.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Sibling rooms whose status had to be repaired.
    pub repaired_rooms: usize,
    /// Agreement versions that still had to be voided.
    pub repaired_versions: usize,
    /// Steps that failed again.
    pub failures: Vec<SiblingFailure>,
}

impl SweepReport {
    /// Whether the pass found nothing left to repair.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.repaired_rooms == 0 && self.repaired_versions == 0 && self.failures.is_empty()
    }
}

/// Resolves the race for deal exclusivity.
pub struct LockInResolver {
    store: Arc<dyn EntityStore>,
    audit: AuditRecorder,
}

impl LockInResolver {
    /// Creates a resolver over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store));
        Self { store, audit }
    }

    /// Resolves a fully executed agreement against the deal lock.
    ///
    /// Safe to call repeatedly for the same event: a deal already locked to
    /// the version's own room resolves to
    /// [`LockResolution::AlreadyLocked`] with no further mutation.
    pub async fn on_agent_signature_completed(
        &self,
        version: &AgreementVersion,
    ) -> Result<LockResolution, LockInError> {
        let Some(room_id) = version.scope.room_id() else {
            return Err(LockInError::LegacyScope {
                version_id: version.id.clone(),
            });
        };
        if version.status != AgreementStatus::FullySigned {
            return Err(LockInError::NotFullyExecuted {
                version_id: version.id.clone(),
                status: version.status,
            });
        }

        let room = self.store.get_room(room_id).await?;
        let attempt = self
            .store
            .try_lock_deal(&room.deal_id, &room.id, &room.agent_id)
            .await?;

        match attempt {
            LockAttempt::AlreadyHeld {
                room_id: held_room, ..
            } if held_room == room.id => {
                // Retried webhook or duplicate delivery.
                Ok(LockResolution::AlreadyLocked { room_id: held_room })
            }
            LockAttempt::AlreadyHeld {
                room_id: held_room, ..
            } => {
                // Lost the race. Close this room out; failures here are
                // repaired by the sweep, so losing stays benign.
                let mut envelopes = Vec::new();
                match self.close_room(&room).await {
                    Ok(closed) => {
                        envelopes = closed.envelopes;
                        self.audit
                            .record(
                                &room.deal_id,
                                Some(&room.id),
                                ParticipantRole::Admin,
                                "system",
                                actions::ROOM_VOIDED,
                                serde_json::json!({
                                    "winning_room_id": held_room,
                                    "voided_versions": closed.versions_voided,
                                    "reason": "lost_lock_race",
                                }),
                            )
                            .await;
                    }
                    Err(err) => {
                        warn!(
                            room_id = %room.id,
                            error = %err,
                            "failed to close losing room, leaving to sweep"
                        );
                    }
                }
                info!(
                    deal_id = %room.deal_id,
                    losing_room = %room.id,
                    winning_room = %held_room,
                    "lock race lost"
                );
                Ok(LockResolution::Lost {
                    winning_room_id: held_room,
                    voided_envelopes: envelopes,
                })
            }
            LockAttempt::Won => {
                info!(
                    deal_id = %room.deal_id,
                    room_id = %room.id,
                    agent_id = %room.agent_id,
                    "deal locked"
                );
                self.audit
                    .record(
                        &room.deal_id,
                        Some(&room.id),
                        ParticipantRole::Agent,
                        &room.agent_id,
                        actions::DEAL_LOCKED,
                        serde_json::json!({
                            "agreement_id": version.id,
                            "agent_id": room.agent_id,
                        }),
                    )
                    .await;
                Ok(self.finalize_winner(&room).await)
            }
        }
    }

    /// Marks the winner and fans out sibling voiding, continue-on-error.
    async fn finalize_winner(&self, winner: &Room) -> LockResolution {
        let mut failures = Vec::new();
        let mut voided_siblings = 0;
        let mut voided_envelopes = Vec::new();

        let locked = Room {
            request_status: RequestStatus::Locked,
            agreement_status: AgreementStatus::FullySigned,
            updated_at: Utc::now(),
            ..winner.clone()
        };
        if let Err(err) = self.store.update_room(&locked).await {
            // The compare-and-set already committed; the room status is a
            // mirror the sweep can repair.
            warn!(room_id = %winner.id, error = %err, "failed to mark winning room locked");
            failures.push(SiblingFailure {
                room_id: winner.id.clone(),
                detail: err.to_string(),
            });
        }

        let siblings = match self.store.rooms_for_deal(&winner.deal_id).await {
            Ok(rooms) => rooms,
            Err(err) => {
                warn!(
                    deal_id = %winner.deal_id,
                    error = %err,
                    "failed to enumerate sibling rooms, leaving to sweep"
                );
                failures.push(SiblingFailure {
                    room_id: winner.deal_id.clone(),
                    detail: format!("sibling enumeration failed: {err}"),
                });
                Vec::new()
            }
        };

        for sibling in siblings.iter().filter(|r| r.id != winner.id) {
            match self.close_room(sibling).await {
                Ok(closed) => {
                    if closed.room_repaired {
                        voided_siblings += 1;
                    }
                    voided_envelopes.extend(closed.envelopes);
                    self.audit
                        .record(
                            &winner.deal_id,
                            Some(&sibling.id),
                            ParticipantRole::Admin,
                            "system",
                            actions::ROOM_VOIDED,
                            serde_json::json!({
                                "winning_room_id": winner.id,
                                "voided_versions": closed.versions_voided,
                            }),
                        )
                        .await;
                }
                Err(err) => {
                    warn!(
                        room_id = %sibling.id,
                        error = %err,
                        "failed to void sibling room, continuing"
                    );
                    failures.push(SiblingFailure {
                        room_id: sibling.id.clone(),
                        detail: err.to_string(),
                    });
                }
            }
        }

        LockResolution::Won {
            room_id: winner.id.clone(),
            voided_siblings,
            voided_envelopes,
            failures,
        }
    }

    /// Re-applies winner marking and sibling voiding for a locked deal.
    ///
    /// Idempotent: a fully consistent deal produces a clean report. This is
    /// the repair path for fan-out steps that failed during resolution.
    pub async fn sweep(&self, deal_id: &str) -> Result<SweepReport, LockInError> {
        let deal = self.store.get_deal(deal_id).await?;
        let Some(locked_room_id) = deal.locked_room_id.clone() else {
            return Err(LockInError::DealNotLocked {
                deal_id: deal_id.to_string(),
            });
        };

        let mut report = SweepReport::default();

        for room in self.store.rooms_for_deal(deal_id).await? {
            if room.id == locked_room_id {
                // Repair the winner mirror if the original update failed.
                if room.request_status != RequestStatus::Locked {
                    let locked = Room {
                        request_status: RequestStatus::Locked,
                        agreement_status: AgreementStatus::FullySigned,
                        updated_at: Utc::now(),
                        ..room.clone()
                    };
                    match self.store.update_room(&locked).await {
                        Ok(()) => report.repaired_rooms += 1,
                        Err(err) => report.failures.push(SiblingFailure {
                            room_id: room.id.clone(),
                            detail: err.to_string(),
                        }),
                    }
                }
                continue;
            }
            match self.close_room(&room).await {
                Ok(closed) => {
                    if closed.room_repaired {
                        report.repaired_rooms += 1;
                    }
                    report.repaired_versions += closed.versions_voided;
                }
                Err(err) => report.failures.push(SiblingFailure {
                    room_id: room.id.clone(),
                    detail: err.to_string(),
                }),
            }
        }

        if !report.is_clean() {
            info!(
                deal_id,
                repaired_rooms = report.repaired_rooms,
                repaired_versions = report.repaired_versions,
                failures = report.failures.len(),
                "lock-in sweep repaired state"
            );
        }
        Ok(report)
    }

    /// Administrative override: clears the deal's lock so a new winner can
    /// be resolved. The only reversal path once a lock commits.
    pub async fn admin_unlock(&self, deal_id: &str, actor_id: &str) -> Result<(), LockInError> {
        let deal = self.store.get_deal(deal_id).await?;
        if !deal.is_locked() {
            return Err(LockInError::DealNotLocked {
                deal_id: deal_id.to_string(),
            });
        }
        self.store.clear_deal_lock(deal_id).await?;
        self.audit
            .record(
                deal_id,
                deal.locked_room_id.as_deref(),
                ParticipantRole::Admin,
                actor_id,
                actions::DEAL_UNLOCKED,
                serde_json::json!({
                    "previous_room_id": deal.locked_room_id,
                    "previous_agent_id": deal.locked_agent_id,
                }),
            )
            .await;
        Ok(())
    }

    /// Expires a room and voids its live agreement versions. Idempotent:
    /// already-closed state is skipped, and `room_repaired` reports whether
    /// anything changed.
    async fn close_room(&self, room: &Room) -> Result<ClosedRoom, LockInError> {
        let mut closed = ClosedRoom::default();
        let scope = NegotiationScope::Room(room.id.clone());

        for version in self.store.agreements_for_scope(&scope).await? {
            if !version.status.is_voidable() {
                continue;
            }
            let mut voided = version.clone();
            voided.status = AgreementStatus::Voided;
            voided.updated_at = Utc::now();
            self.store.update_agreement(&voided).await?;
            if let Some(envelope) = voided.envelope_id.clone() {
                closed.envelopes.push(envelope);
            }
            closed.versions_voided += 1;
        }

        let already_closed = room.request_status == RequestStatus::Expired
            && room.agreement_status == AgreementStatus::Voided;
        if !already_closed {
            let expired = Room {
                request_status: RequestStatus::Expired,
                agreement_status: AgreementStatus::Voided,
                updated_at: Utc::now(),
                ..room.clone()
            };
            self.store.update_room(&expired).await?;
            closed.room_repaired = true;
        }

        Ok(closed)
    }
}

#[derive(Debug, Default)]
struct ClosedRoom {
    room_repaired: bool,
    versions_voided: usize,
    envelopes: Vec<String>,
}
