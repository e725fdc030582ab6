//! Signature tracking.
//!
//! Tracks the signing machine of each agreement version:
//!
//! ```text
//! draft -> sent -> investor_signed -> fully_signed
//!                        \-> attorney_review_pending -> fully_signed
//! ```
//!
//! The investor signs the base terms first; the agent's signature either
//! completes the agreement immediately or, in review-hold states, starts a
//! business-day hold that a sweep releases. Signing is idempotent per role
//! (a repeat is an error, not an overwrite), and signatures are validated
//! against the room's currently active version so callbacks for a
//! regenerated document are rejected as stale.
//!
//! Every transition appends one audit entry. The tracker never locks the
//! deal itself: callers feed a [`SignatureOutcome::FullyExecuted`] outcome
//! into the lock-in resolver.

mod error;
mod review;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

pub use error::SignatureError;
pub use review::{DEFAULT_HOLD_BUSINESS_DAYS, ReviewHoldPolicy, add_business_days};

use crate::audit::{AuditRecorder, actions};
use crate::model::{
    AgreementStatus, AgreementVersion, ParticipantRole, PartyRole, Room, SignatureBlock,
    SignerMode,
};
use crate::store::EntityStore;

/// What a recorded signature did to the version.
#[derive(Debug, Clone)]
pub enum SignatureOutcome {
    /// The signature was captured; more signatures are still required.
    Recorded {
        /// The updated version.
        version: AgreementVersion,
    },
    /// Both parties have signed; the review hold is running.
    ReviewPending {
        /// The updated version.
        version: AgreementVersion,
        /// When the hold ends.
        review_ends_at: DateTime<Utc>,
    },
    /// The version is fully executed. For dual-sign agreements the caller
    /// must now run lock-in resolution.
    FullyExecuted {
        /// The updated version.
        version: AgreementVersion,
    },
}

/// Records signature events and derives agreement status.
pub struct SignatureTracker {
    store: Arc<dyn EntityStore>,
    audit: AuditRecorder,
    review: ReviewHoldPolicy,
}

impl SignatureTracker {
    /// Creates a tracker with the given review-hold policy.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, review: ReviewHoldPolicy) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store));
        Self {
            store,
            audit,
            review,
        }
    }

    /// Loads the room a version belongs to and checks the version is still
    /// the room's active agreement.
    async fn active_room_for(
        &self,
        version: &AgreementVersion,
    ) -> Result<Room, SignatureError> {
        let Some(room_id) = version.scope.room_id() else {
            return Err(SignatureError::LegacyScope {
                version_id: version.id.clone(),
            });
        };
        let room = self.store.get_room(room_id).await?;
        if room.current_agreement_id.as_deref() != Some(version.id.as_str()) {
            return Err(SignatureError::StaleVersion {
                version_id: version.id.clone(),
                current_id: room.current_agreement_id.clone(),
            });
        }
        Ok(room)
    }

    /// Persists a version's new status and mirrors it onto the room.
    async fn commit(
        &self,
        version: &AgreementVersion,
        room: &Room,
    ) -> Result<(), SignatureError> {
        self.store.update_agreement(version).await?;
        let mirrored = Room {
            agreement_status: version.status,
            updated_at: Utc::now(),
            ..room.clone()
        };
        self.store.update_room(&mirrored).await?;
        Ok(())
    }

    /// Marks a draft version as sent for signature, attaching the
    /// e-signature envelope when one was created.
    pub async fn mark_sent(
        &self,
        version_id: &str,
        envelope_id: Option<&str>,
        actor_role: ParticipantRole,
        actor_id: &str,
    ) -> Result<AgreementVersion, SignatureError> {
        let mut version = self.store.get_agreement(version_id).await?;
        let room = self.active_room_for(&version).await?;

        if version.status != AgreementStatus::Draft {
            return Err(SignatureError::InvalidTransition {
                version_id: version.id,
                status: version.status,
                action: "send",
            });
        }

        version.status = AgreementStatus::Sent;
        version.envelope_id = envelope_id.map(str::to_string);
        version.updated_at = Utc::now();
        self.commit(&version, &room).await?;

        self.audit
            .record(
                &version.deal_id,
                Some(&room.id),
                actor_role,
                actor_id,
                actions::AGREEMENT_SENT,
                serde_json::json!({
                    "agreement_id": version.id,
                    "version": version.version,
                    "envelope_id": version.envelope_id,
                }),
            )
            .await;

        Ok(version)
    }

    /// Records one party's signature.
    ///
    /// Re-signing an already-signed role is rejected; so is any signature
    /// against a version that is no longer the room's active agreement.
    pub async fn record_signature(
        &self,
        version_id: &str,
        role: PartyRole,
        signer_id: &str,
        signed_at: DateTime<Utc>,
    ) -> Result<SignatureOutcome, SignatureError> {
        let mut version = self.store.get_agreement(version_id).await?;
        let room = self.active_room_for(&version).await?;

        if version.is_signed_by(role) {
            return Err(SignatureError::AlreadySigned {
                version_id: version.id,
                role,
            });
        }

        let block = SignatureBlock {
            signer_id: signer_id.to_string(),
            signed_at,
        };

        match role {
            PartyRole::Investor => {
                if version.status != AgreementStatus::Sent {
                    return Err(SignatureError::InvalidTransition {
                        version_id: version.id,
                        status: version.status,
                        action: "record investor signature",
                    });
                }
                version.investor_signature = Some(block);
                version.status = match version.signer_mode {
                    SignerMode::DualSign => AgreementStatus::InvestorSigned,
                    SignerMode::InvestorOnly => AgreementStatus::FullySigned,
                };
            }
            PartyRole::Agent => {
                if version.signer_mode == SignerMode::InvestorOnly {
                    return Err(SignatureError::InvalidTransition {
                        version_id: version.id,
                        status: version.status,
                        action: "record agent signature on an investor-only document",
                    });
                }
                // The investor signs the base terms first.
                if version.status != AgreementStatus::InvestorSigned {
                    return Err(SignatureError::InvalidTransition {
                        version_id: version.id,
                        status: version.status,
                        action: "record agent signature",
                    });
                }
                version.agent_signature = Some(block);
                if self.review.requires_hold(&version.governing_state) {
                    version.status = AgreementStatus::AttorneyReviewPending;
                    version.review_ends_at = Some(self.review.hold_end(signed_at));
                } else {
                    version.status = AgreementStatus::FullySigned;
                }
            }
        }

        version.updated_at = Utc::now();
        self.commit(&version, &room).await?;

        info!(
            version_id = %version.id,
            room_id = %room.id,
            role = %role,
            status = %version.status,
            "signature recorded"
        );
        self.audit
            .record(
                &version.deal_id,
                Some(&room.id),
                role.into(),
                signer_id,
                actions::AGREEMENT_SIGNED,
                serde_json::json!({
                    "agreement_id": version.id,
                    "version": version.version,
                    "role": role,
                    "status": version.status,
                }),
            )
            .await;

        Ok(match version.status {
            AgreementStatus::FullySigned => SignatureOutcome::FullyExecuted { version },
            AgreementStatus::AttorneyReviewPending => {
                let review_ends_at = version.review_ends_at.unwrap_or(signed_at);
                SignatureOutcome::ReviewPending {
                    version,
                    review_ends_at,
                }
            }
            _ => SignatureOutcome::Recorded { version },
        })
    }

    /// Advances every version whose attorney-review hold has elapsed to
    /// `fully_signed`. Returns the released versions; the caller runs
    /// lock-in resolution for each. Per-version failures are logged and
    /// skipped so one bad record cannot stall the sweep.
    pub async fn release_review_holds(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<AgreementVersion>, SignatureError> {
        let in_review = self.store.agreements_in_review().await?;
        let mut released = Vec::new();

        for mut version in in_review {
            let Some(ends_at) = version.review_ends_at else {
                tracing::warn!(
                    version_id = %version.id,
                    "agreement in review has no hold end, skipping"
                );
                continue;
            };
            if ends_at > now {
                continue;
            }

            let room = match self.active_room_for(&version).await {
                Ok(room) => room,
                Err(err) => {
                    tracing::warn!(
                        version_id = %version.id,
                        error = %err,
                        "failed to resolve room for review release"
                    );
                    continue;
                }
            };

            version.status = AgreementStatus::FullySigned;
            version.updated_at = Utc::now();
            if let Err(err) = self.commit(&version, &room).await {
                tracing::warn!(
                    version_id = %version.id,
                    error = %err,
                    "failed to release review hold"
                );
                continue;
            }

            self.audit
                .record(
                    &version.deal_id,
                    Some(&room.id),
                    ParticipantRole::Admin,
                    "system",
                    actions::REVIEW_RELEASED,
                    serde_json::json!({
                        "agreement_id": version.id,
                        "version": version.version,
                        "hold_ended_at": ends_at,
                    }),
                )
                .await;

            released.push(version);
        }

        Ok(released)
    }
}
