//! Operation handlers.
//!
//! [`DealService`] wires the core components together behind the exposed
//! operations. Handlers are stateless with respect to the process: every
//! piece of coordination state lives behind the entity store, so any
//! worker can serve any request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dealroom_core::agreement::{DocumentRenderer, VersioningService};
use dealroom_core::audit::{AuditRecorder, actions};
use dealroom_core::esign::{EsignProvider, SignatureCompleted};
use dealroom_core::filter::ContactScanner;
use dealroom_core::lockin::{LockInResolver, LockResolution};
use dealroom_core::model::{AgreementStatus, ParticipantRole, PartyRole, SignerMode};
use dealroom_core::negotiation::NegotiationLedger;
use dealroom_core::redaction::redact;
use dealroom_core::signature::{ReviewHoldPolicy, SignatureOutcome, SignatureTracker};
use dealroom_core::store::{EntityStore, RetryPolicy};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::protocol::{
    AcceptCounterResponse, ApiError, ApiResponse, CounterDecisionRequest, ErrorCode, LockSummary,
    MessageReceipt, ProposeCounterRequest, RecordSignatureRequest, RegenerateAgreementRequest,
    RoomView, RoomViewRequest, SendForSignatureRequest, SendForSignatureResponse,
    SendMessageRequest, SignatureResult, SigningSessionRequest, SigningSessionResponse,
    SweepSummary, blocked_categories_message,
};

/// The negotiation engine's callable surface.
pub struct DealService {
    store: Arc<dyn EntityStore>,
    esign: Arc<dyn EsignProvider>,
    ledger: NegotiationLedger,
    versioning: VersioningService,
    tracker: SignatureTracker,
    resolver: LockInResolver,
    scanner: ContactScanner,
    audit: AuditRecorder,
    retry: RetryPolicy,
    config: ServiceConfig,
}

impl DealService {
    /// Assembles the service from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        renderer: Arc<dyn DocumentRenderer>,
        esign: Arc<dyn EsignProvider>,
        config: ServiceConfig,
    ) -> Self {
        let review = ReviewHoldPolicy::new(
            config.review_hold_states.iter().cloned(),
            config.review_hold_business_days,
        );
        Self {
            ledger: NegotiationLedger::new(Arc::clone(&store)),
            versioning: VersioningService::new(Arc::clone(&store), renderer),
            tracker: SignatureTracker::new(Arc::clone(&store), review),
            resolver: LockInResolver::new(Arc::clone(&store)),
            scanner: ContactScanner::new(),
            audit: AuditRecorder::new(Arc::clone(&store)),
            retry: RetryPolicy::new(config.retry.clone()),
            esign,
            store,
            config,
        }
    }

    /// Proposes a counter-offer in a scope.
    pub async fn propose_counter(
        &self,
        req: ProposeCounterRequest,
    ) -> ApiResponse<dealroom_core::model::CounterOffer> {
        match self
            .ledger
            .propose_counter(&req.scope, req.from_role, &req.actor_id, req.delta)
            .await
        {
            Ok(counter) => ApiResponse::ok(counter),
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Accepts a counter-offer and regenerates the room's agreement.
    ///
    /// The two sub-steps are reported together: if regeneration fails after
    /// the acceptance committed, the response is a
    /// [`ErrorCode::PartialFailure`] naming the completed step.
    pub async fn accept_counter(
        &self,
        req: CounterDecisionRequest,
    ) -> ApiResponse<AcceptCounterResponse> {
        let accepted = match self
            .ledger
            .accept_counter(&req.counter_id, req.actor_role, &req.actor_id)
            .await
        {
            Ok(accepted) => accepted,
            Err(err) => return ApiError::from(err).into(),
        };

        match self
            .versioning
            .regenerate(&accepted.room.id, req.actor_role.into(), &req.actor_id)
            .await
        {
            Ok(agreement) => ApiResponse::ok(AcceptCounterResponse {
                counter: accepted.counter,
                agreement,
            }),
            Err(err) => ApiResponse::err(ApiError::new(
                ErrorCode::PartialFailure,
                format!(
                    "counter-offer {} accepted, but agreement regeneration failed: {err}",
                    accepted.counter.id
                ),
            )),
        }
    }

    /// Rejects a counter-offer.
    pub async fn reject_counter(
        &self,
        req: CounterDecisionRequest,
    ) -> ApiResponse<dealroom_core::model::CounterOffer> {
        match self
            .ledger
            .reject_counter(&req.counter_id, req.actor_role, &req.actor_id)
            .await
        {
            Ok(counter) => ApiResponse::ok(counter),
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Regenerates a room's agreement after a terms change.
    pub async fn regenerate_agreement(
        &self,
        req: RegenerateAgreementRequest,
    ) -> ApiResponse<dealroom_core::model::AgreementVersion> {
        match self
            .versioning
            .regenerate(&req.room_id, req.actor_role, &req.actor_id)
            .await
        {
            Ok(version) => ApiResponse::ok(version),
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Creates an e-signature envelope for a room's current draft and marks
    /// it sent. A provider failure aborts before any local mutation.
    pub async fn send_for_signature(
        &self,
        req: SendForSignatureRequest,
    ) -> ApiResponse<SendForSignatureResponse> {
        let room = match self.store.get_room(&req.room_id).await {
            Ok(room) => room,
            Err(err) => return ApiError::from(err).into(),
        };
        if room.investor_id != req.actor_id {
            return ApiError::new(
                ErrorCode::Unauthorized,
                format!("only the investor may send room {} for signature", room.id),
            )
            .into();
        }
        let Some(version_id) = room.current_agreement_id.clone() else {
            return ApiError::new(
                ErrorCode::InvalidState,
                format!("room {} has no agreement to send", room.id),
            )
            .into();
        };
        let version = match self.store.get_agreement(&version_id).await {
            Ok(version) => version,
            Err(err) => return ApiError::from(err).into(),
        };

        let envelope_id = match self.esign.create_envelope(&version).await {
            Ok(envelope_id) => envelope_id,
            Err(err) => return ApiError::from(err).into(),
        };

        match self
            .tracker
            .mark_sent(
                &version.id,
                Some(&envelope_id),
                ParticipantRole::Investor,
                &req.actor_id,
            )
            .await
        {
            Ok(agreement) => ApiResponse::ok(SendForSignatureResponse {
                agreement,
                envelope_id,
            }),
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Issues a signing-session URL for one recipient of the room's sent
    /// agreement.
    pub async fn signing_session(
        &self,
        req: SigningSessionRequest,
    ) -> ApiResponse<SigningSessionResponse> {
        let room = match self.store.get_room(&req.room_id).await {
            Ok(room) => room,
            Err(err) => return ApiError::from(err).into(),
        };
        let participant = match req.role {
            PartyRole::Investor => &room.investor_id,
            PartyRole::Agent => &room.agent_id,
        };
        if participant != &req.actor_id {
            return ApiError::new(
                ErrorCode::Unauthorized,
                format!("actor is not the {} of room {}", req.role, room.id),
            )
            .into();
        }
        let Some(version_id) = room.current_agreement_id.clone() else {
            return ApiError::new(
                ErrorCode::InvalidState,
                format!("room {} has no agreement out for signature", room.id),
            )
            .into();
        };
        let version = match self.store.get_agreement(&version_id).await {
            Ok(version) => version,
            Err(err) => return ApiError::from(err).into(),
        };
        let Some(envelope_id) = version.envelope_id.clone() else {
            return ApiError::new(
                ErrorCode::InvalidState,
                format!("agreement {} has not been sent", version.id),
            )
            .into();
        };
        match self.esign.recipient_view_url(&envelope_id, req.role).await {
            Ok(url) => ApiResponse::ok(SigningSessionResponse { url, envelope_id }),
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Records a signature and, when it completes the agreement, resolves
    /// the deal lock.
    pub async fn record_signature(
        &self,
        req: RecordSignatureRequest,
    ) -> ApiResponse<SignatureResult> {
        let outcome = match self
            .tracker
            .record_signature(&req.version_id, req.role, &req.signer_id, req.signed_at)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return ApiError::from(err).into(),
        };

        match outcome {
            SignatureOutcome::Recorded { version } => ApiResponse::ok(SignatureResult {
                agreement_status: version.status,
                review_ends_at: None,
                lock: None,
                detail: None,
            }),
            SignatureOutcome::ReviewPending {
                version,
                review_ends_at,
            } => ApiResponse::ok(SignatureResult {
                agreement_status: version.status,
                review_ends_at: Some(review_ends_at),
                lock: None,
                detail: None,
            }),
            SignatureOutcome::FullyExecuted { version } => {
                if version.signer_mode != SignerMode::DualSign {
                    // Investor-only documents never contest the deal.
                    return ApiResponse::ok(SignatureResult {
                        agreement_status: version.status,
                        review_ends_at: None,
                        lock: None,
                        detail: None,
                    });
                }
                self.resolve_lock(&version).await
            }
        }
    }

    /// Consumes a signature-completion webhook from the e-signature
    /// provider. Duplicate deliveries resolve as harmless repeats.
    pub async fn handle_signature_webhook(
        &self,
        payload: SignatureCompleted,
    ) -> ApiResponse<SignatureResult> {
        let version = match self.store.agreement_by_envelope(&payload.envelope_id).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                return ApiError::new(
                    ErrorCode::NotFound,
                    format!("no agreement for envelope {}", payload.envelope_id),
                )
                .into();
            }
            Err(err) => return ApiError::from(err).into(),
        };
        self.record_signature(RecordSignatureRequest {
            version_id: version.id,
            role: payload.signer_role,
            signer_id: payload.signer_id,
            signed_at: payload.completed_at,
        })
        .await
    }

    /// Runs lock-in resolution for a fully executed version and folds the
    /// outcome into a caller-facing result.
    async fn resolve_lock(
        &self,
        version: &dealroom_core::model::AgreementVersion,
    ) -> ApiResponse<SignatureResult> {
        let resolution = match self.resolver.on_agent_signature_completed(version).await {
            Ok(resolution) => resolution,
            Err(err) => return ApiError::from(err).into(),
        };

        match resolution {
            LockResolution::Won {
                room_id,
                voided_siblings,
                voided_envelopes,
                failures,
            } => {
                self.void_envelopes(&voided_envelopes, "deal locked to another room")
                    .await;
                ApiResponse::ok(SignatureResult {
                    agreement_status: AgreementStatus::FullySigned,
                    review_ends_at: None,
                    lock: Some(LockSummary {
                        won: true,
                        winning_room_id: room_id,
                        voided_siblings,
                        failed_steps: failures.len(),
                    }),
                    detail: None,
                })
            }
            LockResolution::AlreadyLocked { room_id } => ApiResponse::ok(SignatureResult {
                agreement_status: AgreementStatus::FullySigned,
                review_ends_at: None,
                lock: Some(LockSummary {
                    won: true,
                    winning_room_id: room_id,
                    voided_siblings: 0,
                    failed_steps: 0,
                }),
                detail: Some("duplicate completion; deal already locked to this room".to_string()),
            }),
            LockResolution::Lost {
                winning_room_id,
                voided_envelopes,
            } => {
                self.void_envelopes(&voided_envelopes, "another agent was selected")
                    .await;
                // Losing the race is a normal outcome for the signer, not
                // an error.
                ApiResponse::ok(SignatureResult {
                    agreement_status: AgreementStatus::Voided,
                    review_ends_at: None,
                    lock: Some(LockSummary {
                        won: false,
                        winning_room_id,
                        voided_siblings: 0,
                        failed_steps: 0,
                    }),
                    detail: Some("another agent was selected".to_string()),
                })
            }
        }
    }

    /// Voids envelopes at the provider, best-effort.
    async fn void_envelopes(&self, envelope_ids: &[String], reason: &str) {
        for envelope_id in envelope_ids {
            if let Err(err) = self.esign.void_envelope(envelope_id, reason).await {
                warn!(envelope_id, error = %err, "failed to void envelope at provider");
            }
        }
    }

    /// Delivers a message inside a room, subject to the anti-circumvention
    /// filter until the room's agreement is fully signed.
    pub async fn send_message(&self, req: SendMessageRequest) -> ApiResponse<MessageReceipt> {
        let room = match self.store.get_room(&req.room_id).await {
            Ok(room) => room,
            Err(err) => return ApiError::from(err).into(),
        };
        let participant = match req.sender_role {
            PartyRole::Investor => &room.investor_id,
            PartyRole::Agent => &room.agent_id,
        };
        if participant != &req.sender_id {
            return ApiError::new(
                ErrorCode::Unauthorized,
                format!("sender is not the {} of room {}", req.sender_role, room.id),
            )
            .into();
        }

        let filtered = self.config.filter_enabled && !room.is_fully_signed();
        if filtered {
            let violations = self.scanner.scan(&req.body);
            if !violations.is_empty() {
                let categories: Vec<_> = violations.iter().map(|v| v.category).collect();
                // The body is rejected, not stored; the audit entry carries
                // categories only.
                self.audit
                    .record(
                        &room.deal_id,
                        Some(&room.id),
                        req.sender_role.into(),
                        &req.sender_id,
                        actions::MESSAGE_BLOCKED,
                        serde_json::json!({ "categories": categories }),
                    )
                    .await;
                return ApiError::new(
                    ErrorCode::ContentBlocked,
                    blocked_categories_message(&categories),
                )
                .into();
            }
        }

        ApiResponse::ok(MessageReceipt {
            delivered: true,
            filtered,
        })
    }

    /// Returns a room with the deal redacted per the viewer and this
    /// room's agreement status.
    pub async fn room_view(&self, req: RoomViewRequest) -> ApiResponse<RoomView> {
        let room = match self
            .retry
            .run("get_room", || self.store.get_room(&req.room_id))
            .await
        {
            Ok(room) => room,
            Err(err) => return ApiError::from(err).into(),
        };

        let authorized = match req.viewer_role {
            ParticipantRole::Investor => room.investor_id == req.viewer_id,
            ParticipantRole::Agent => room.agent_id == req.viewer_id,
            ParticipantRole::Admin => true,
        };
        if !authorized {
            return ApiError::new(
                ErrorCode::Unauthorized,
                format!("viewer is not a participant of room {}", room.id),
            )
            .into();
        }

        let deal = match self
            .retry
            .run("get_deal", || self.store.get_deal(&room.deal_id))
            .await
        {
            Ok(deal) => deal,
            Err(err) => return ApiError::from(err).into(),
        };

        let current_agreement = match &room.current_agreement_id {
            Some(id) => match self.store.get_agreement(id).await {
                Ok(version) => Some(version),
                Err(err) => return ApiError::from(err).into(),
            },
            None => None,
        };
        let scope = dealroom_core::model::NegotiationScope::Room(room.id.clone());
        let pending_counter = match self.store.pending_counter_for_scope(&scope).await {
            Ok(counter) => counter,
            Err(err) => return ApiError::from(err).into(),
        };

        let view = redact(&deal, &room, req.viewer_role);
        ApiResponse::ok(RoomView {
            room_id: room.id.clone(),
            request_status: room.request_status,
            agreement_status: room.agreement_status,
            current_agreement,
            pending_counter,
            deal: view,
        })
    }

    /// Administrative lock reversal.
    pub async fn admin_unlock(&self, deal_id: &str, actor_id: &str) -> ApiResponse<()> {
        match self.resolver.admin_unlock(deal_id, actor_id).await {
            Ok(()) => ApiResponse::ok(()),
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Administrative purge: removes an abandoned deal and every child
    /// record (rooms, counter-offers, agreements, activities last).
    pub async fn admin_purge_deal(&self, deal_id: &str, actor_id: &str) -> ApiResponse<()> {
        tracing::info!(deal_id, actor_id, "purging deal and all children");
        match self.store.purge_deal(deal_id).await {
            Ok(()) => ApiResponse::ok(()),
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Runs the periodic sweeps: releases elapsed attorney-review holds
    /// (resolving lock-in for each released agreement) and re-applies
    /// sibling voiding for every locked deal.
    pub async fn run_sweeps(&self, now: DateTime<Utc>) -> ApiResponse<SweepSummary> {
        let mut summary = SweepSummary::default();

        match self.tracker.release_review_holds(now).await {
            Ok(released) => {
                summary.released_reviews = released.len();
                for version in &released {
                    if version.signer_mode != SignerMode::DualSign {
                        continue;
                    }
                    summary.lock_resolutions += 1;
                    match self.resolver.on_agent_signature_completed(version).await {
                        Ok(LockResolution::Won {
                            voided_envelopes,
                            failures,
                            ..
                        }) => {
                            summary.failures += failures.len();
                            self.void_envelopes(&voided_envelopes, "deal locked to another room")
                                .await;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(version_id = %version.id, error = %err, "lock resolution failed in sweep");
                            summary.failures += 1;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "review-hold release failed");
                summary.failures += 1;
            }
        }

        let locked = match self
            .retry
            .run("locked_deals", || self.store.locked_deals())
            .await
        {
            Ok(deals) => deals,
            Err(err) => {
                warn!(error = %err, "failed to enumerate locked deals");
                summary.failures += 1;
                return ApiResponse::ok(summary);
            }
        };
        for deal in locked {
            match self.resolver.sweep(&deal.id).await {
                Ok(report) => {
                    summary.repaired_rooms += report.repaired_rooms;
                    summary.repaired_versions += report.repaired_versions;
                    summary.failures += report.failures.len();
                }
                Err(err) => {
                    warn!(deal_id = %deal.id, error = %err, "lock sweep failed");
                    summary.failures += 1;
                }
            }
        }

        ApiResponse::ok(summary)
    }
}
