//! Typed requests, responses, and the error-code taxonomy.
//!
//! Every operation returns an [`ApiResponse`]: a success flag with either
//! the operation's data or an [`ApiError`] carrying a typed [`ErrorCode`].
//! Losing the lock race is deliberately not an error: the losing side
//! receives a successful [`SignatureResult`] whose `detail` says another
//! agent was selected.

use chrono::{DateTime, Utc};
use dealroom_core::agreement::AgreementError;
use dealroom_core::esign::EsignError;
use dealroom_core::filter::ViolationCategory;
use dealroom_core::lockin::LockInError;
use dealroom_core::model::{
    AgreementStatus, AgreementVersion, CounterOffer, NegotiationScope, ParticipantRole, PartyRole,
    RequestStatus,
};
use dealroom_core::negotiation::NegotiationError;
use dealroom_core::redaction::RedactedDealView;
use dealroom_core::signature::SignatureError;
use dealroom_core::store::StoreError;
use dealroom_core::terms::TermsDelta;
use serde::{Deserialize, Serialize};

/// Typed error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The caller's role or identity does not match the scope.
    Unauthorized,
    /// A referenced deal, room, counter-offer, or agreement is missing.
    NotFound,
    /// The transition is not legal from the current status.
    InvalidState,
    /// A concurrent writer got there first.
    Conflict,
    /// The signature or rendering provider failed; local state is intact.
    ExternalProvider,
    /// A multi-step operation committed its primary outcome but some
    /// sub-steps failed; the message says which.
    PartialFailure,
    /// The message was blocked by the anti-circumvention filter.
    ContentBlocked,
    /// Unclassified failure.
    Internal,
}

/// A typed operation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error class.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl ApiError {
    /// Creates an error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Success flag plus data or a typed error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Operation data on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure detail otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// A successful response.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed response.
    #[must_use]
    pub fn err(error: ApiError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    /// The error code, when the response failed.
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

impl<T> From<ApiError> for ApiResponse<T> {
    fn from(error: ApiError) -> Self {
        Self::err(error)
    }
}

// ── Requests ────────────────────────────────────────────────────────────

/// Propose a counter-offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeCounterRequest {
    /// Negotiation scope (room, or legacy deal).
    pub scope: NegotiationScope,
    /// The proposing party.
    pub from_role: PartyRole,
    /// The proposer's identity.
    pub actor_id: String,
    /// The proposed change.
    pub delta: TermsDelta,
}

/// Respond to a pending counter-offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterDecisionRequest {
    /// The counter-offer.
    pub counter_id: String,
    /// The responding party.
    pub actor_role: PartyRole,
    /// The responder's identity.
    pub actor_id: String,
}

/// Regenerate a room's agreement from its current terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateAgreementRequest {
    /// The room.
    pub room_id: String,
    /// Role of the caller (for the audit trail).
    pub actor_role: ParticipantRole,
    /// The caller's identity.
    pub actor_id: String,
}

/// Send a room's current draft agreement out for signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendForSignatureRequest {
    /// The room.
    pub room_id: String,
    /// The caller's identity (the investor initiates sends).
    pub actor_id: String,
}

/// Record one party's signature on an agreement version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSignatureRequest {
    /// The agreement version being signed.
    pub version_id: String,
    /// The signing party.
    pub role: PartyRole,
    /// The signer's identity.
    pub signer_id: String,
    /// When the signature was captured.
    pub signed_at: DateTime<Utc>,
}

/// Issue a signing-session URL for one recipient of a sent agreement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningSessionRequest {
    /// The room.
    pub room_id: String,
    /// The recipient party.
    pub role: PartyRole,
    /// The recipient's identity.
    pub actor_id: String,
}

/// A short-lived signing-session URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningSessionResponse {
    /// The provider URL the recipient opens to sign.
    pub url: String,
    /// The envelope the session belongs to.
    pub envelope_id: String,
}

/// Send a message inside a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// The room.
    pub room_id: String,
    /// The sending party.
    pub sender_role: PartyRole,
    /// The sender's identity.
    pub sender_id: String,
    /// Message body.
    pub body: String,
}

/// Fetch a room view, subject to the redaction gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomViewRequest {
    /// The room.
    pub room_id: String,
    /// The viewer's role.
    pub viewer_role: ParticipantRole,
    /// The viewer's identity.
    pub viewer_id: String,
}

// ── Responses ───────────────────────────────────────────────────────────

/// Result of accepting a counter-offer: both sub-steps reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptCounterResponse {
    /// The accepted offer.
    pub counter: CounterOffer,
    /// The regenerated agreement version for the room.
    pub agreement: AgreementVersion,
}

/// Result of sending an agreement for signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendForSignatureResponse {
    /// The sent version.
    pub agreement: AgreementVersion,
    /// The e-signature envelope created for it.
    pub envelope_id: String,
}

/// How a lock-in attempt resolved, summarized for callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockSummary {
    /// Whether this room now holds the deal.
    pub won: bool,
    /// The room holding the deal.
    pub winning_room_id: String,
    /// Sibling rooms voided during resolution (winner side only).
    #[serde(default)]
    pub voided_siblings: usize,
    /// Cleanup steps that failed and were left to the reconciliation
    /// sweep.
    #[serde(default)]
    pub failed_steps: usize,
}

/// Result of recording a signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureResult {
    /// The version's status after the signature.
    pub agreement_status: AgreementStatus,
    /// End of the attorney-review hold, when one started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_ends_at: Option<DateTime<Utc>>,
    /// Lock resolution, when the signature completed the agreement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockSummary>,
    /// Caller-facing note, e.g. that another agent was selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Receipt for an accepted message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Always `true`: rejected messages come back as a
    /// [`ErrorCode::ContentBlocked`] error instead.
    pub delivered: bool,
    /// Whether the filter ran (it is bypassed once fully signed).
    pub filtered: bool,
}

/// A room as seen by one viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    /// The room.
    pub room_id: String,
    /// Request lifecycle status.
    pub request_status: RequestStatus,
    /// Agreement status mirror.
    pub agreement_status: AgreementStatus,
    /// The currently active agreement version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_agreement: Option<AgreementVersion>,
    /// The pending counter-offer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_counter: Option<CounterOffer>,
    /// The deal, redacted per the viewer and this room's status.
    pub deal: RedactedDealView,
}

/// Summary of one periodic sweep pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Review holds released to `fully_signed`.
    pub released_reviews: usize,
    /// Lock resolutions run for released holds.
    pub lock_resolutions: usize,
    /// Rooms repaired by lock reconciliation.
    pub repaired_rooms: usize,
    /// Agreement versions repaired by lock reconciliation.
    pub repaired_versions: usize,
    /// Steps that failed and will be retried next pass.
    pub failures: usize,
}

/// Formats blocked categories for an error message without echoing any
/// matched content.
#[must_use]
pub fn blocked_categories_message(categories: &[ViolationCategory]) -> String {
    let names: Vec<String> = categories.iter().map(ToString::to_string).collect();
    format!("message blocked by anti-circumvention filter: {}", names.join(", "))
}

// ── Error mapping ───────────────────────────────────────────────────────

impl From<&StoreError> for ErrorCode {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound,
            StoreError::Precondition { .. } => Self::InvalidState,
            StoreError::Duplicate { .. } => Self::Conflict,
            _ => Self::Internal,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(ErrorCode::from(&err), err.to_string())
    }
}

impl From<NegotiationError> for ApiError {
    fn from(err: NegotiationError) -> Self {
        let code = match &err {
            NegotiationError::NotParticipant { .. } => ErrorCode::Unauthorized,
            NegotiationError::RoomClosed { .. }
            | NegotiationError::NotPending { .. }
            | NegotiationError::NotTheRecipient { .. }
            | NegotiationError::EmptyDelta
            | NegotiationError::AmbiguousLegacyScope { .. } => ErrorCode::InvalidState,
            NegotiationError::Store(store) => ErrorCode::from(store),
            _ => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<AgreementError> for ApiError {
    fn from(err: AgreementError) -> Self {
        let code = match &err {
            AgreementError::RoomClosed { .. } => ErrorCode::InvalidState,
            AgreementError::RenderFailed { .. } => ErrorCode::ExternalProvider,
            AgreementError::Store(store) => ErrorCode::from(store),
            _ => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        let code = match &err {
            SignatureError::InvalidTransition { .. }
            | SignatureError::AlreadySigned { .. }
            | SignatureError::StaleVersion { .. }
            | SignatureError::LegacyScope { .. } => ErrorCode::InvalidState,
            SignatureError::Store(store) => ErrorCode::from(store),
            _ => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<LockInError> for ApiError {
    fn from(err: LockInError) -> Self {
        let code = match &err {
            LockInError::NotFullyExecuted { .. }
            | LockInError::LegacyScope { .. }
            | LockInError::DealNotLocked { .. } => ErrorCode::InvalidState,
            LockInError::Store(store) => ErrorCode::from(store),
            _ => ErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

impl From<EsignError> for ApiError {
    fn from(err: EsignError) -> Self {
        Self::new(ErrorCode::ExternalProvider, err.to_string())
    }
}
