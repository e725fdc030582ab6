//! E-signature provider seam.
//!
//! Envelope creation, recipient-view URLs, signature-completion webhooks,
//! and envelope voiding are delegated to a hosted provider. The engine
//! consumes the trait below and treats provider failures as external: they
//! surface with detail but never corrupt local agreement state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AgreementVersion, PartyRole};

/// Errors from the e-signature provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EsignError {
    /// The provider rejected or failed the call.
    #[error("e-signature provider error: {detail}")]
    Provider {
        /// Provider-supplied detail.
        detail: String,
    },

    /// The referenced envelope does not exist at the provider.
    #[error("envelope not found: {envelope_id}")]
    EnvelopeNotFound {
        /// The unknown envelope id.
        envelope_id: String,
    },
}

/// Signature-completion webhook payload, as delivered by the provider.
///
/// The service resolves the envelope to its agreement version and feeds the
/// completion into the signature tracker. Deliveries may be retried by the
/// provider; the tracker's idempotency rules absorb duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureCompleted {
    /// The envelope the signature belongs to.
    pub envelope_id: String,
    /// Which party signed.
    pub signer_role: PartyRole,
    /// Provider-side identity marker of the signer.
    pub signer_id: String,
    /// When the provider recorded the signature.
    pub completed_at: DateTime<Utc>,
}

/// The hosted e-signature collaborator.
#[async_trait]
pub trait EsignProvider: Send + Sync {
    /// Creates an envelope for a rendered agreement version and returns the
    /// provider's envelope id.
    async fn create_envelope(&self, version: &AgreementVersion) -> Result<String, EsignError>;

    /// Issues a short-lived signing-session URL for one recipient.
    async fn recipient_view_url(
        &self,
        envelope_id: &str,
        role: PartyRole,
    ) -> Result<String, EsignError>;

    /// Voids an envelope so no further signatures can be captured on it.
    /// Voiding an already-void envelope must succeed.
    async fn void_envelope(&self, envelope_id: &str, reason: &str) -> Result<(), EsignError>;
}
