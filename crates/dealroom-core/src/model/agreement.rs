//! Agreement version entity: an immutable, hashed contract snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NegotiationScope, PartyRole, new_id};
use crate::terms::Terms;

/// Agreement signature lifecycle.
///
/// ```text
/// draft -> sent -> investor_signed -> fully_signed
///                         |                ^
///                         |   (review-hold |
///                         v    governing   |
///                  attorney_review_pending-+
///                         states)
/// ```
///
/// `voided` is reachable from any non-terminal state; `superseded` marks a
/// version replaced by regeneration. `agent_signed` appears only in data
/// migrated from before the review hold existed: the tracker records the
/// agent signature and the terminal status in a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    /// Generated but not yet out for signature.
    Draft,
    /// Envelope sent; awaiting the investor.
    Sent,
    /// Investor has signed; awaiting the agent.
    InvestorSigned,
    /// Legacy: agent signed, terminal status not yet derived.
    AgentSigned,
    /// Both parties signed; mandatory attorney-review hold running.
    AttorneyReviewPending,
    /// Fully executed.
    FullySigned,
    /// Cancelled (lost the lock race, deal abandoned, or sibling voiding).
    Voided,
    /// Replaced by a newer version of the same scope.
    Superseded,
}

impl AgreementStatus {
    /// Whether this status can still move forward in the signing machine.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            Self::Draft
                | Self::Sent
                | Self::InvestorSigned
                | Self::AgentSigned
                | Self::AttorneyReviewPending
        )
    }

    /// Whether sibling voiding still applies to a version in this status.
    /// Only already-retired versions are skipped.
    #[must_use]
    pub const fn is_voidable(self) -> bool {
        !matches!(self, Self::Voided | Self::Superseded)
    }
}

impl std::fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Sent => write!(f, "sent"),
            Self::InvestorSigned => write!(f, "investor_signed"),
            Self::AgentSigned => write!(f, "agent_signed"),
            Self::AttorneyReviewPending => write!(f, "attorney_review_pending"),
            Self::FullySigned => write!(f, "fully_signed"),
            Self::Voided => write!(f, "voided"),
            Self::Superseded => write!(f, "superseded"),
        }
    }
}

/// Which parties must sign for the version to become fully executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerMode {
    /// Investor signs first, then the agent (the negotiation path).
    #[default]
    DualSign,
    /// Investor-only documents (base terms acknowledgements). Fully
    /// executed at the investor's signature; never triggers lock-in.
    InvestorOnly,
}

/// One captured signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBlock {
    /// Identity marker of the signer (profile id).
    pub signer_id: String,
    /// When the provider recorded the signature.
    pub signed_at: DateTime<Utc>,
}

/// An immutable rendered-contract snapshot for one negotiation round.
///
/// After creation, the only legal mutations are status flips (forward
/// through the signing machine, or to `voided`/`superseded`), signature
/// capture, and the envelope id assigned when the document goes out.
/// Signatures are valid only against the version they were captured on;
/// regeneration produces a strictly higher `version` and retires this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementVersion {
    /// Entity id.
    pub id: String,
    /// Negotiation scope (room, or legacy deal-wide).
    pub scope: NegotiationScope,
    /// The enclosing deal.
    pub deal_id: String,
    /// Sequence number, strictly increasing per scope.
    pub version: u32,
    /// Signing machine status.
    pub status: AgreementStatus,
    /// Required signer set.
    pub signer_mode: SignerMode,
    /// Terms this document was rendered from.
    pub terms: Terms,
    /// Hex-encoded SHA-256 over the terms snapshot and rendered body.
    pub content_hash: String,
    /// Handle to the rendered document at the rendering collaborator.
    pub document_ref: String,
    /// E-signature envelope, once one has been created.
    pub envelope_id: Option<String>,
    /// Two-letter governing state, taken from the property.
    pub governing_state: String,
    /// Investor signature, once captured.
    pub investor_signature: Option<SignatureBlock>,
    /// Agent signature, once captured.
    pub agent_signature: Option<SignatureBlock>,
    /// End of the attorney-review hold, when one applies.
    pub review_ends_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status mutation time.
    pub updated_at: DateTime<Utc>,
}

impl AgreementVersion {
    /// Creates a draft version with no signatures.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        scope: NegotiationScope,
        deal_id: impl Into<String>,
        version: u32,
        signer_mode: SignerMode,
        terms: Terms,
        content_hash: impl Into<String>,
        document_ref: impl Into<String>,
        governing_state: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            scope,
            deal_id: deal_id.into(),
            version,
            status: AgreementStatus::Draft,
            signer_mode,
            terms,
            content_hash: content_hash.into(),
            document_ref: document_ref.into(),
            envelope_id: None,
            governing_state: governing_state.into(),
            investor_signature: None,
            agent_signature: None,
            review_ends_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The captured signature for a role, if any.
    #[must_use]
    pub fn signature_for(&self, role: PartyRole) -> Option<&SignatureBlock> {
        match role {
            PartyRole::Investor => self.investor_signature.as_ref(),
            PartyRole::Agent => self.agent_signature.as_ref(),
        }
    }

    /// Whether the given role has already signed this version.
    #[must_use]
    pub fn is_signed_by(&self, role: PartyRole) -> bool {
        self.signature_for(role).is_some()
    }
}
