//! Signature tracking error types.

use thiserror::Error;

use crate::model::{AgreementStatus, PartyRole};
use crate::store::StoreError;

/// Errors from signature tracking operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SignatureError {
    /// The transition is not legal from the version's current status.
    #[error("agreement {version_id} is {status}, cannot {action}")]
    InvalidTransition {
        /// The agreement version.
        version_id: String,
        /// Its current status.
        status: AgreementStatus,
        /// The attempted action.
        action: &'static str,
    },

    /// The role has already signed this version.
    #[error("{role} already signed agreement {version_id}")]
    AlreadySigned {
        /// The agreement version.
        version_id: String,
        /// The role that tried to sign again.
        role: PartyRole,
    },

    /// The signature targets a version that is no longer the room's
    /// current agreement (terms changed and the document was regenerated
    /// while the signature was in flight).
    #[error("agreement {version_id} is not the active version for its room")]
    StaleVersion {
        /// The stale version.
        version_id: String,
        /// The room's current version, if any.
        current_id: Option<String>,
    },

    /// Signatures can only be recorded against room-scoped versions.
    /// Legacy deal-scoped versions are migration data.
    #[error("agreement {version_id} is deal-scoped; signatures require a room scope")]
    LegacyScope {
        /// The legacy version.
        version_id: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
