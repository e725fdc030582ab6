//! Lock-in resolver error types.

use thiserror::Error;

use crate::model::AgreementStatus;
use crate::store::StoreError;

/// Errors from lock-in resolution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LockInError {
    /// Lock-in only fires for fully executed agreements.
    #[error("agreement {version_id} is {status}, not fully executed")]
    NotFullyExecuted {
        /// The agreement version.
        version_id: String,
        /// Its current status.
        status: AgreementStatus,
    },

    /// Legacy deal-scoped versions cannot win a deal.
    #[error("agreement {version_id} is deal-scoped; lock-in requires a room scope")]
    LegacyScope {
        /// The legacy version.
        version_id: String,
    },

    /// The deal has no winner fixed, so there is nothing to sweep or
    /// unlock.
    #[error("deal {deal_id} is not locked")]
    DealNotLocked {
        /// The deal.
        deal_id: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
