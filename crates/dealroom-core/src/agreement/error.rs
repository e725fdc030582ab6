//! Agreement versioning error types.

use thiserror::Error;

use crate::model::RequestStatus;
use crate::store::StoreError;

/// Errors from agreement versioning operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgreementError {
    /// The room is no longer open for negotiation.
    #[error("room {room_id} is {status}, agreements can no longer be generated")]
    RoomClosed {
        /// The room.
        room_id: String,
        /// Its request status.
        status: RequestStatus,
    },

    /// The rendering collaborator failed; nothing was written.
    #[error("document rendering failed: {detail}")]
    RenderFailed {
        /// Renderer-supplied detail.
        detail: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
