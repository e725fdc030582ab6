//! Agreement versioning service.
//!
//! Every negotiation round that changes terms produces a new, immutable
//! agreement version: a rendered contract plus a SHA-256 content hash over
//! the terms snapshot and document body. Versions are strictly increasing
//! per scope; creating a new one retires the prior one. Nothing here ever
//! mutates an existing version except to flip its status.
//!
//! # Failure semantics
//!
//! Rendering and hashing happen before any record is written, so a failed
//! render leaves no partial state. The room's `current_agreement_id`
//! pointer is updated last and defines which version is active; a retry
//! that finds the current version still in `draft` with an identical
//! content hash returns it instead of creating a second live version.

mod error;
mod render;


use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::info;

pub use error::AgreementError;
pub use render::{DocumentRenderer, RenderError, RenderedDocument, TextTemplateRenderer};

use crate::audit::{AuditRecorder, actions};
use crate::model::{
    AgreementStatus, AgreementVersion, NegotiationScope, ParticipantRole, Room, SignerMode,
};
use crate::store::EntityStore;
use crate::terms::Terms;

/// Produces and retires agreement versions.
pub struct VersioningService {
    store: Arc<dyn EntityStore>,
    renderer: Arc<dyn DocumentRenderer>,
    audit: AuditRecorder,
}

impl VersioningService {
    /// Creates a service over the given store and renderer.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, renderer: Arc<dyn DocumentRenderer>) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store));
        Self {
            store,
            renderer,
            audit,
        }
    }

    /// Hex-encoded SHA-256 over the terms snapshot and the rendered body.
    #[must_use]
    pub fn content_hash(terms: &Terms, body: &str) -> String {
        let mut hasher = Sha256::new();
        // Struct fields serialize in declaration order, so this is a
        // stable encoding of the snapshot.
        hasher.update(serde_json::to_vec(terms).unwrap_or_default());
        hasher.update([0u8]);
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Recomputes the hash of a version against a document body fetched
    /// from the rendering collaborator.
    #[must_use]
    pub fn verify_hash(version: &AgreementVersion, body: &str) -> bool {
        Self::content_hash(&version.terms, body) == version.content_hash
    }

    /// Produces a new signable version for a room from its current
    /// effective terms, retiring the prior version. Also serves initial
    /// generation: a room with no version yet gets version 1.
    pub async fn regenerate(
        &self,
        room_id: &str,
        actor_role: ParticipantRole,
        actor_id: &str,
    ) -> Result<AgreementVersion, AgreementError> {
        let room = self.store.get_room(room_id).await?;
        if !room.is_live() {
            return Err(AgreementError::RoomClosed {
                room_id: room.id,
                status: room.request_status,
            });
        }
        let deal = self.store.get_deal(&room.deal_id).await?;

        // Render and hash first: a provider failure must abort with no
        // record written and no pointer moved.
        let rendered = self
            .renderer
            .render(&room.terms, &deal, &room)
            .await
            .map_err(|err| AgreementError::RenderFailed {
                detail: err.to_string(),
            })?;
        let hash = Self::content_hash(&room.terms, &rendered.body);

        let scope = NegotiationScope::Room(room.id.clone());
        let existing = self.store.agreements_for_scope(&scope).await?;

        // Duplicate-call guard: an identical draft is already the current
        // version, so hand it back instead of minting another.
        if let Some(current_id) = &room.current_agreement_id {
            if let Some(current) = existing.iter().find(|v| &v.id == current_id) {
                if current.status == AgreementStatus::Draft && current.content_hash == hash {
                    return Ok(current.clone());
                }
            }
        }

        let next_version = existing.iter().map(|v| v.version).max().unwrap_or(0) + 1;
        let version = AgreementVersion::new(
            scope.clone(),
            &room.deal_id,
            next_version,
            SignerMode::DualSign,
            room.terms.clone(),
            hash,
            &rendered.reference,
            &deal.property.state,
        );
        let version = self.store.create_agreement(version).await?;

        // Retire every still-open prior version of this scope.
        for prior in existing.iter().filter(|v| v.status.is_voidable()) {
            let mut retired = prior.clone();
            retired.status = AgreementStatus::Superseded;
            retired.updated_at = chrono::Utc::now();
            self.store.update_agreement(&retired).await?;
            self.audit
                .record(
                    &room.deal_id,
                    Some(&room.id),
                    actor_role,
                    actor_id,
                    actions::AGREEMENT_SUPERSEDED,
                    serde_json::json!({
                        "agreement_id": retired.id,
                        "version": retired.version,
                        "replaced_by": version.id,
                    }),
                )
                .await;
        }

        // Repoint the room last: this write is what makes the new version
        // the active one.
        let updated_room = Room {
            current_agreement_id: Some(version.id.clone()),
            agreement_status: AgreementStatus::Draft,
            updated_at: chrono::Utc::now(),
            ..room.clone()
        };
        self.store.update_room(&updated_room).await?;

        info!(
            room_id = %room.id,
            deal_id = %room.deal_id,
            version = version.version,
            "generated agreement version"
        );
        self.audit
            .record(
                &room.deal_id,
                Some(&room.id),
                actor_role,
                actor_id,
                actions::AGREEMENT_GENERATED,
                serde_json::json!({
                    "agreement_id": version.id,
                    "version": version.version,
                    "content_hash": version.content_hash,
                }),
            )
            .await;

        Ok(version)
    }
}
