//! Document rendering seam.
//!
//! PDF production is an external collaborator; the engine only needs a
//! deterministic body to hash and a handle to the stored document.
//! [`TextTemplateRenderer`] is the in-process reference implementation used
//! by tests and local tooling.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Deal, Room};
use crate::terms::Terms;

/// Errors from the rendering collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The renderer rejected or failed the request.
    #[error("renderer error: {detail}")]
    Provider {
        /// Renderer-supplied detail.
        detail: String,
    },
}

/// A rendered agreement document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Handle to the stored document at the collaborator.
    pub reference: String,
    /// The document body the content hash covers. Must be deterministic
    /// for a given terms snapshot, or the duplicate-call guard in
    /// regeneration cannot recognize retries.
    pub body: String,
}

/// The document rendering collaborator.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Renders an exclusivity agreement from a room's effective terms.
    async fn render(
        &self,
        terms: &Terms,
        deal: &Deal,
        room: &Room,
    ) -> Result<RenderedDocument, RenderError>;
}

/// Plain-text reference renderer.
///
/// The body deliberately names the property by city/state only: the exact
/// address stays behind the redaction gate until the agreement is fully
/// signed, and the contract concerns representation exclusivity, not the
/// parcel.
#[derive(Debug, Clone, Default)]
pub struct TextTemplateRenderer;

impl TextTemplateRenderer {
    /// Creates the renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentRenderer for TextTemplateRenderer {
    async fn render(
        &self,
        terms: &Terms,
        deal: &Deal,
        room: &Room,
    ) -> Result<RenderedDocument, RenderError> {
        let mut body = format!(
            "EXCLUSIVE REPRESENTATION AGREEMENT\n\
             \n\
             Property: {}, {}\n\
             Investor: {}\n\
             Agent: {}\n\
             \n\
             Compensation: {}\n\
             Term: {} months of exclusive representation\n",
            deal.property.city,
            deal.property.state,
            room.investor_id,
            room.agent_id,
            terms.compensation.describe(),
            terms.agreement_length_months,
        );
        if let Some(notes) = &terms.notes {
            body.push_str("\nRider: ");
            body.push_str(notes);
            body.push('\n');
        }
        Ok(RenderedDocument {
            reference: format!("doc://agreements/{}/{}", deal.id, room.id),
            body,
        })
    }
}
