//! Typed deal terms and counter-offer deltas.
//!
//! Terms are a closed, typed model rather than an open map: the compensation
//! structure is a tagged union of the supported models, which keeps the
//! merge and snapshot operations in the negotiation ledger total and
//! type-safe.

use serde::{Deserialize, Serialize};

/// How the winning agent is compensated.
///
/// Serialized with an explicit `model` tag so stored terms remain readable
/// if further models are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Compensation {
    /// Commission as a fraction of the sale price, in basis points
    /// (250 = 2.50%).
    PercentageOfSale {
        /// Commission in basis points of the final sale price.
        basis_points: u32,
    },

    /// Fixed fee regardless of sale price.
    FlatFee {
        /// Fee in cents.
        amount_cents: u64,
    },
}

impl Compensation {
    /// Human-readable summary used in rendered agreement documents.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PercentageOfSale { basis_points } => {
                format!(
                    "{}.{:02}% of the final sale price",
                    basis_points / 100,
                    basis_points % 100
                )
            }
            Self::FlatFee { amount_cents } => {
                format!(
                    "a flat fee of ${}.{:02}",
                    amount_cents / 100,
                    amount_cents % 100
                )
            }
        }
    }
}

/// The effective terms of a negotiation at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terms {
    /// Compensation structure for the agent.
    pub compensation: Compensation,

    /// Length of the exclusive agreement, in months.
    pub agreement_length_months: u32,

    /// Optional free-text rider (exclusivity carve-outs etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A proposed change to terms. Every field is optional; unset fields carry
/// the prior value through [`TermsDelta::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsDelta {
    /// Replacement compensation structure, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation: Option<Compensation>,

    /// Replacement agreement length, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_length_months: Option<u32>,

    /// Replacement rider text, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TermsDelta {
    /// Returns `true` if the delta proposes no change at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compensation.is_none()
            && self.agreement_length_months.is_none()
            && self.notes.is_none()
    }

    /// Overlays this delta on `base`, producing the new effective terms.
    ///
    /// Never mutates `base`; callers snapshot the prior terms separately for
    /// audit purposes.
    #[must_use]
    pub fn merge(&self, base: &Terms) -> Terms {
        Terms {
            compensation: self
                .compensation
                .clone()
                .unwrap_or_else(|| base.compensation.clone()),
            agreement_length_months: self
                .agreement_length_months
                .unwrap_or(base.agreement_length_months),
            notes: self.notes.clone().or_else(|| base.notes.clone()),
        }
    }
}
