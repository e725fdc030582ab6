//! dealroom-core - Deal Negotiation & Lock-In Engine
//!
//! This crate implements the negotiation core of an investor/agent
//! marketplace: one investor negotiates in parallel with N candidate agents,
//! each in an isolated room, and the first room whose agreement becomes
//! fully executed wins the deal. Every sibling room is voided as part of the
//! same resolution.
//!
//! # Architecture
//!
//! ```text
//! CounterOffer exchange          Agreement lifecycle
//! ┌──────────────────┐   accept  ┌─────────────────────┐
//! │ NegotiationLedger│ ────────> │  VersioningService   │
//! └──────────────────┘           └─────────┬───────────┘
//!                                          │ draft/sent
//!                                ┌─────────▼───────────┐
//!                                │  SignatureTracker    │
//!                                └─────────┬───────────┘
//!                                          │ fully signed
//!                                ┌─────────▼───────────┐
//!                                │   LockInResolver     │  exactly one
//!                                └─────────────────────┘  winner per deal
//! ```
//!
//! The [`redaction`] gate and the [`filter`] scanner consult per-room
//! agreement status continuously until a room is fully signed.
//!
//! # Key Concepts
//!
//! - **Room**: isolated one-investor-to-one-agent negotiation channel
//! - **Lock-in**: irreversible assignment of a deal to exactly one room,
//!   resolved through a storage-level compare-and-set
//! - **AgreementVersion**: immutable, hashed snapshot of contract terms
//!   plus its signature history
//!
//! # Concurrency Contract
//!
//! Handlers are stateless; all coordination state lives behind the
//! [`store::EntityStore`] trait. The single point of truth for "who won" is
//! [`store::EntityStore::try_lock_deal`], which implementations must provide
//! as a genuine atomic conditional update. Everything else (sibling voiding,
//! audit, status mirroring) is idempotent and repairable by sweeps.

pub mod agreement;
pub mod audit;
pub mod esign;
pub mod filter;
pub mod lockin;
pub mod model;
pub mod negotiation;
pub mod redaction;
pub mod signature;
pub mod store;
pub mod terms;
