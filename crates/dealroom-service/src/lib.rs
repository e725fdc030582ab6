//! dealroom-service - callable surface of the negotiation engine.
//!
//! Wires the core components (negotiation ledger, agreement versioning,
//! signature tracker, lock-in resolver, redaction gate, message filter)
//! behind typed request/response operations for UI and automation callers.
//! Every response carries a success flag plus a typed error code; no
//! operation reports partial success without saying which sub-steps
//! completed.
//!
//! # Modules
//!
//! - [`config`]: service configuration with humane defaults
//! - [`handlers`]: [`handlers::DealService`], the operation implementations
//! - [`protocol`]: request/response types and the error-code taxonomy
//! - [`telemetry`]: tracing subscriber initialization

pub mod config;
pub mod handlers;
pub mod protocol;
pub mod telemetry;
