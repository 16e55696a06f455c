//! Webhook ingest subsystem.
//!
//! # Data Flow
//! ```text
//! POST /webhook/* (JSON body, untrusted shape)
//!     → handlers.rs (parse bytes, reject only non-JSON)
//!     → normalizer.rs (safe-default extraction, number cleanup)
//!     → record.rs (NormalizedEvent, wire vocabulary)
//!     → ack to sender, then storage::Forwarder (detached)
//! ```
//!
//! # Design Decisions
//! - Normalization never fails; absent or mistyped fields collapse to
//!   defaults instead of errors
//! - Timestamps are rendered in São Paulo local time at the edge so every
//!   store sees the same `dataHora` text

pub mod handlers;
pub mod normalizer;
pub mod record;

pub use record::{Contact, NormalizedEvent, StoredEvent};
