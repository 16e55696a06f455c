//! Read-side HTTP API.
//!
//! # Data Flow
//! ```text
//! GET/DELETE /api/*
//!     → handlers.rs (parse params, clamp paging, resolve date bounds)
//!     → storage::EventStore (postgres or memory)
//!     → http::response envelopes
//! ```

pub mod handlers;
