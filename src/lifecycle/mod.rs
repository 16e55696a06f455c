//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Connect storage → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast to tasks → Drain connections → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then storage, then listeners
//! - Shutdown is a broadcast; every long-running task subscribes

pub mod shutdown;

pub use shutdown::Shutdown;
