//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Tear down claim controllers → Exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
