//! HTTP presentation subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handlers.rs (registry lookup, controller call)
//!     → ClaimView projection → JSON
//! ```

pub mod handlers;
pub mod server;

pub use server::{build_router, AppState, ChainAccess, HttpServer};
