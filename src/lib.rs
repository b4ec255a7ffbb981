//! QR code USDC claim library.

pub mod blockchain;
pub mod claim;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use claim::{ClaimController, ClaimRegistry, ClaimServices, SubmitOutcome};
pub use config::schema::ClaimConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
