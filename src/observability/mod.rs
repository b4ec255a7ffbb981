//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Submitter, tracker, client, registry produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! The claim controller itself emits nothing; its state is observed
//! through snapshots.

pub mod logging;
pub mod metrics;
