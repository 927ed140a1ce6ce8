//! Mission-control probing of the upstream operations service.
//!
//! Live endpoint probes, metrics-derived statuses, and batch summary
//! statistics.

mod metrics;
mod probe;
mod summary;

pub use metrics::*;
pub use probe::*;
pub use summary::*;

use thiserror::Error;

/// Operations error types.
#[derive(Error, Debug)]
pub enum OpsError {
    #[error("admin token is required for this endpoint")]
    MissingToken,
    #[error("upstream {path} returned HTTP {status}")]
    Upstream { status: u16, path: String },
    #[error("failed to reach upstream: {0}")]
    Transport(String),
}
