//! Station directory client.
//!
//! Discovers upstream directory API replicas via DNS SRV, fetches from them
//! with sequential failover, and transforms station records for display.

mod client;
mod query;
mod resolver;
mod station;

pub use client::*;
pub use query::*;
pub use resolver::*;
pub use station::*;

use thiserror::Error;

/// Directory error types.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("directory lookup failed: {0}")]
    Lookup(String),
    #[error("directory lookup returned no servers")]
    NoServers,
    #[error("all directory servers failed after {attempts} attempts")]
    AllServersFailed { attempts: usize },
}
