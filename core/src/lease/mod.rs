//! Time-bounded exclusive-writer leases: the coordinator-side registry
//! ([`table::LeaseTable`]) and the client-side cache/RPC shim
//! ([`client::LeaseClient`]).

pub mod client;
pub mod table;

pub use client::{AcquireOutcome, LeaseClient};
pub use table::{LeaseOutcome, LeaseTable};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a granted lease remains exclusive before it may be reassigned.
pub const LEASE_PERIOD: Duration = Duration::from_secs(10);

/// The wire contract for `POST /lease/acquire`, shared by
/// [`client::LeaseClient`] and the `nmfs-coordinatord` handler so the two
/// sides can never drift apart.
#[derive(Debug, Serialize, Deserialize)]
pub struct AcquireRequest {
    pub ino: u64,
    pub remote_addr: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcquireResponse {
    pub granted: bool,
    pub expires_in_ms: u64,
    pub current_holder: Option<String>,
}
