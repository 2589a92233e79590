//! The client-side lease cache and coordinator RPC shim. Grounded in
//! `client/lease/lease_client.cpp`: a local cache answers `is_valid`/
//! `is_mine` without a round trip, and `acquire` only talks to the
//! coordinator when the cache says the lease isn't ours.

use super::{AcquireRequest, AcquireResponse};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

#[derive(Debug, Clone)]
struct CacheEntry {
    due: Instant,
    mine: bool,
}

/// Talks to `nmfs-coordinatord` on behalf of one client process, caching
/// grants locally so repeat writers to the same directory skip the RPC.
pub struct LeaseClient {
    client: reqwest::Client,
    coordinator_url: String,
    self_addr: String,
    rt: Handle,
    cache: Mutex<HashMap<u64, CacheEntry>>,
}

impl LeaseClient {
    pub fn new(coordinator_url: impl Into<String>, self_addr: impl Into<String>, rt: Handle) -> Self {
        Self {
            client: reqwest::Client::new(),
            coordinator_url: coordinator_url.into(),
            self_addr: self_addr.into(),
            rt,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_valid(&self, ino: u64) -> bool {
        self.cache
            .lock()
            .unwrap()
            .get(&ino)
            .is_some_and(|e| Instant::now() < e.due)
    }

    pub fn is_mine(&self, ino: u64) -> bool {
        self.cache
            .lock()
            .unwrap()
            .get(&ino)
            .is_some_and(|e| e.mine && Instant::now() < e.due)
    }

    /// Record `ino` as owned by this client without a round trip: used
    /// right after a LOCAL `mkdir` creates a brand-new directory that has
    /// no other possible claimant yet (§4.6's `lease_dentry_table`).
    pub fn claim_locally(&self, ino: u64) {
        self.cache.lock().unwrap().insert(
            ino,
            CacheEntry {
                due: Instant::now() + super::LEASE_PERIOD,
                mine: true,
            },
        );
    }

    /// Acquire (or renew) the lease on `ino`, returning who ends up
    /// authoritative for it: this client, or a peer to forward to.
    pub fn acquire(&self, ino: u64) -> Result<AcquireOutcome> {
        if self.is_mine(ino) {
            return Ok(AcquireOutcome::Owned);
        }

        let url = format!("{}/lease/acquire", self.coordinator_url);
        let client = self.client.clone();
        let body = AcquireRequest {
            ino,
            remote_addr: self.self_addr.clone(),
        };

        let resp: AcquireResponse = self.rt.block_on(async move {
            let resp = client.post(&url).json(&body).send().await?;
            let resp = resp.error_for_status().map_err(Error::from)?;
            resp.json::<AcquireResponse>()
                .await
                .map_err(Error::from)
        })?;

        let mut cache = self.cache.lock().unwrap();
        cache.insert(
            ino,
            CacheEntry {
                due: Instant::now() + Duration::from_millis(resp.expires_in_ms),
                mine: resp.granted,
            },
        );
        drop(cache);

        if resp.granted {
            Ok(AcquireOutcome::Owned)
        } else {
            let addr = resp.current_holder.unwrap_or_default();
            tracing::debug!(ino, current_holder = %addr, "lease denied");
            Ok(AcquireOutcome::ForwardTo(addr))
        }
    }
}

/// The result of resolving who is authoritative for a directory ino.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// This client now holds (or already held) the lease.
    Owned,
    /// Another client holds it; forward ops to this address.
    ForwardTo(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ino_is_neither_valid_nor_mine() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let c = LeaseClient::new("http://coordinator", "http://self", rt.handle().clone());
        assert!(!c.is_valid(1));
        assert!(!c.is_mine(1));
    }

    #[test]
    fn cache_reflects_granted_state() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let c = LeaseClient::new("http://coordinator", "http://self", rt.handle().clone());
        c.cache.lock().unwrap().insert(
            1,
            CacheEntry {
                due: Instant::now() + Duration::from_secs(10),
                mine: true,
            },
        );
        assert!(c.is_valid(1));
        assert!(c.is_mine(1));
    }

    #[test]
    fn expired_entry_is_not_mine() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let c = LeaseClient::new("http://coordinator", "http://self", rt.handle().clone());
        c.cache.lock().unwrap().insert(
            1,
            CacheEntry {
                due: Instant::now() - Duration::from_secs(1),
                mine: true,
            },
        );
        assert!(!c.is_valid(1));
        assert!(!c.is_mine(1));
    }
}
