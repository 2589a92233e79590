//! The per-process wiring that the original kept as global pointers
//! (`meta_pool`, `data_pool`, `indexing_table`, `lc` in
//! `client/fs_ops/fuse_ops.cpp`). `Environment` owns all of it instead, so
//! every op handler takes `&Environment` rather than reaching for statics.

use crate::dentry_table::DentryTable;
use crate::directory_table::DirectoryTable;
use crate::error::Result;
use crate::ino::InoCounter;
use crate::lease::LeaseClient;
use crate::osio::{BackingStore, Osio};
use crate::remote_ops::RemoteOps;
use std::sync::{Arc, Mutex};

/// Everything one mounted client needs to serve filesystem operations.
///
/// `meta` and `data` mirror the original's two `rados_io` pools: one for
/// small, frequently-rewritten metadata objects (inode records, dentries,
/// the client registry), one for file content. Both may point at the same
/// backing store in simple deployments; kept separate so a deployment can
/// route them differently (e.g. metadata on faster storage).
pub struct Environment<B: BackingStore> {
    pub meta: Osio<B>,
    pub data: Osio<B>,
    pub directory_table: DirectoryTable,
    pub lease_client: LeaseClient,
    /// The peer-facing RPC client used to forward ops against a REMOTE
    /// directory to whichever client currently leads it.
    pub remote: RemoteOps,
    ino_counter: Mutex<InoCounter>,
    self_rpc_addr: String,
}

impl<B: BackingStore> Environment<B> {
    pub fn new(
        meta: Osio<B>,
        data: Osio<B>,
        ino_counter: InoCounter,
        lease_client: LeaseClient,
        remote: RemoteOps,
        self_rpc_addr: String,
    ) -> Self {
        Self {
            meta,
            data,
            directory_table: DirectoryTable::new(),
            lease_client,
            remote,
            ino_counter: Mutex::new(ino_counter),
            self_rpc_addr,
        }
    }

    pub fn client_id(&self) -> u64 {
        self.ino_counter.lock().unwrap().client_id()
    }

    pub fn self_rpc_addr(&self) -> &str {
        &self.self_rpc_addr
    }

    /// Allocate a fresh ino, persisting the updated counter to `meta`.
    pub fn alloc_ino(&self) -> crate::error::Result<u64> {
        self.ino_counter.lock().unwrap().alloc(&self.meta)
    }

    /// Fetch (lazily, lease-aware) the dentry table for `ino`: LOCAL if
    /// this client holds the lease, REMOTE with a forwarding address
    /// otherwise. This is the entry point every fs op should use instead
    /// of [`DirectoryTable::get_dentry_table`], which never consults the
    /// lease client at all.
    pub fn dentry_table(&self, ino: u64) -> Result<Arc<DentryTable>> {
        self.directory_table.resolve(&self.meta, &self.lease_client, ino)
    }
}
