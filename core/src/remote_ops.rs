//! The client side of the peer-to-peer RPC surface: typed calls against
//! whichever client currently leads a REMOTE directory. Grounded in
//! `client/fs_ops/remote_ops.cpp`'s function list and built the way
//! [`crate::osio::HttpBackingStore`] talks to `nmfs-objectd` — a blocking
//! façade over `reqwest`, driven through `Handle::block_on`.
//!
//! Every call takes the leader's address explicitly rather than caching
//! one: the leader for a given directory can change lease to lease, and
//! the caller (the FUSE dispatcher) already knows who to ask from its own
//! directory table.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::rpc::*;

#[derive(Clone)]
pub struct RemoteOps {
    client: reqwest::Client,
    rt: Handle,
}

impl RemoteOps {
    pub fn new(rt: Handle) -> Self {
        Self {
            client: reqwest::Client::new(),
            rt,
        }
    }

    fn call<Req, Resp>(&self, leader_addr: &str, path: &str, req: Req) -> Result<Resp>
    where
        Req: Serialize + Send + 'static,
        Resp: DeserializeOwned,
    {
        let url = format!("{leader_addr}{path}");
        let client = self.client.clone();
        self.rt.block_on(async move {
            let resp = client.post(&url).json(&req).send().await?;
            let status = resp.status();
            if status == StatusCode::OK {
                resp.json::<Resp>().await.map_err(Error::from)
            } else {
                Err(error_for_status(status))
            }
        })
    }

    pub fn check_child_inode(
        &self,
        leader_addr: &str,
        req: CheckChildInoRequest,
    ) -> Result<CheckChildInoResponse> {
        self.call(leader_addr, "/rpc/check_child_inode", req)
    }

    pub fn getattr(&self, leader_addr: &str, req: GetattrRequest) -> Result<GetattrResponse> {
        self.call(leader_addr, "/rpc/getattr", req)
    }

    pub fn access(&self, leader_addr: &str, req: AccessRequest) -> Result<AccessResponse> {
        self.call(leader_addr, "/rpc/access", req)
    }

    pub fn readdir(&self, leader_addr: &str, req: ReaddirRequest) -> Result<ReaddirResponse> {
        self.call(leader_addr, "/rpc/readdir", req)
    }

    pub fn mkdir(&self, leader_addr: &str, req: MkdirRequest) -> Result<MkdirResponse> {
        self.call(leader_addr, "/rpc/mkdir", req)
    }

    pub fn create(&self, leader_addr: &str, req: CreateRequest) -> Result<CreateResponse> {
        self.call(leader_addr, "/rpc/create", req)
    }

    pub fn unlink(&self, leader_addr: &str, req: UnlinkRequest) -> Result<Ack> {
        self.call(leader_addr, "/rpc/unlink", req)
    }

    pub fn symlink(&self, leader_addr: &str, req: SymlinkRequest) -> Result<SymlinkResponse> {
        self.call(leader_addr, "/rpc/symlink", req)
    }

    pub fn readlink(&self, leader_addr: &str, req: ReadlinkRequest) -> Result<ReadlinkResponse> {
        self.call(leader_addr, "/rpc/readlink", req)
    }

    pub fn rename_same_parent(
        &self,
        leader_addr: &str,
        req: RenameSameParentRequest,
    ) -> Result<Ack> {
        self.call(leader_addr, "/rpc/rename_same_parent", req)
    }

    pub fn write(&self, leader_addr: &str, req: WriteRequest) -> Result<WriteResponse> {
        self.call(leader_addr, "/rpc/write", req)
    }

    pub fn chmod(&self, leader_addr: &str, req: ChmodRequest) -> Result<Ack> {
        self.call(leader_addr, "/rpc/chmod", req)
    }

    pub fn chown(&self, leader_addr: &str, req: ChownRequest) -> Result<Ack> {
        self.call(leader_addr, "/rpc/chown", req)
    }

    pub fn utimens(&self, leader_addr: &str, req: UtimensRequest) -> Result<Ack> {
        self.call(leader_addr, "/rpc/utimens", req)
    }

    pub fn truncate(&self, leader_addr: &str, req: TruncateRequest) -> Result<TruncateResponse> {
        self.call(leader_addr, "/rpc/truncate", req)
    }
}
