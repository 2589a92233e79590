//! Wire types for the peer-to-peer RPC surface: the request/response pairs
//! a client sends to whichever client currently leads a REMOTE directory.
//! Grounded in `client/fs_ops/remote_ops.cpp`'s function list.
//!
//! These are deliberately distinct from [`crate::inode::InodeRecord`],
//! which is the fixed-layout *persisted* record. The wire format is JSON
//! (via `serde_json`, matching the teacher's HTTP API style) rather than
//! the persisted binary layout, since the wire side needs forward
//! compatibility and readability far more than compactness.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::inode::InodeRecord;

/// Map a domain error to the HTTP status a peer's RPC handler answers
/// with, so both sides of the wire agree without a JSON error envelope
/// (mirrors the status-code convention `osio::http` already uses against
/// `nmfs-objectd`).
pub fn status_for_error(e: &Error) -> StatusCode {
    match e {
        Error::NoEntry => StatusCode::NOT_FOUND,
        Error::PermissionDenied => StatusCode::FORBIDDEN,
        Error::AlreadyExists => StatusCode::CONFLICT,
        Error::NotEmpty => StatusCode::UNPROCESSABLE_ENTITY,
        Error::NotADirectory => StatusCode::BAD_REQUEST,
        Error::MissingObject { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        Error::LockContended => StatusCode::LOCKED,
        Error::NotLeader => StatusCode::MISDIRECTED_REQUEST,
        Error::TransportFailure(_) => StatusCode::BAD_GATEWAY,
        Error::Unsupported => StatusCode::NOT_IMPLEMENTED,
        Error::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The inverse of [`status_for_error`], used by the RPC client to turn a
/// non-2xx response back into a domain error.
pub fn error_for_status(status: StatusCode) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NoEntry,
        StatusCode::FORBIDDEN => Error::PermissionDenied,
        StatusCode::CONFLICT => Error::AlreadyExists,
        StatusCode::UNPROCESSABLE_ENTITY => Error::NotEmpty,
        StatusCode::BAD_REQUEST => Error::NotADirectory,
        StatusCode::LOCKED => Error::LockContended,
        StatusCode::MISDIRECTED_REQUEST => Error::NotLeader,
        StatusCode::NOT_IMPLEMENTED => Error::Unsupported,
        other => Error::TransportFailure(format!("peer returned {other}")),
    }
}

/// The JSON-friendly mirror of [`InodeRecord`], sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InodeAttr {
    pub ino: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl From<InodeRecord> for InodeAttr {
    fn from(r: InodeRecord) -> Self {
        Self {
            ino: r.ino,
            mode: r.mode,
            uid: r.uid,
            gid: r.gid,
            nlink: r.nlink,
            size: r.size,
            atime: r.atime,
            mtime: r.mtime,
            ctime: r.ctime,
        }
    }
}

impl From<InodeAttr> for InodeRecord {
    fn from(a: InodeAttr) -> Self {
        InodeRecord {
            ino: a.ino,
            mode: a.mode,
            uid: a.uid,
            gid: a.gid,
            nlink: a.nlink,
            size: a.size,
            atime: a.atime,
            mtime: a.mtime,
            ctime: a.ctime,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetattrRequest {
    /// The directory whose lease authorizes this read: `ino` itself when
    /// the target is a directory, its parent otherwise.
    pub dir_ino: u64,
    pub ino: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetattrResponse {
    pub attr: InodeAttr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessRequest {
    pub dir_ino: u64,
    pub ino: u64,
    pub uid: u32,
    pub gid: u32,
    pub mask: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReaddirRequest {
    /// The directory being listed; also the ino whose lease is checked.
    pub ino: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReaddirResponse {
    pub entries: Vec<(String, u64)>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckChildInoRequest {
    pub parent_ino: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckChildInoResponse {
    pub ino: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MkdirRequest {
    pub parent_ino: u64,
    pub name: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MkdirResponse {
    pub ino: u64,
    pub attr: InodeAttr,
}

/// Always answered with `Error::Unsupported` (the original's
/// `remote_rmdir` returns `-ENOSYS`; cross-node directory removal is out
/// of scope).
#[derive(Debug, Serialize, Deserialize)]
pub struct RmdirRequest {
    pub parent_ino: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SymlinkRequest {
    pub parent_ino: u64,
    pub name: String,
    pub target: String,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SymlinkResponse {
    pub ino: u64,
    pub attr: InodeAttr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadlinkRequest {
    pub dir_ino: u64,
    pub ino: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadlinkResponse {
    pub target: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenameSameParentRequest {
    pub parent_ino: u64,
    pub old_name: String,
    pub new_name: String,
}

/// Always answered with `Error::Unsupported`, mirroring the original's
/// `remote_rename_not_same_parent` stub.
#[derive(Debug, Serialize, Deserialize)]
pub struct RenameNotSameParentRequest {
    pub old_parent_ino: u64,
    pub old_name: String,
    pub new_parent_ino: u64,
    pub new_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenRequest {
    pub dir_ino: u64,
    pub ino: u64,
    pub flags: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRequest {
    pub parent_ino: u64,
    pub name: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    pub ino: u64,
    pub attr: InodeAttr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnlinkRequest {
    pub parent_ino: u64,
    pub name: String,
}

/// Writes are special: the leader only validates the lease and updates the
/// persisted size/mtime bookkeeping; the requesting client performs the
/// actual byte transfer straight against the (shared) data object store,
/// per §4.8's allowed/offset/size protocol.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteRequest {
    pub dir_ino: u64,
    pub ino: u64,
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChmodRequest {
    pub dir_ino: u64,
    pub ino: u64,
    pub mode: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChownRequest {
    pub dir_ino: u64,
    pub ino: u64,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UtimensRequest {
    pub dir_ino: u64,
    pub ino: u64,
    pub atime: Option<i64>,
    pub mtime: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TruncateRequest {
    pub dir_ino: u64,
    pub ino: u64,
    pub size: u64,
}

/// Truncate is symmetric with write: the leader updates the persisted size
/// but the requesting client frees the now-unreachable data segments
/// itself, so it needs to know what the size used to be.
#[derive(Debug, Serialize, Deserialize)]
pub struct TruncateResponse {
    pub old_size: u64,
}

/// Empty body shared by ops that only succeed or fail (chmod, chown,
/// utimens, unlink, rename-same-parent).
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_attr_round_trips_through_inode_record() {
        let rec = InodeRecord {
            ino: 1,
            mode: 0o100644,
            uid: 1,
            gid: 1,
            nlink: 1,
            size: 10,
            atime: 1,
            mtime: 2,
            ctime: 3,
        };
        let attr: InodeAttr = rec.into();
        let back: InodeRecord = attr.into();
        assert_eq!(rec, back);
    }

    #[test]
    fn leader_not_found_round_trips_through_status() {
        let status = status_for_error(&Error::NoEntry);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(matches!(error_for_status(status), Error::NoEntry));
    }

    #[test]
    fn write_request_serializes_as_json() {
        let req = WriteRequest {
            dir_ino: 1,
            ino: 7,
            offset: 0,
            len: 3,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: WriteRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ino, 7);
        assert_eq!(back.len, 3);
    }
}
