//! The domain-level error taxonomy shared by every layer of the core.
//!
//! Only the filesystem-op dispatcher (in the `client` crate) is allowed to
//! turn these into POSIX errno values; no layer below it inspects an errno.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no such file or directory")]
    NoEntry,

    #[error("permission denied")]
    PermissionDenied,

    #[error("already exists")]
    AlreadyExists,

    #[error("directory not empty")]
    NotEmpty,

    #[error("not a directory")]
    NotADirectory,

    /// The backing object was absent during a read that expected content.
    /// `bytes_so_far` lets the caller report a short read up to that point.
    #[error("missing object ({bytes_so_far} bytes read before the gap)")]
    MissingObject { bytes_so_far: usize },

    /// An OSIO advisory lock on a segment was already held elsewhere. The
    /// core never retries this internally; callers rely on the client-wide
    /// atomic mutex to avoid contending with their own traffic.
    #[error("object lock contended")]
    LockContended,

    /// A peer says it no longer owns the directory. The lease cache is
    /// stale; the caller must invalidate it and retry after re-acquiring.
    #[error("not the current leader")]
    NotLeader,

    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Cross-node combinations not yet implemented (cross-parent rename
    /// with a remote side, remote rmdir).
    #[error("unsupported operation")]
    Unsupported,

    #[error("malformed persisted record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Translate a domain error into a negative POSIX errno, as the
    /// dispatcher replies to `fuser`. This is the single translation point
    /// referenced by §7 of the design: no other layer maps errno.
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::NoEntry => libc::ENOENT,
            Error::PermissionDenied => libc::EACCES,
            Error::AlreadyExists => libc::EEXIST,
            Error::NotEmpty => libc::ENOTEMPTY,
            Error::NotADirectory => libc::ENOTDIR,
            Error::MissingObject { .. } => libc::EIO,
            Error::LockContended => libc::EBUSY,
            Error::NotLeader => libc::EIO,
            Error::TransportFailure(_) => libc::EIO,
            Error::Unsupported => libc::ENOSYS,
            Error::Corrupt(_) => libc::EIO,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::TransportFailure(e.to_string())
    }
}
