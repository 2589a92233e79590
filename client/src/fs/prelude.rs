//! Shared imports for the `fs` submodules (`attr.rs`, `read.rs`, etc.),
//! avoiding repetitive imports in every file.

pub use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};

pub use libc::{EACCES, EBADF, ENOENT, ENOTEMPTY};
#[cfg(not(target_os = "macos"))]
pub use libc::ENODATA;
#[cfg(target_os = "macos")]
pub use libc::ENOATTR;

pub use std::collections::HashMap;
pub use std::ffi::OsStr;
pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use nmfs_core::dentry_table::{DentryTable, Location};
pub use nmfs_core::error::Error as CoreError;
pub use nmfs_core::inode::{InodeHandle, InodeRecord};
pub use nmfs_core::rpc::*;

pub use super::{data_key, to_file_attr, OpenFile, RemoteFS, TTL};
