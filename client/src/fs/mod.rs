//! The FUSE dispatcher: `RemoteFS` holds all per-mount state, and
//! `impl Filesystem for FsWrapper` routes each kernel call to a submodule.
//!
//! Unlike the REST-list-and-cache model this crate started from, every op
//! here resolves inodes directly through `nmfs_core`'s directory table and
//! OSIO layer: an ino addresses its persisted record and (for
//! directories) its dentry table without needing a path at all.

use crate::config::Config;
use crate::fs::cache::AttributeCache;
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request,
};
use nmfs_core::environment::Environment;
use nmfs_core::ino::{self, ROOT_INO};
use nmfs_core::inode::InodeRecord;
use nmfs_core::lease::LeaseClient;
use nmfs_core::osio::{HttpBackingStore, Osio};
use nmfs_core::remote_ops::RemoteOps;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

pub mod cache;
pub mod prelude;
mod attr;
mod create;
mod delete;
mod link;
mod read;
mod rename;
mod write;
mod xattr;

/// Default TTL handed back to the kernel for attribute/entry caching.
pub const TTL: Duration = Duration::from_secs(1);

/// A file or directory opened by a prior `open`/`create`/`opendir`.
pub struct OpenFile {
    pub ino: u64,
}

/// Key under which a regular file's content is split into OSIO segments.
pub fn data_key(ino: u64) -> String {
    format!("file${ino}")
}

pub fn to_file_attr(rec: &InodeRecord) -> FileAttr {
    let kind = if rec.is_dir() {
        FileType::Directory
    } else {
        FileType::RegularFile
    };
    let secs = |t: i64| UNIX_EPOCH + Duration::from_secs(t.max(0) as u64);
    FileAttr {
        ino: rec.ino,
        size: rec.size,
        blocks: rec.size.div_ceil(512),
        atime: secs(rec.atime),
        mtime: secs(rec.mtime),
        ctime: secs(rec.ctime),
        crtime: UNIX_EPOCH,
        kind,
        perm: (rec.mode & 0o7777) as u16,
        nlink: rec.nlink,
        uid: rec.uid,
        gid: rec.gid,
        rdev: 0,
        flags: 0,
        blksize: 4096,
    }
}

/// The main per-mount state: the wiring to `nmfs-core`, the kernel-facing
/// attribute cache, and the bookkeeping FUSE itself requires (file
/// handles, the client-local `child -> parent` map used for `..`).
pub struct RemoteFS {
    pub(crate) env: Environment<HttpBackingStore>,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) attribute_cache: AttributeCache,
    pub(crate) config: Config,
    pub(crate) open_files: HashMap<u64, OpenFile>,
    pub(crate) next_fh: u64,
    /// `ino -> parent ino`, populated on `mkdir`/`create`/`lookup` and
    /// updated on `rename`. Only needed to answer `..`; never persisted,
    /// since the authoritative parent/child relationship lives in the
    /// owning directory's dentry table, keyed the other way around.
    pub(crate) parent_of: Mutex<HashMap<u64, u64>>,
}

impl RemoteFS {
    pub fn new(config: Config) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("failed to start tokio runtime");

        let meta = Osio::new(HttpBackingStore::new(
            config.objectd_addr.clone(),
            runtime.handle().clone(),
        ));
        let data = Osio::new(HttpBackingStore::new(
            config.data_addr.clone(),
            runtime.handle().clone(),
        ));

        let ino_counter = ino::mount_client(&meta).expect("failed to mount client against metadata store");

        if InodeRecord::load(&meta, ROOT_INO).is_err() {
            let now = now_secs();
            let root = InodeRecord {
                ino: ROOT_INO,
                mode: libc::S_IFDIR as u32 | 0o755,
                uid: 0,
                gid: 0,
                nlink: 2,
                size: 0,
                atime: now,
                mtime: now,
                ctime: now,
            };
            root.persist(&meta).expect("failed to bootstrap root inode");
        }

        let lease_client = LeaseClient::new(
            config.coordinator_addr.clone(),
            config.self_rpc_addr.clone(),
            runtime.handle().clone(),
        );

        let remote = RemoteOps::new(runtime.handle().clone());

        let env = Environment::new(
            meta,
            data,
            ino_counter,
            lease_client,
            remote,
            config.self_rpc_addr.clone(),
        );

        let mut parent_of = HashMap::new();
        parent_of.insert(ROOT_INO, ROOT_INO);

        Self {
            attribute_cache: AttributeCache::new(&config),
            config,
            env,
            runtime,
            open_files: HashMap::new(),
            next_fh: 1,
            parent_of: Mutex::new(parent_of),
        }
    }

    pub(crate) fn alloc_fh(&mut self) -> u64 {
        let fh = self.next_fh;
        self.next_fh += 1;
        fh
    }

    pub(crate) fn remember_parent(&self, child: u64, parent: u64) {
        self.parent_of.lock().unwrap().insert(child, parent);
    }

    pub(crate) fn parent_of(&self, ino: u64) -> u64 {
        self.parent_of.lock().unwrap().get(&ino).copied().unwrap_or(ino)
    }

    /// The host:port this client's peer RPC server should bind to, derived
    /// from `self_rpc_addr`'s URL (the scheme only matters to callers
    /// dialing in, not to the listener itself).
    pub fn self_rpc_bind_addr(&self) -> String {
        self.env
            .self_rpc_addr()
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .to_string()
    }
}

pub(crate) fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct FsWrapper(pub Arc<Mutex<RemoteFS>>);

impl Filesystem for FsWrapper {
    fn getattr(&mut self, req: &Request, ino: u64, reply: ReplyAttr) {
        let mut fs = self.0.lock().unwrap();
        attr::getattr(&mut fs, req, ino, reply);
    }

    fn statfs(&mut self, req: &Request<'_>, ino: u64, reply: fuser::ReplyStatfs) {
        let mut fs = self.0.lock().unwrap();
        attr::statfs(&mut fs, req, ino, reply);
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<fuser::TimeOrNow>,
        mtime: Option<fuser::TimeOrNow>,
        ctime: Option<std::time::SystemTime>,
        fh: Option<u64>,
        crtime: Option<std::time::SystemTime>,
        chgtime: Option<std::time::SystemTime>,
        bkuptime: Option<std::time::SystemTime>,
        flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let mut fs = self.0.lock().unwrap();
        attr::setattr(
            &mut fs, req, ino, mode, uid, gid, size, atime, mtime, ctime, fh, crtime, chgtime,
            bkuptime, flags, reply,
        );
    }

    fn lookup(&mut self, req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        read::lookup(&mut fs, req, parent, name, reply);
    }

    fn readdir(&mut self, req: &Request, ino: u64, fh: u64, offset: i64, reply: ReplyDirectory) {
        let mut fs = self.0.lock().unwrap();
        read::readdir(&mut fs, req, ino, fh, offset, reply);
    }

    fn read(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let mut fs = self.0.lock().unwrap();
        read::read(&mut fs, req, ino, fh, offset, size, flags, lock_owner, reply);
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let mut fs = self.0.lock().unwrap();
        read::open(&mut fs, req, ino, flags, reply);
    }

    fn opendir(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let mut fs = self.0.lock().unwrap();
        read::open(&mut fs, req, ino, flags, reply);
    }

    fn releasedir(&mut self, req: &Request<'_>, ino: u64, fh: u64, flags: i32, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        read::releasedir(&mut fs, req, ino, fh, flags, reply);
    }

    fn access(&mut self, req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        attr::access(&mut fs, req, ino, mask, reply);
    }

    fn symlink(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        link: &std::path::Path,
        reply: ReplyEntry,
    ) {
        let mut fs = self.0.lock().unwrap();
        link::symlink(&mut fs, req, parent, name, link, reply);
    }

    fn readlink(&mut self, req: &Request<'_>, ino: u64, reply: ReplyData) {
        let mut fs = self.0.lock().unwrap();
        link::readlink(&mut fs, req, ino, reply);
    }

    fn write(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        write_flags: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let mut fs = self.0.lock().unwrap();
        write::write(&mut fs, req, ino, fh, offset, data, write_flags, flags, lock_owner, reply);
    }

    fn release(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        flags: i32,
        lock_owner: Option<u64>,
        flush: bool,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        write::release(&mut fs, req, ino, fh, flags, lock_owner, flush, reply);
    }

    fn flush(&mut self, req: &Request<'_>, ino: u64, fh: u64, lock_owner: u64, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        write::flush(&mut fs, req, ino, fh, lock_owner, reply);
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::create(&mut fs, req, parent, name, mode, umask, flags, reply);
    }

    fn mkdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, mode: u32, umask: u32, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        create::mkdir(&mut fs, req, parent, name, mode, umask, reply);
    }

    fn unlink(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::unlink(&mut fs, req, parent, name, reply);
    }

    fn rmdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::rmdir(&mut fs, req, parent, name, reply);
    }

    fn rename(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        rename::rename(&mut fs, req, parent, name, newparent, newname, flags, reply);
    }

    fn getxattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        size: u32,
        reply: fuser::ReplyXattr,
    ) {
        let mut fs = self.0.lock().unwrap();
        xattr::getxattr(&mut fs, req, ino, name, size, reply);
    }

    fn setxattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        flags: i32,
        position: u32,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        xattr::setxattr(&mut fs, req, ino, name, value, flags, position, reply);
    }

    fn listxattr(&mut self, req: &Request<'_>, ino: u64, size: u32, reply: fuser::ReplyXattr) {
        let mut fs = self.0.lock().unwrap();
        xattr::listxattr(&mut fs, req, ino, size, reply);
    }

    fn removexattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        xattr::removexattr(&mut fs, req, ino, name, reply);
    }
}
