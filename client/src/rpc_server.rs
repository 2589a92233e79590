//! The peer-facing RPC server: the HTTP front end a client exposes at its
//! `self_rpc_addr` so that other clients who resolve it as the leader of a
//! REMOTE directory can forward filesystem ops here. Shaped the same way
//! as `nmfs-coordinatord`'s router, but serving the op surface defined in
//! `nmfs_core::rpc` instead of lease acquisition.
//!
//! Every handler runs its work on a blocking thread via
//! `spawn_blocking`: the filesystem-op layer underneath (`Environment`,
//! `Osio`, `DirectoryTable`) is synchronous and itself drives its own
//! `reqwest` calls through `Handle::block_on`, which panics if invoked
//! directly from an async task running on the same runtime driving this
//! server. `spawn_blocking` moves the call onto a thread the runtime
//! doesn't consider "inside" itself, matching how `fuser`'s own dedicated
//! request thread calls the same synchronous layer.

use crate::fs::{data_key, now_secs, RemoteFS};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use nmfs_core::dentry_table::DentryTable;
use nmfs_core::error::Error;
use nmfs_core::inode::{inode_key, link_key, InodeRecord};
use nmfs_core::rpc::*;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

pub type SharedFs = Arc<Mutex<RemoteFS>>;

const MAX_SYMLINK_LEN: usize = 4096;

pub fn build_router(fs: SharedFs) -> Router {
    Router::new()
        .route("/health", axum::routing::get(|| async { "OK" }))
        .route("/rpc/check_child_inode", post(check_child_inode))
        .route("/rpc/getattr", post(getattr))
        .route("/rpc/access", post(access))
        .route("/rpc/readdir", post(readdir))
        .route("/rpc/mkdir", post(mkdir))
        .route("/rpc/create", post(create))
        .route("/rpc/unlink", post(unlink))
        .route("/rpc/symlink", post(symlink))
        .route("/rpc/readlink", post(readlink))
        .route("/rpc/rename_same_parent", post(rename_same_parent))
        .route("/rpc/write", post(write))
        .route("/rpc/chmod", post(chmod))
        .route("/rpc/chown", post(chown))
        .route("/rpc/utimens", post(utimens))
        .route("/rpc/truncate", post(truncate))
        .layer(TraceLayer::new_for_http())
        .with_state(fs)
}

fn require_leader(fs: &RemoteFS, dir_ino: u64) -> Result<(), Error> {
    if fs.env.lease_client.is_mine(dir_ino) {
        Ok(())
    } else {
        Err(Error::NotLeader)
    }
}

/// Run `f` against the shared filesystem state on a blocking thread and
/// translate its domain error (if any) to the wire's HTTP status.
async fn blocking<F, T>(fs: SharedFs, f: F) -> Result<Json<T>, StatusCode>
where
    F: FnOnce(&mut RemoteFS) -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = fs.lock().unwrap();
        f(&mut guard)
    })
    .await
    .expect("rpc worker thread panicked");

    result.map(Json).map_err(|e| status_for_error(&e))
}

async fn check_child_inode(
    State(fs): State<SharedFs>,
    Json(req): Json<CheckChildInoRequest>,
) -> Result<Json<CheckChildInoResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.parent_ino)?;
        let table = fs.env.dentry_table(req.parent_ino)?;
        Ok(CheckChildInoResponse {
            ino: table.check_child_inode(&req.name).ok(),
        })
    })
    .await
}

async fn getattr(
    State(fs): State<SharedFs>,
    Json(req): Json<GetattrRequest>,
) -> Result<Json<GetattrResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let rec = InodeRecord::load(&fs.env.meta, req.ino)?;
        Ok(GetattrResponse { attr: rec.into() })
    })
    .await
}

async fn access(
    State(fs): State<SharedFs>,
    Json(req): Json<AccessRequest>,
) -> Result<Json<AccessResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let rec = InodeRecord::load(&fs.env.meta, req.ino)?;
        Ok(AccessResponse {
            allowed: rec.check_access(req.uid, req.gid, req.mask),
        })
    })
    .await
}

async fn readdir(
    State(fs): State<SharedFs>,
    Json(req): Json<ReaddirRequest>,
) -> Result<Json<ReaddirResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.ino)?;
        let table = fs.env.dentry_table(req.ino)?;
        Ok(ReaddirResponse {
            entries: table.list_children(),
        })
    })
    .await
}

async fn mkdir(
    State(fs): State<SharedFs>,
    Json(req): Json<MkdirRequest>,
) -> Result<Json<MkdirResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.parent_ino)?;
        let table = fs.env.dentry_table(req.parent_ino)?;

        let ino = fs.env.alloc_ino()?;
        let now = now_secs();
        let rec = InodeRecord {
            ino,
            mode: libc::S_IFDIR as u32 | (req.mode & 0o7777),
            uid: req.uid,
            gid: req.gid,
            nlink: 2,
            size: 0,
            atime: now,
            mtime: now,
            ctime: now,
        };
        rec.persist(&fs.env.meta)?;
        table.create_child_inode(&fs.env.meta, &req.name, ino)?;

        let new_table = DentryTable::load_local(&fs.env.meta, ino)?;
        fs.env.directory_table.create_table(ino, new_table);
        fs.env.lease_client.claim_locally(ino);

        Ok(MkdirResponse { ino, attr: rec.into() })
    })
    .await
}

async fn create(
    State(fs): State<SharedFs>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<CreateResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.parent_ino)?;
        let table = fs.env.dentry_table(req.parent_ino)?;

        let ino = fs.env.alloc_ino()?;
        let now = now_secs();
        let rec = InodeRecord {
            ino,
            mode: libc::S_IFREG as u32 | (req.mode & 0o7777),
            uid: req.uid,
            gid: req.gid,
            nlink: 1,
            size: 0,
            atime: now,
            mtime: now,
            ctime: now,
        };
        rec.persist(&fs.env.meta)?;
        table.create_child_inode(&fs.env.meta, &req.name, ino)?;

        Ok(CreateResponse { ino, attr: rec.into() })
    })
    .await
}

async fn unlink(State(fs): State<SharedFs>, Json(req): Json<UnlinkRequest>) -> Result<Json<Ack>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.parent_ino)?;
        let table = fs.env.dentry_table(req.parent_ino)?;
        // A remote unlink targeting a directory is not expected in
        // practice: every subdirectory becomes its own lease owner the
        // moment `mkdir` creates it, so later ops against it resolve
        // straight to its own leader rather than through this parent.
        let ino = table.check_child_inode(&req.name)?;
        let rec = InodeRecord::load(&fs.env.meta, ino)?;

        table.delete_child_inode(&fs.env.meta, &req.name)?;
        if let Err(e) = fs.env.meta.remove(&inode_key(ino)) {
            tracing::warn!(ino, error = %e, "failed to remove inode record on remote unlink");
        }
        if let Err(e) = fs.env.data.delete(&data_key(ino), rec.size) {
            tracing::warn!(ino, error = %e, "failed to free data segments on remote unlink");
        }

        Ok(Ack)
    })
    .await
}

async fn symlink(
    State(fs): State<SharedFs>,
    Json(req): Json<SymlinkRequest>,
) -> Result<Json<SymlinkResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.parent_ino)?;
        let table = fs.env.dentry_table(req.parent_ino)?;

        let ino = fs.env.alloc_ino()?;
        let now = now_secs();
        let rec = InodeRecord {
            ino,
            mode: libc::S_IFLNK as u32 | 0o777,
            uid: req.uid,
            gid: req.gid,
            nlink: 1,
            size: req.target.len() as u64,
            atime: now,
            mtime: now,
            ctime: now,
        };
        fs.env.meta.write(&link_key(ino), 0, req.target.as_bytes())?;
        rec.persist(&fs.env.meta)?;
        table.create_child_inode(&fs.env.meta, &req.name, ino)?;

        Ok(SymlinkResponse { ino, attr: rec.into() })
    })
    .await
}

async fn readlink(
    State(fs): State<SharedFs>,
    Json(req): Json<ReadlinkRequest>,
) -> Result<Json<ReadlinkResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let bytes = match fs.env.meta.read(&link_key(req.ino), 0, MAX_SYMLINK_LEN) {
            Ok(bytes) => bytes,
            Err(Error::MissingObject { bytes_so_far }) if bytes_so_far > 0 => {
                fs.env.meta.read(&link_key(req.ino), 0, bytes_so_far)?
            }
            Err(e) => return Err(e),
        };
        Ok(ReadlinkResponse {
            target: String::from_utf8_lossy(&bytes).into_owned(),
        })
    })
    .await
}

async fn rename_same_parent(
    State(fs): State<SharedFs>,
    Json(req): Json<RenameSameParentRequest>,
) -> Result<Json<Ack>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.parent_ino)?;
        let table = fs.env.dentry_table(req.parent_ino)?;

        let ino = table.check_child_inode(&req.old_name)?;
        if table.check_child_inode(&req.new_name).is_ok() {
            table.delete_child_inode(&fs.env.meta, &req.new_name)?;
        }
        table.delete_child_inode(&fs.env.meta, &req.old_name)?;
        table.create_child_inode(&fs.env.meta, &req.new_name, ino)?;

        Ok(Ack)
    })
    .await
}

async fn write(
    State(fs): State<SharedFs>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<WriteResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let mut rec = InodeRecord::load(&fs.env.meta, req.ino)?;

        let new_size = req.offset + req.len as u64;
        if new_size > rec.size {
            rec.size = new_size;
        }
        rec.mtime = now_secs();
        rec.persist(&fs.env.meta)?;

        Ok(WriteResponse { allowed: true })
    })
    .await
}

async fn chmod(State(fs): State<SharedFs>, Json(req): Json<ChmodRequest>) -> Result<Json<Ack>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let mut rec = InodeRecord::load(&fs.env.meta, req.ino)?;
        rec.mode = (rec.mode & !0o7777) | (req.mode & 0o7777);
        rec.mtime = now_secs();
        rec.persist(&fs.env.meta)?;
        Ok(Ack)
    })
    .await
}

async fn chown(State(fs): State<SharedFs>, Json(req): Json<ChownRequest>) -> Result<Json<Ack>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let mut rec = InodeRecord::load(&fs.env.meta, req.ino)?;
        if let Some(uid) = req.uid {
            rec.uid = uid;
        }
        if let Some(gid) = req.gid {
            rec.gid = gid;
        }
        rec.mtime = now_secs();
        rec.persist(&fs.env.meta)?;
        Ok(Ack)
    })
    .await
}

async fn utimens(State(fs): State<SharedFs>, Json(req): Json<UtimensRequest>) -> Result<Json<Ack>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let mut rec = InodeRecord::load(&fs.env.meta, req.ino)?;
        if let Some(atime) = req.atime {
            rec.atime = atime;
        }
        if let Some(mtime) = req.mtime {
            rec.mtime = mtime;
        }
        rec.persist(&fs.env.meta)?;
        Ok(Ack)
    })
    .await
}

async fn truncate(
    State(fs): State<SharedFs>,
    Json(req): Json<TruncateRequest>,
) -> Result<Json<TruncateResponse>, StatusCode> {
    blocking(fs, move |fs| {
        require_leader(fs, req.dir_ino)?;
        let mut rec = InodeRecord::load(&fs.env.meta, req.ino)?;
        let old_size = rec.size;
        rec.size = req.size;
        rec.mtime = now_secs();
        rec.persist(&fs.env.meta)?;
        Ok(TruncateResponse { old_size })
    })
    .await
}
