use super::prelude::*;
use super::now_secs;

/// Resolve `ino`'s attributes, consulting the cache before `nmfs-core`.
pub fn fetch_and_cache_attributes(fs: &mut RemoteFS, ino: u64) -> Option<FileAttr> {
    if let Some(attr) = fs.attribute_cache.get(&ino) {
        return Some(attr);
    }

    let rec = InodeRecord::load(&fs.env.meta, ino).ok()?;
    let attr = to_file_attr(&rec);
    let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
    fs.attribute_cache.put(ino, attr, ttl);
    Some(attr)
}

pub fn getattr(fs: &mut RemoteFS, _req: &Request, ino: u64, reply: ReplyAttr) {
    if let Some(attr) = fs.attribute_cache.get(&ino) {
        reply.attr(&TTL, &attr);
        return;
    }

    let dir_ino = fs.parent_of(ino);
    let table = match fs.env.dentry_table(dir_ino) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    if let Location::Remote { leader_addr } = table.loc() {
        match fs.env.remote.getattr(leader_addr, GetattrRequest { dir_ino, ino }) {
            Ok(resp) => {
                let rec: InodeRecord = resp.attr.into();
                let attr = to_file_attr(&rec);
                fs.attribute_cache.put(ino, attr, Duration::from_secs(fs.config.cache_ttl_seconds));
                reply.attr(&TTL, &attr);
            }
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    match fetch_and_cache_attributes(fs, ino) {
        Some(attr) => reply.attr(&TTL, &attr),
        None => reply.error(ENOENT),
    }
}

/// Translate a FUSE `TimeOrNow` into a Unix timestamp for the wire.
fn time_or_now_to_epoch(t: TimeOrNow) -> i64 {
    match t {
        TimeOrNow::SpecificTime(st) => st
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0),
        TimeOrNow::Now => now_secs(),
    }
}

pub fn access(fs: &mut RemoteFS, req: &Request, ino: u64, mask: i32, reply: ReplyEmpty) {
    let dir_ino = fs.parent_of(ino);
    let table = match fs.env.dentry_table(dir_ino) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    if let Location::Remote { leader_addr } = table.loc() {
        let rpc_req = AccessRequest {
            dir_ino,
            ino,
            uid: req.uid(),
            gid: req.gid(),
            mask,
        };
        match fs.env.remote.access(leader_addr, rpc_req) {
            Ok(resp) if resp.allowed => reply.ok(),
            Ok(_) => reply.error(EACCES),
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    match InodeRecord::load(&fs.env.meta, ino) {
        Ok(rec) if rec.check_access(req.uid(), req.gid(), mask) => reply.ok(),
        Ok(_) => reply.error(EACCES),
        Err(e) => reply.error(e.to_errno()),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn setattr(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    ino: u64,
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    size: Option<u64>,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
    _ctime: Option<SystemTime>,
    _fh: Option<u64>,
    _crtime: Option<SystemTime>,
    _chgtime: Option<SystemTime>,
    _bkuptime: Option<SystemTime>,
    _flags: Option<u32>,
    reply: ReplyAttr,
) {
    let dir_ino = fs.parent_of(ino);
    let table = match fs.env.dentry_table(dir_ino) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    if let Location::Remote { leader_addr } = table.loc().clone() {
        if let Some(new_mode) = mode {
            let rpc_req = ChmodRequest { dir_ino, ino, mode: new_mode };
            if let Err(e) = fs.env.remote.chmod(&leader_addr, rpc_req) {
                reply.error(e.to_errno());
                return;
            }
        }
        if uid.is_some() || gid.is_some() {
            let rpc_req = ChownRequest { dir_ino, ino, uid, gid };
            if let Err(e) = fs.env.remote.chown(&leader_addr, rpc_req) {
                reply.error(e.to_errno());
                return;
            }
        }
        if atime.is_some() || mtime.is_some() {
            let rpc_req = UtimensRequest {
                dir_ino,
                ino,
                atime: atime.map(time_or_now_to_epoch),
                mtime: mtime.map(time_or_now_to_epoch),
            };
            if let Err(e) = fs.env.remote.utimens(&leader_addr, rpc_req) {
                reply.error(e.to_errno());
                return;
            }
        }
        if let Some(new_size) = size {
            let rpc_req = TruncateRequest { dir_ino, ino, size: new_size };
            match fs.env.remote.truncate(&leader_addr, rpc_req) {
                Ok(resp) => {
                    if new_size < resp.old_size {
                        if let Err(e) = fs.env.data.delete_tail(&data_key(ino), new_size, resp.old_size) {
                            tracing::warn!(ino, error = %e, "failed to free truncated segments");
                        }
                    }
                }
                Err(e) => {
                    reply.error(e.to_errno());
                    return;
                }
            }
        }

        fs.attribute_cache.remove(&ino);
        match fs.env.remote.getattr(&leader_addr, GetattrRequest { dir_ino, ino }) {
            Ok(resp) => {
                let rec: InodeRecord = resp.attr.into();
                let attr = to_file_attr(&rec);
                fs.attribute_cache.put(ino, attr, Duration::from_secs(fs.config.cache_ttl_seconds));
                reply.attr(&TTL, &attr);
            }
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    let mut rec = match InodeRecord::load(&fs.env.meta, ino) {
        Ok(rec) => rec,
        Err(_) => {
            reply.error(ENOENT);
            return;
        }
    };

    if let Some(new_mode) = mode {
        rec.mode = (rec.mode & !0o7777) | (new_mode & 0o7777);
    }
    if let Some(new_uid) = uid {
        rec.uid = new_uid;
    }
    if let Some(new_gid) = gid {
        rec.gid = new_gid;
    }
    if let Some(new_size) = size {
        if new_size < rec.size {
            if let Err(e) = fs.env.data.delete_tail(&data_key(ino), new_size, rec.size) {
                tracing::warn!(ino, error = %e, "failed to free truncated segments");
            }
        }
        rec.size = new_size;
    }
    rec.mtime = now_secs();

    if let Err(e) = rec.persist(&fs.env.meta) {
        tracing::error!(ino, error = %e, "failed to persist setattr");
        reply.error(e.to_errno());
        return;
    }

    fs.attribute_cache.remove(&ino);
    let attr = to_file_attr(&rec);
    fs.attribute_cache.put(ino, attr, Duration::from_secs(fs.config.cache_ttl_seconds));
    reply.attr(&TTL, &attr);
}

/// The object store has no fixed capacity to report; blocks/files/free are
/// all zeroed, matching how other FUSE backends over unbounded remote
/// stores answer this call.
pub fn statfs(_fs: &mut RemoteFS, _req: &Request, _ino: u64, reply: fuser::ReplyStatfs) {
    reply.statfs(0, 0, 0, 0, 0, 4096, 255, 0);
}
