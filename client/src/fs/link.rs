use super::prelude::*;
use super::now_secs;
use nmfs_core::inode::link_key;
use std::path::Path;

/// Largest symlink target this dispatcher will read back. Real targets
/// are well under `PATH_MAX` (4096); this is a read-side safety bound,
/// not a write-side limit.
const MAX_SYMLINK_LEN: usize = 4096;

pub fn symlink(
    fs: &mut RemoteFS,
    req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    link: &Path,
    reply: ReplyEntry,
) {
    let name = match name.to_str() {
        Some(n) => n,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let target = match link.to_str() {
        Some(t) => t,
        None => {
            reply.error(ENOENT);
            return;
        }
    };

    let table = match fs.env.dentry_table(parent) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    if let Location::Remote { leader_addr } = table.loc() {
        let rpc_req = SymlinkRequest {
            parent_ino: parent,
            name: name.to_string(),
            target: target.to_string(),
            uid: req.uid(),
            gid: req.gid(),
        };
        match fs.env.remote.symlink(leader_addr, rpc_req) {
            Ok(resp) => {
                let rec: InodeRecord = resp.attr.into();
                fs.remember_parent(resp.ino, parent);
                fs.attribute_cache.remove(&parent);
                let attr = to_file_attr(&rec);
                let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
                fs.attribute_cache.put(resp.ino, attr, ttl);
                reply.entry(&TTL, &attr, 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    let ino = match fs.env.alloc_ino() {
        Ok(ino) => ino,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let now = now_secs();
    let rec = InodeRecord {
        ino,
        mode: libc::S_IFLNK as u32 | 0o777,
        uid: req.uid(),
        gid: req.gid(),
        nlink: 1,
        size: target.len() as u64,
        atime: now,
        mtime: now,
        ctime: now,
    };
    if let Err(e) = fs.env.meta.write(&link_key(ino), 0, target.as_bytes()) {
        reply.error(e.to_errno());
        return;
    }
    if let Err(e) = rec.persist(&fs.env.meta) {
        reply.error(e.to_errno());
        return;
    }
    if let Err(e) = table.create_child_inode(&fs.env.meta, name, ino) {
        reply.error(e.to_errno());
        return;
    }

    fs.remember_parent(ino, parent);
    fs.attribute_cache.remove(&parent);

    let attr = to_file_attr(&rec);
    let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
    fs.attribute_cache.put(ino, attr, ttl);
    reply.entry(&TTL, &attr, 0);
}

pub fn readlink(fs: &mut RemoteFS, _req: &Request<'_>, ino: u64, reply: ReplyData) {
    let dir_ino = fs.parent_of(ino);
    let table = match fs.env.dentry_table(dir_ino) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    if let Location::Remote { leader_addr } = table.loc() {
        match fs.env.remote.readlink(leader_addr, ReadlinkRequest { dir_ino, ino }) {
            Ok(resp) => reply.data(resp.target.as_bytes()),
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    match read_link_target(fs, ino) {
        Ok(target) => reply.data(target.as_bytes()),
        Err(e) => reply.error(e.to_errno()),
    }
}

fn read_link_target(fs: &RemoteFS, ino: u64) -> Result<String, CoreError> {
    let bytes = match fs.env.meta.read(&link_key(ino), 0, MAX_SYMLINK_LEN) {
        Ok(bytes) => bytes,
        Err(CoreError::MissingObject { bytes_so_far }) if bytes_so_far > 0 => {
            fs.env.meta.read(&link_key(ino), 0, bytes_so_far)?
        }
        Err(e) => return Err(e),
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
