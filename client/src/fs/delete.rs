use super::prelude::*;
use libc::EISDIR;
use nmfs_core::dentry::dentry_key;
use nmfs_core::inode::inode_key;

pub fn unlink(fs: &mut RemoteFS, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
    let name = match name.to_str() {
        Some(n) => n,
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
        let rpc_req = UnlinkRequest {
            parent_ino: parent,
            name: name.to_string(),
        };
        match fs.env.remote.unlink(leader_addr, rpc_req) {
            Ok(_) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    let ino = match table.check_child_inode(name) {
        Ok(ino) => ino,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let rec = match InodeRecord::load(&fs.env.meta, ino) {
        Ok(rec) => rec,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };
    if rec.is_dir() {
        reply.error(EISDIR);
        return;
    }

    if let Err(e) = table.delete_child_inode(&fs.env.meta, name) {
        reply.error(e.to_errno());
        return;
    }

    if let Err(e) = fs.env.meta.remove(&inode_key(ino)) {
        tracing::warn!(ino, error = %e, "failed to remove inode record on unlink");
    }
    if let Err(e) = fs.env.data.delete(&data_key(ino), rec.size) {
        tracing::warn!(ino, error = %e, "failed to free data segments on unlink");
    }

    fs.attribute_cache.remove(&ino);
    fs.attribute_cache.remove(&parent);
    reply.ok();
}

pub fn rmdir(fs: &mut RemoteFS, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
    let name = match name.to_str() {
        Some(n) => n,
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

    // Remote rmdir is explicitly out of scope (mirrors the original's
    // `remote_rmdir` stub): `check_child_inode` on a REMOTE table already
    // answers `Unsupported`, which maps to ENOSYS below.
    let ino = match table.check_child_inode(name) {
        Ok(ino) => ino,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let child_table = match fs.env.dentry_table(ino) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };
    if child_table.child_count() > 0 {
        reply.error(ENOTEMPTY);
        return;
    }

    if let Err(e) = table.delete_child_inode(&fs.env.meta, name) {
        reply.error(e.to_errno());
        return;
    }

    fs.env.directory_table.delete_table(ino);
    if let Err(e) = fs.env.meta.remove(&inode_key(ino)) {
        tracing::warn!(ino, error = %e, "failed to remove inode record on rmdir");
    }
    if let Err(e) = fs.env.meta.remove(&dentry_key(ino)) {
        tracing::warn!(ino, error = %e, "failed to remove dentry record on rmdir");
    }

    fs.attribute_cache.remove(&ino);
    fs.attribute_cache.remove(&parent);
    reply.ok();
}
