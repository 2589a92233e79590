use super::prelude::*;
use super::now_secs;

pub fn create(
    fs: &mut RemoteFS,
    req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    mode: u32,
    _umask: u32,
    _flags: i32,
    reply: ReplyCreate,
) {
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

    let leader_addr = match table.loc() {
        Location::Local => None,
        Location::Remote { leader_addr } => Some(leader_addr.clone()),
    };

    if let Some(leader_addr) = leader_addr {
        let req = CreateRequest {
            parent_ino: parent,
            name: name.to_string(),
            mode,
            uid: req.uid(),
            gid: req.gid(),
        };
        match fs.env.remote.create(&leader_addr, req) {
            Ok(resp) => {
                let rec: InodeRecord = resp.attr.into();
                fs.remember_parent(resp.ino, parent);
                fs.attribute_cache.remove(&parent);
                let attr = to_file_attr(&rec);
                let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
                fs.attribute_cache.put(resp.ino, attr, ttl);
                let fh = fs.alloc_fh();
                fs.open_files.insert(fh, OpenFile { ino: resp.ino });
                reply.created(&TTL, &attr, 0, fh, 0);
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
        mode: libc::S_IFREG as u32 | (mode & 0o7777),
        uid: req.uid(),
        gid: req.gid(),
        nlink: 1,
        size: 0,
        atime: now,
        mtime: now,
        ctime: now,
    };
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

    let fh = fs.alloc_fh();
    fs.open_files.insert(fh, OpenFile { ino });
    reply.created(&TTL, &attr, 0, fh, 0);
}

pub fn mkdir(
    fs: &mut RemoteFS,
    req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    mode: u32,
    _umask: u32,
    reply: ReplyEntry,
) {
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

    let leader_addr = match table.loc() {
        Location::Local => None,
        Location::Remote { leader_addr } => Some(leader_addr.clone()),
    };

    if let Some(leader_addr) = leader_addr {
        let rpc_req = MkdirRequest {
            parent_ino: parent,
            name: name.to_string(),
            mode,
            uid: req.uid(),
            gid: req.gid(),
        };
        match fs.env.remote.mkdir(&leader_addr, rpc_req) {
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
        mode: libc::S_IFDIR as u32 | (mode & 0o7777),
        uid: req.uid(),
        gid: req.gid(),
        nlink: 2,
        size: 0,
        atime: now,
        mtime: now,
        ctime: now,
    };
    if let Err(e) = rec.persist(&fs.env.meta) {
        reply.error(e.to_errno());
        return;
    }
    if let Err(e) = table.create_child_inode(&fs.env.meta, name, ino) {
        reply.error(e.to_errno());
        return;
    }

    let new_table = match DentryTable::load_local(&fs.env.meta, ino) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };
    fs.env.directory_table.create_table(ino, new_table);
    fs.env.lease_client.claim_locally(ino);

    fs.remember_parent(ino, parent);
    fs.attribute_cache.remove(&parent);

    let attr = to_file_attr(&rec);
    let ttl = Duration::from_secs(fs.config.cache_ttl_seconds);
    fs.attribute_cache.put(ino, attr, ttl);

    reply.entry(&TTL, &attr, 0);
}
