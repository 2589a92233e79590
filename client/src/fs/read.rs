use super::prelude::*;

pub fn lookup(fs: &mut RemoteFS, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
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

    if let Location::Remote { leader_addr } = table.loc().clone() {
        let check = fs.env.remote.check_child_inode(
            &leader_addr,
            CheckChildInoRequest {
                parent_ino: parent,
                name: name.to_string(),
            },
        );
        match check {
            Ok(CheckChildInoResponse { ino: Some(ino) }) => {
                match fs.env.remote.getattr(&leader_addr, GetattrRequest { dir_ino: parent, ino }) {
                    Ok(resp) => {
                        let rec: InodeRecord = resp.attr.into();
                        fs.remember_parent(ino, parent);
                        let attr = to_file_attr(&rec);
                        fs.attribute_cache
                            .put(ino, attr, Duration::from_secs(fs.config.cache_ttl_seconds));
                        reply.entry(&TTL, &attr, 0);
                    }
                    Err(e) => reply.error(e.to_errno()),
                }
            }
            Ok(CheckChildInoResponse { ino: None }) => reply.error(ENOENT),
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    match table.get_child_inode(&fs.env.meta, name) {
        Ok(InodeHandle::Local(rec)) => {
            fs.remember_parent(rec.ino, parent);
            let attr = to_file_attr(&rec);
            fs.attribute_cache
                .put(rec.ino, attr, Duration::from_secs(fs.config.cache_ttl_seconds));
            reply.entry(&TTL, &attr, 0);
        }
        Ok(InodeHandle::Remote(_)) => unreachable!("a LOCAL table never hands out a REMOTE handle"),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn readdir(fs: &mut RemoteFS, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
    let table = match fs.env.dentry_table(ino) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let parent = fs.parent_of(ino);
    let mut entries: Vec<(u64, FileType, String)> = vec![
        (ino, FileType::Directory, ".".to_string()),
        (parent, FileType::Directory, "..".to_string()),
    ];

    if let Location::Remote { leader_addr } = table.loc().clone() {
        match fs.env.remote.readdir(&leader_addr, ReaddirRequest { ino }) {
            Ok(resp) => {
                for (name, child_ino) in resp.entries {
                    // The owning leader's attributes are the authoritative
                    // source for kind; `readdir`'s type hint is advisory,
                    // so a subsequent `getattr`/`lookup` will correct it.
                    entries.push((child_ino, FileType::RegularFile, name));
                }
            }
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        }
    } else {
        for (name, child_ino) in table.list_children() {
            let kind = match InodeRecord::load(&fs.env.meta, child_ino) {
                Ok(rec) if rec.is_dir() => FileType::Directory,
                _ => FileType::RegularFile,
            };
            entries.push((child_ino, kind, name));
        }
    }

    for (i, (child_ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
        if reply.add(child_ino, (i + 1) as i64, kind, &name) {
            break;
        }
    }
    reply.ok();
}

#[allow(clippy::too_many_arguments)]
pub fn read(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    ino: u64,
    _fh: u64,
    offset: i64,
    size: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyData,
) {
    let rec = match InodeRecord::load(&fs.env.meta, ino) {
        Ok(rec) => rec,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let offset = offset as u64;
    let want = std::cmp::min(size as u64, rec.size.saturating_sub(offset)) as usize;
    if want == 0 {
        reply.data(&[]);
        return;
    }

    match fs.env.data.read(&data_key(ino), offset, want) {
        Ok(bytes) => reply.data(&bytes),
        Err(CoreError::MissingObject { bytes_so_far }) => {
            // A gap within the file's recorded size reads back as zeros: a
            // sparse write never filled that segment.
            let mut bytes = vec![0u8; want];
            if bytes_so_far > 0 {
                if let Ok(partial) = fs.env.data.read(&data_key(ino), offset, bytes_so_far) {
                    bytes[..partial.len()].copy_from_slice(&partial);
                }
            }
            reply.data(&bytes);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn open(fs: &mut RemoteFS, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
    let fh = fs.alloc_fh();
    fs.open_files.insert(fh, OpenFile { ino });
    reply.opened(fh, 0);
}

pub fn releasedir(fs: &mut RemoteFS, _req: &Request<'_>, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
    fs.open_files.remove(&fh);
    reply.ok();
}
