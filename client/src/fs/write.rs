use super::prelude::*;
use super::now_secs;

#[allow(clippy::too_many_arguments)]
pub fn write(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    ino: u64,
    fh: u64,
    offset: i64,
    data: &[u8],
    _write_flags: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyWrite,
) {
    if !fs.open_files.contains_key(&fh) {
        reply.error(EBADF);
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
        let rpc_req = WriteRequest {
            dir_ino,
            ino,
            offset: offset as u64,
            len: data.len(),
        };
        match fs.env.remote.write(leader_addr, rpc_req) {
            Ok(resp) if resp.allowed => match fs.env.data.write(&data_key(ino), offset as u64, data) {
                Ok(written) => {
                    fs.attribute_cache.remove(&ino);
                    reply.written(written as u32);
                }
                Err(e) => reply.error(e.to_errno()),
            },
            Ok(_) => reply.error(EACCES),
            Err(e) => reply.error(e.to_errno()),
        }
        return;
    }

    let mut rec = match InodeRecord::load(&fs.env.meta, ino) {
        Ok(rec) => rec,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    match fs.env.data.write(&data_key(ino), offset as u64, data) {
        Ok(written) => {
            let new_size = offset as u64 + written as u64;
            if new_size > rec.size {
                rec.size = new_size;
            }
            rec.mtime = now_secs();
            if let Err(e) = rec.persist(&fs.env.meta) {
                tracing::error!(ino, error = %e, "failed to persist size after write");
                reply.error(e.to_errno());
                return;
            }
            fs.attribute_cache.remove(&ino);
            reply.written(written as u32);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn release(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    _flags: i32,
    _lock_owner: Option<u64>,
    _flush: bool,
    reply: ReplyEmpty,
) {
    fs.open_files.remove(&fh);
    reply.ok();
}

pub fn flush(_fs: &mut RemoteFS, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
    reply.ok();
}
