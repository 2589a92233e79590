use super::prelude::*;

/// Rename/move a file or directory between (or within) directories.
///
/// Because every persisted object is addressed by `ino` rather than path
/// (`dentry$<ino>`, `inode$<ino>`, `file$<ino>`), a rename never touches
/// the target's own records: it only moves the `filename -> ino` mapping
/// between the source and destination dentry tables. No recursive
/// copy-then-delete is needed even when the target is a directory with
/// its own children.
#[allow(clippy::too_many_arguments)]
pub fn rename(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    newparent: u64,
    newname: &OsStr,
    _flags: u32,
    reply: ReplyEmpty,
) {
    let name = match name.to_str() {
        Some(n) => n,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let newname = match newname.to_str() {
        Some(n) => n,
        None => {
            reply.error(ENOENT);
            return;
        }
    };

    let old_table = match fs.env.dentry_table(parent) {
        Ok(t) => t,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    if newparent == parent {
        if let Location::Remote { leader_addr } = old_table.loc() {
            let rpc_req = RenameSameParentRequest {
                parent_ino: parent,
                old_name: name.to_string(),
                new_name: newname.to_string(),
            };
            match fs.env.remote.rename_same_parent(leader_addr, rpc_req) {
                Ok(_) => {
                    fs.attribute_cache.remove(&parent);
                    reply.ok();
                }
                Err(e) => reply.error(e.to_errno()),
            }
            return;
        }
    }

    let new_table = if newparent == parent {
        old_table.clone()
    } else {
        match fs.env.dentry_table(newparent) {
            Ok(t) => t,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        }
    };

    // Cross-directory rename with either side REMOTE mirrors the
    // original's `remote_rename_not_same_parent` stub: unsupported.
    if newparent != parent
        && (matches!(old_table.loc(), Location::Remote { .. })
            || matches!(new_table.loc(), Location::Remote { .. }))
    {
        reply.error(CoreError::Unsupported.to_errno());
        return;
    }

    let ino = match old_table.check_child_inode(name) {
        Ok(ino) => ino,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    // Overwrite semantics: a pre-existing target is displaced, matching
    // POSIX rename(2) for the common (non-directory-swap) case.
    if new_table.check_child_inode(newname).is_ok() {
        if let Err(e) = new_table.delete_child_inode(&fs.env.meta, newname) {
            reply.error(e.to_errno());
            return;
        }
    }

    if let Err(e) = old_table.delete_child_inode(&fs.env.meta, name) {
        reply.error(e.to_errno());
        return;
    }
    if let Err(e) = new_table.create_child_inode(&fs.env.meta, newname, ino) {
        reply.error(e.to_errno());
        return;
    }

    fs.remember_parent(ino, newparent);
    fs.attribute_cache.remove(&ino);
    fs.attribute_cache.remove(&parent);
    fs.attribute_cache.remove(&newparent);
    reply.ok();
}
