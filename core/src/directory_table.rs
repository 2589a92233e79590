//! The process-wide `ino -> DentryTable` registry and the path-walk
//! algorithm built on top of it. Mirrors `directory_table.hpp`'s
//! `create_table`/`delete_table`/`path_traversal`/`get_dentry_table`.

use crate::dentry_table::{DentryTable, Location};
use crate::error::{Error, Result};
use crate::ino::ROOT_INO;
use crate::inode::{InodeHandle, InodeRecord};
use crate::osio::{BackingStore, Osio};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct DirectoryTable {
    tables: Mutex<HashMap<u64, Arc<DentryTable>>>,
}

impl Default for DirectoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTable {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn create_table(&self, ino: u64, table: DentryTable) {
        self.tables.lock().unwrap().insert(ino, Arc::new(table));
    }

    pub fn delete_table(&self, ino: u64) {
        self.tables.lock().unwrap().remove(&ino);
    }

    /// Fetch the dentry table for `ino`, lazily creating a LOCAL one from
    /// storage if this is the first time this directory has been visited.
    pub fn get_dentry_table<B: BackingStore>(
        &self,
        osio: &Osio<B>,
        ino: u64,
    ) -> Result<Arc<DentryTable>> {
        if let Some(table) = self.tables.lock().unwrap().get(&ino) {
            return Ok(table.clone());
        }
        let table = Arc::new(DentryTable::load_local(osio, ino)?);
        self.tables.lock().unwrap().insert(ino, table.clone());
        Ok(table)
    }

    /// Walk `path` (an absolute, `/`-separated path) from the root,
    /// resolving each component through its directory's dentry table. The
    /// walk stops as soon as it crosses into a REMOTE directory, returning
    /// the remote handle for the caller to forward the remaining suffix;
    /// callers that need the full remote path should join the unresolved
    /// components onto [`RemoteInodeHandle`]'s `name` themselves.
    pub fn path_traversal<B: BackingStore>(
        &self,
        osio: &Osio<B>,
        path: &str,
    ) -> Result<InodeHandle> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if components.is_empty() {
            let root = InodeRecord::load(osio, ROOT_INO)?;
            return Ok(InodeHandle::Local(root));
        }

        let mut current_ino = ROOT_INO;
        for (i, component) in components.iter().enumerate() {
            let table = self.get_dentry_table(osio, current_ino)?;
            let is_last = i == components.len() - 1;
            let handle = table.get_child_inode(osio, component)?;

            match handle {
                InodeHandle::Local(record) => {
                    if is_last {
                        return Ok(InodeHandle::Local(record));
                    }
                    if !record.is_dir() {
                        return Err(Error::NotADirectory);
                    }
                    current_ino = record.ino;
                }
                InodeHandle::Remote(remote) => return Ok(InodeHandle::Remote(remote)),
            }
        }

        unreachable!("loop always returns on its last iteration")
    }

    /// True if `ino`'s dentry table is known to be REMOTE.
    pub fn is_remote(&self, ino: u64) -> Option<bool> {
        self.tables
            .lock()
            .unwrap()
            .get(&ino)
            .map(|t| matches!(t.loc(), Location::Remote { .. }))
    }

    /// The address of `ino`'s leader, if its table is known and REMOTE.
    pub fn leader_addr(&self, ino: u64) -> Option<String> {
        self.tables.lock().unwrap().get(&ino).and_then(|t| match t.loc() {
            Location::Remote { leader_addr } => Some(leader_addr.clone()),
            Location::Local => None,
        })
    }

    /// Fetch the dentry table for `ino`, consulting the lease client the
    /// first time this directory is visited to decide whether it's LOCAL
    /// (this client now holds the lease) or REMOTE (forward to whoever
    /// does), per §4.6. Unlike [`Self::get_dentry_table`], this never loads
    /// a table straight from storage without first checking who owns it.
    pub fn resolve<B: BackingStore>(
        &self,
        osio: &Osio<B>,
        lease: &crate::lease::LeaseClient,
        ino: u64,
    ) -> Result<Arc<DentryTable>> {
        if let Some(table) = self.tables.lock().unwrap().get(&ino) {
            return Ok(table.clone());
        }
        let table = match lease.acquire(ino)? {
            crate::lease::AcquireOutcome::Owned => DentryTable::load_local(osio, ino)?,
            crate::lease::AcquireOutcome::ForwardTo(addr) => DentryTable::remote(ino, addr),
        };
        let table = Arc::new(table);
        self.tables.lock().unwrap().insert(ino, table.clone());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osio::tests::MemBackingStore;
    use libc::{S_IFDIR, S_IFREG};

    fn osio() -> Osio<MemBackingStore> {
        Osio::with_object_bits(MemBackingStore::default(), 10)
    }

    fn mkdir_record(ino: u64) -> InodeRecord {
        InodeRecord {
            ino,
            mode: S_IFDIR as u32 | 0o755,
            uid: 0,
            gid: 0,
            nlink: 2,
            size: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        }
    }

    fn file_record(ino: u64) -> InodeRecord {
        InodeRecord {
            ino,
            mode: S_IFREG as u32 | 0o644,
            uid: 0,
            gid: 0,
            nlink: 1,
            size: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        }
    }

    #[test]
    fn empty_path_resolves_to_root() {
        let o = osio();
        mkdir_record(ROOT_INO).persist(&o).unwrap();
        let dt = DirectoryTable::new();
        let handle = dt.path_traversal(&o, "/").unwrap();
        assert_eq!(handle.ino(), Some(ROOT_INO));
    }

    #[test]
    fn walks_through_nested_directories() {
        let o = osio();
        mkdir_record(ROOT_INO).persist(&o).unwrap();
        mkdir_record(10).persist(&o).unwrap();
        file_record(20).persist(&o).unwrap();

        let dt = DirectoryTable::new();
        let root_table = dt.get_dentry_table(&o, ROOT_INO).unwrap();
        root_table.create_child_inode(&o, "sub", 10).unwrap();
        let sub_table = dt.get_dentry_table(&o, 10).unwrap();
        sub_table.create_child_inode(&o, "file.txt", 20).unwrap();

        let handle = dt.path_traversal(&o, "/sub/file.txt").unwrap();
        assert_eq!(handle.ino(), Some(20));
    }

    #[test]
    fn descending_into_a_file_is_an_error() {
        let o = osio();
        mkdir_record(ROOT_INO).persist(&o).unwrap();
        file_record(20).persist(&o).unwrap();
        let dt = DirectoryTable::new();
        let root_table = dt.get_dentry_table(&o, ROOT_INO).unwrap();
        root_table.create_child_inode(&o, "file.txt", 20).unwrap();

        let err = dt.path_traversal(&o, "/file.txt/nope").unwrap_err();
        assert!(matches!(err, Error::NotADirectory));
    }

    #[test]
    fn crossing_into_remote_stops_and_returns_handle() {
        let o = osio();
        mkdir_record(ROOT_INO).persist(&o).unwrap();
        let dt = DirectoryTable::new();
        dt.create_table(
            ROOT_INO,
            DentryTable::remote(ROOT_INO, "http://leader:9000".into()),
        );

        let handle = dt.path_traversal(&o, "/anything/deeper").unwrap();
        match handle {
            InodeHandle::Remote(r) => assert_eq!(r.leader_addr, "http://leader:9000"),
            InodeHandle::Local(_) => panic!("expected remote handle"),
        }
    }
}
