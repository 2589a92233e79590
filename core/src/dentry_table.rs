//! In-memory directory state: one `DentryTable` per known directory ino,
//! caching its children as a `filename -> ino` map plus a location tag.
//!
//! A LOCAL table owns its directory: the map is authoritative and every
//! mutation is synced to the persisted [`Dentry`] object. A REMOTE table
//! only knows who the leader is; lookups fabricate a forwarding handle
//! instead of touching local state (mirroring the source's LOCAL/REMOTE
//! split in `dentry_table.cpp`, collapsed here into one type instead of a
//! subclass pair).

use crate::dentry::Dentry;
use crate::error::{Error, Result};
use crate::inode::{InodeHandle, InodeRecord, RemoteInodeHandle};
use crate::osio::{BackingStore, Osio};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local,
    Remote { leader_addr: String },
}

pub struct DentryTable {
    dir_ino: u64,
    loc: Location,
    /// filename -> child ino, mirrored to the persisted dentry on every
    /// mutation. Only meaningful when `loc == Location::Local`.
    children: Mutex<HashMap<String, u64>>,
}

impl DentryTable {
    /// A LOCAL table, loading existing children (if any) from storage.
    pub fn load_local<B: BackingStore>(osio: &Osio<B>, dir_ino: u64) -> Result<Self> {
        let dentry = Dentry::load(osio, dir_ino)?;
        Ok(Self {
            dir_ino,
            loc: Location::Local,
            children: Mutex::new(dentry.children),
        })
    }

    /// A REMOTE table: no local children, just a forwarding address.
    pub fn remote(dir_ino: u64, leader_addr: String) -> Self {
        Self {
            dir_ino,
            loc: Location::Remote { leader_addr },
            children: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir_ino(&self) -> u64 {
        self.dir_ino
    }

    pub fn loc(&self) -> &Location {
        &self.loc
    }

    fn persist<B: BackingStore>(&self, osio: &Osio<B>) -> Result<()> {
        let children = self.children.lock().unwrap();
        let dentry = Dentry {
            ino: self.dir_ino,
            children: children.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        };
        dentry.sync(osio)
    }

    /// Register a brand new child (the file/dir did not exist before) and
    /// sync the updated dentry to storage. Fails if `filename` is already
    /// present.
    pub fn create_child_inode<B: BackingStore>(
        &self,
        osio: &Osio<B>,
        filename: &str,
        ino: u64,
    ) -> Result<()> {
        {
            let mut children = self.children.lock().unwrap();
            if children.contains_key(filename) {
                return Err(Error::AlreadyExists);
            }
            children.insert(filename.to_string(), ino);
        }
        self.persist(osio)
    }

    /// Register a child already present in the persisted dentry, without
    /// re-syncing (used while warming the in-memory map from storage).
    pub fn add_child_inode(&self, filename: &str, ino: u64) -> Result<()> {
        let mut children = self.children.lock().unwrap();
        if children.contains_key(filename) {
            return Err(Error::AlreadyExists);
        }
        children.insert(filename.to_string(), ino);
        Ok(())
    }

    pub fn delete_child_inode<B: BackingStore>(&self, osio: &Osio<B>, filename: &str) -> Result<u64> {
        let removed = {
            let mut children = self.children.lock().unwrap();
            children.remove(filename).ok_or(Error::NoEntry)?
        };
        self.persist(osio)?;
        Ok(removed)
    }

    /// Resolve `filename` to a handle usable by the dispatcher: a fully
    /// materialised LOCAL record, or a REMOTE forwarding handle.
    pub fn get_child_inode<B: BackingStore>(
        &self,
        osio: &Osio<B>,
        filename: &str,
    ) -> Result<InodeHandle> {
        match &self.loc {
            Location::Local => {
                let ino = {
                    let children = self.children.lock().unwrap();
                    *children.get(filename).ok_or(Error::NoEntry)?
                };
                Ok(InodeHandle::Local(InodeRecord::load(osio, ino)?))
            }
            Location::Remote { leader_addr } => Ok(InodeHandle::Remote(RemoteInodeHandle {
                leader_addr: leader_addr.clone(),
                parent_ino: self.dir_ino,
                name: filename.to_string(),
            })),
        }
    }

    /// Cheap existence/ino check, without loading the full inode record.
    /// Remote tables report [`Error::Unsupported`]: checking existence
    /// remotely requires an RPC the caller must issue itself.
    pub fn check_child_inode(&self, filename: &str) -> Result<u64> {
        match &self.loc {
            Location::Local => {
                let children = self.children.lock().unwrap();
                children.get(filename).copied().ok_or(Error::NoEntry)
            }
            Location::Remote { .. } => Err(Error::Unsupported),
        }
    }

    /// All (filename, ino) pairs currently known, for `readdir`.
    pub fn list_children(&self) -> Vec<(String, u64)> {
        self.children
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osio::tests::MemBackingStore;

    fn osio() -> Osio<MemBackingStore> {
        Osio::with_object_bits(MemBackingStore::default(), 10)
    }

    #[test]
    fn create_then_reload_round_trips() {
        let o = osio();
        {
            let table = DentryTable::load_local(&o, 1).unwrap();
            table.create_child_inode(&o, "a.txt", 100).unwrap();
            table.create_child_inode(&o, "sub", 200).unwrap();
        }
        let reloaded = DentryTable::load_local(&o, 1).unwrap();
        assert_eq!(reloaded.check_child_inode("a.txt").unwrap(), 100);
        assert_eq!(reloaded.check_child_inode("sub").unwrap(), 200);
        assert_eq!(reloaded.child_count(), 2);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let o = osio();
        let table = DentryTable::load_local(&o, 1).unwrap();
        table.create_child_inode(&o, "a.txt", 100).unwrap();
        let err = table.create_child_inode(&o, "a.txt", 101).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
    }

    #[test]
    fn delete_then_reload_is_gone() {
        let o = osio();
        {
            let table = DentryTable::load_local(&o, 1).unwrap();
            table.create_child_inode(&o, "a.txt", 100).unwrap();
            table.delete_child_inode(&o, "a.txt").unwrap();
        }
        let reloaded = DentryTable::load_local(&o, 1).unwrap();
        assert_eq!(reloaded.child_count(), 0);
    }

    #[test]
    fn remote_lookup_fabricates_handle() {
        let o = osio();
        let table = DentryTable::remote(5, "http://leader:9000".to_string());
        let handle = table.get_child_inode(&o, "whatever").unwrap();
        match handle {
            InodeHandle::Remote(r) => {
                assert_eq!(r.leader_addr, "http://leader:9000");
                assert_eq!(r.parent_ino, 5);
                assert_eq!(r.name, "whatever");
            }
            InodeHandle::Local(_) => panic!("expected remote handle"),
        }
    }

    #[test]
    fn remote_check_child_is_unsupported() {
        let table = DentryTable::remote(5, "http://leader:9000".to_string());
        assert!(matches!(
            table.check_child_inode("x").unwrap_err(),
            Error::Unsupported
        ));
    }
}
