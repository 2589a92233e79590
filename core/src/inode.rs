//! Inode records: persisted metadata and the LOCAL/REMOTE handle that the
//! dentry table hands out on lookup.

use crate::error::{Error, Result};
use crate::osio::{BackingStore, Osio};

pub fn inode_key(ino: u64) -> String {
    format!("inode${ino}")
}

/// Key under which a symlink's target path is stored. `InodeRecord`'s
/// fixed layout has no room for a variable-length target, so symlinks get
/// a second small object alongside their inode record, written once at
/// creation and never mutated.
pub fn link_key(ino: u64) -> String {
    format!("link${ino}")
}

/// Fixed-layout persisted record. Field order defines the wire layout;
/// an invariant check on deserialization verifies the consumed length.
const RECORD_LEN: usize = 8 + 4 + 4 + 4 + 4 + 8 + 8 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeRecord {
    pub ino: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl InodeRecord {
    pub fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT as u32 == libc::S_IFDIR as u32
    }

    /// POSIX-style permission check for `access(2)`: root always passes,
    /// otherwise the owner/group/other bits of `mode` are checked against
    /// whichever of `R_OK`/`W_OK`/`X_OK` are set in `mask`. `F_OK` (0) only
    /// asks that the record exists, which the caller already established
    /// by loading it.
    pub fn check_access(&self, uid: u32, gid: u32, mask: i32) -> bool {
        if uid == 0 || mask == libc::F_OK {
            return true;
        }
        let shift = if uid == self.uid {
            6
        } else if gid == self.gid {
            3
        } else {
            0
        };
        let granted = (self.mode >> shift) & 0o7;
        let mut needed = 0u32;
        if mask & libc::R_OK != 0 {
            needed |= 0o4;
        }
        if mask & libc::W_OK != 0 {
            needed |= 0o2;
        }
        if mask & libc::X_OK != 0 {
            needed |= 0o1;
        }
        granted & needed == needed
    }

    pub fn serialize(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        let mut w = 0;
        macro_rules! put {
            ($v:expr) => {{
                let bytes = $v.to_le_bytes();
                buf[w..w + bytes.len()].copy_from_slice(&bytes);
                w += bytes.len();
            }};
        }
        put!(self.ino);
        put!(self.mode);
        put!(self.uid);
        put!(self.gid);
        put!(self.nlink);
        put!(self.size);
        put!(self.atime);
        put!(self.mtime);
        put!(self.ctime);
        debug_assert_eq!(w, RECORD_LEN);
        buf
    }

    pub fn deserialize(raw: &[u8]) -> Result<Self> {
        if raw.len() != RECORD_LEN {
            return Err(Error::Corrupt(format!(
                "inode record: expected {RECORD_LEN} bytes, got {}",
                raw.len()
            )));
        }
        let mut r = 0;
        macro_rules! take {
            ($ty:ty) => {{
                let size = std::mem::size_of::<$ty>();
                let v = <$ty>::from_le_bytes(raw[r..r + size].try_into().unwrap());
                r += size;
                v
            }};
        }
        let record = InodeRecord {
            ino: take!(u64),
            mode: take!(u32),
            uid: take!(u32),
            gid: take!(u32),
            nlink: take!(u32),
            size: take!(u64),
            atime: take!(i64),
            mtime: take!(i64),
            ctime: take!(i64),
        };
        debug_assert_eq!(r, RECORD_LEN);
        Ok(record)
    }

    pub fn persist<B: BackingStore>(&self, osio: &Osio<B>) -> Result<()> {
        let raw = self.serialize();
        osio.write(&inode_key(self.ino), 0, &raw)?;
        Ok(())
    }

    pub fn load<B: BackingStore>(osio: &Osio<B>, ino: u64) -> Result<Self> {
        let raw = match osio.read(&inode_key(ino), 0, RECORD_LEN) {
            Ok(bytes) => bytes,
            Err(Error::MissingObject { .. }) => return Err(Error::NoEntry),
            Err(e) => return Err(e),
        };
        Self::deserialize(&raw)
    }
}

/// A handle to metadata for one child, as returned by a dentry table
/// lookup: either a fully materialised LOCAL record or a REMOTE
/// forwarding address, per §9's tagged-union resolution of the source's
/// subclass-based polymorphism.
#[derive(Debug, Clone)]
pub enum InodeHandle {
    Local(InodeRecord),
    Remote(RemoteInodeHandle),
}

impl InodeHandle {
    pub fn ino(&self) -> Option<u64> {
        match self {
            InodeHandle::Local(r) => Some(r.ino),
            InodeHandle::Remote(_) => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            InodeHandle::Local(r) => r.is_dir(),
            InodeHandle::Remote(_) => false,
        }
    }
}

/// Sufficient information to forward any op for a REMOTE child to its
/// leader: the leader's address, the parent directory's ino, and the
/// filename within that parent.
#[derive(Debug, Clone)]
pub struct RemoteInodeHandle {
    pub leader_addr: String,
    pub parent_ino: u64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_round_trips() {
        let rec = InodeRecord {
            ino: 42,
            mode: libc::S_IFREG as u32 | 0o644,
            uid: 1000,
            gid: 1000,
            nlink: 1,
            size: 12345,
            atime: 10,
            mtime: 20,
            ctime: 30,
        };
        let raw = rec.serialize();
        let back = InodeRecord::deserialize(&raw).unwrap();
        assert_eq!(rec, back);
    }

    #[test]
    fn rejects_truncated_record() {
        let err = InodeRecord::deserialize(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }

    #[test]
    fn owner_write_only_rejects_other_write() {
        let rec = InodeRecord {
            ino: 1,
            mode: libc::S_IFREG as u32 | 0o600,
            uid: 10,
            gid: 10,
            nlink: 1,
            size: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        };
        assert!(rec.check_access(10, 10, libc::W_OK));
        assert!(!rec.check_access(11, 11, libc::W_OK));
        assert!(rec.check_access(11, 11, libc::F_OK));
    }

    #[test]
    fn root_bypasses_permission_bits() {
        let rec = InodeRecord {
            ino: 1,
            mode: libc::S_IFREG as u32,
            uid: 10,
            gid: 10,
            nlink: 1,
            size: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        };
        assert!(rec.check_access(0, 0, libc::W_OK));
    }
}
