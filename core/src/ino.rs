//! The inode-id space: client registration and the per-client counter.
//!
//! The high bits of a 64-bit `ino` encode a client identifier assigned at
//! mount from the persisted `client.list` registry; the low bits are a
//! per-client counter persisted as `ino_offset$<client_id>`. No two inodes
//! ever share an id, and the counter is monotonically non-decreasing.

use crate::error::{Error, Result};
use crate::osio::{BackingStore, Osio};

/// Bits reserved for the client identifier in the high part of `ino`.
pub const CLIENT_BITS: u32 = 24;
/// Bits available to the per-client counter.
pub const COUNTER_BITS: u32 = 64 - CLIENT_BITS;

/// The well-known root inode. Reserved: real client ids start at 1, so the
/// smallest possible allocated ino is `1 << COUNTER_BITS`, which never
/// collides with this sentinel.
pub const ROOT_INO: u64 = 1;

const CLIENT_LIST_KEY: &str = "client.list";
const MAX_CLIENTS: usize = 4096;

fn ino_offset_key(client_id: u64) -> String {
    format!("ino_offset${client_id}")
}

fn pack(client_id: u64, counter: u64) -> u64 {
    (client_id << COUNTER_BITS) | (counter & ((1u64 << COUNTER_BITS) - 1))
}

/// The per-client inode counter, monotonically non-decreasing and
/// persisted after every allocation (mirroring the original
/// `client::increase_ino_offset`).
pub struct InoCounter {
    client_id: u64,
    next: u64,
}

impl InoCounter {
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Allocate the next inode number, persisting the updated counter
    /// before returning it.
    pub fn alloc<B: BackingStore>(&mut self, osio: &Osio<B>) -> Result<u64> {
        let ino = pack(self.client_id, self.next);
        self.next += 1;
        osio.write(
            &ino_offset_key(self.client_id),
            0,
            &self.next.to_le_bytes(),
        )?;
        Ok(ino)
    }
}

/// Mount a client: find or allocate a client id in `client.list`, and load
/// (or initialize) its inode counter.
///
/// The whole read-modify-write against `client.list` is bracketed by an
/// exclusive advisory lock on that key itself, so concurrent mounts
/// serialize instead of racing (the original C++ `client::client()`
/// constructor read and rewrote `client.list` non-atomically; §9 of
/// SPEC_FULL.md treats that as a bug to fix, not an open question).
pub fn mount_client<B: BackingStore>(osio: &Osio<B>) -> Result<InoCounter> {
    osio.backing().lock(CLIENT_LIST_KEY, true)?;
    let result = mount_client_locked(osio);
    osio.backing().unlock(CLIENT_LIST_KEY)?;
    result
}

fn mount_client_locked<B: BackingStore>(osio: &Osio<B>) -> Result<InoCounter> {
    let mut list = match osio.read(CLIENT_LIST_KEY, 0, MAX_CLIENTS) {
        Ok(bytes) => bytes,
        Err(Error::MissingObject { bytes_so_far }) if bytes_so_far == 0 => Vec::new(),
        Err(e) => return Err(e),
    };

    // client id 0 is reserved for the root inode's implicit owner; real
    // client ids start at 1.
    if list.is_empty() {
        list.push(b'o');
    }

    for (i, slot) in list.iter_mut().enumerate().skip(1) {
        if *slot == b'x' {
            *slot = b'o';
            let client_id = i as u64;
            osio.write(CLIENT_LIST_KEY, 0, &list)?;
            return load_or_init_counter(osio, client_id);
        }
    }

    let client_id = list.len() as u64;
    list.push(b'o');
    osio.write(CLIENT_LIST_KEY, 0, &list)?;
    load_or_init_counter(osio, client_id)
}

fn load_or_init_counter<B: BackingStore>(osio: &Osio<B>, client_id: u64) -> Result<InoCounter> {
    let key = ino_offset_key(client_id);
    let next = match osio.read(&key, 0, 8) {
        Ok(bytes) if bytes.len() == 8 => u64::from_le_bytes(bytes.try_into().unwrap()),
        _ => {
            osio.write(&key, 0, &1u64.to_le_bytes())?;
            1
        }
    };
    Ok(InoCounter { client_id, next })
}

/// Mark a client id as free again in `client.list`. Called on unmount.
pub fn unmount_client<B: BackingStore>(osio: &Osio<B>, client_id: u64) -> Result<()> {
    osio.backing().lock(CLIENT_LIST_KEY, true)?;
    let result = (|| {
        let mut list = osio.read(CLIENT_LIST_KEY, 0, MAX_CLIENTS)?;
        if let Some(slot) = list.get_mut(client_id as usize) {
            *slot = b'x';
        }
        osio.write(CLIENT_LIST_KEY, 0, &list)?;
        Ok(())
    })();
    osio.backing().unlock(CLIENT_LIST_KEY)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osio::tests::MemBackingStore;

    #[test]
    fn first_mount_gets_client_one() {
        let osio = Osio::with_object_bits(MemBackingStore::default(), 10);
        let counter = mount_client(&osio).unwrap();
        assert_eq!(counter.client_id(), 1);
    }

    #[test]
    fn two_clients_never_collide() {
        let osio = Osio::with_object_bits(MemBackingStore::default(), 10);
        let mut a = mount_client(&osio).unwrap();
        let mut b = mount_client(&osio).unwrap();
        assert_ne!(a.client_id(), b.client_id());

        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            assert!(seen.insert(a.alloc(&osio).unwrap()));
            assert!(seen.insert(b.alloc(&osio).unwrap()));
        }
    }

    #[test]
    fn counter_is_monotonic_and_persisted() {
        let osio = Osio::with_object_bits(MemBackingStore::default(), 10);
        let mut c = mount_client(&osio).unwrap();
        let first = c.alloc(&osio).unwrap();
        let second = c.alloc(&osio).unwrap();
        assert!(second > first);
    }

    #[test]
    fn freed_client_id_is_reused() {
        let osio = Osio::with_object_bits(MemBackingStore::default(), 10);
        let a = mount_client(&osio).unwrap();
        let id = a.client_id();
        unmount_client(&osio, id).unwrap();
        let b = mount_client(&osio).unwrap();
        assert_eq!(b.client_id(), id);
    }
}
