//! The segmented object-store I/O layer (OSIO).
//!
//! OSIO presents read/write/exist/remove over opaque string keys with
//! arbitrary byte offsets and lengths, backed by a store that can only
//! address whole objects or sub-object ranges by object name. A logical key
//! is split into fixed-size segments named `key$n`; OSIO stitches reads and
//! writes across segment boundaries and brackets every segment access with
//! an advisory lock.

mod http;

pub use http::HttpBackingStore;

use crate::error::{Error, Result};

/// Reference object size: 4 MiB, a power of two.
pub const DEFAULT_OBJ_BITS: u32 = 22;

/// A backing store able to address one object (or a sub-range of it) at a
/// time, plus advisory per-object locking. Implementations are blocking;
/// an async transport (like [`HttpBackingStore`]) hides its own runtime.
pub trait BackingStore: Send + Sync {
    /// Read `length` bytes from `key` starting at `offset`. Returns
    /// [`Error::NoEntry`] if the object does not exist.
    fn read_obj(&self, key: &str, offset: u64, length: usize) -> Result<Vec<u8>>;

    /// Write `data` to `key` starting at `offset`, returning bytes written.
    fn write_obj(&self, key: &str, offset: u64, data: &[u8]) -> Result<usize>;

    fn exist(&self, key: &str) -> Result<bool>;

    /// Idempotent: removing an absent object is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Acquire an advisory lock on `object`. `exclusive` selects a
    /// writer-style lock over a shared reader-style one. The lock holder,
    /// cookie, and tag all collapse to the object name itself, since the
    /// client already serializes its own namespace traffic.
    fn lock(&self, object: &str, exclusive: bool) -> Result<()>;

    fn unlock(&self, object: &str) -> Result<()>;
}

/// The segmentation/stitching engine on top of a [`BackingStore`].
pub struct Osio<B> {
    backing: B,
    obj_bits: u32,
}

impl<B: BackingStore> Osio<B> {
    pub fn new(backing: B) -> Self {
        Self::with_object_bits(backing, DEFAULT_OBJ_BITS)
    }

    pub fn with_object_bits(backing: B, obj_bits: u32) -> Self {
        Self { backing, obj_bits }
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    fn obj_size(&self) -> u64 {
        1u64 << self.obj_bits
    }

    fn segment_key(key: &str, n: u64) -> String {
        format!("{key}${n}")
    }

    /// Read `len` bytes of logical key `key` starting at `offset`. On a
    /// short read caused by a missing segment, returns
    /// `Error::MissingObject { bytes_so_far }` carrying what was read
    /// before the gap, so the caller can report a short read.
    pub fn read(&self, key: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mask = self.obj_size() - 1;
        let mut cursor = offset;
        let stop = offset + len as u64;
        let mut out = Vec::with_capacity(len);

        while cursor < stop {
            let seg_num = cursor >> self.obj_bits;
            let seg_key = Self::segment_key(key, seg_num);
            let next_bound = (cursor & !mask) + self.obj_size();
            let sub_len = (std::cmp::min(next_bound, stop) - cursor) as usize;
            let intra_offset = cursor & mask;

            self.backing.lock(&seg_key, false)?;
            let res = self.backing.read_obj(&seg_key, intra_offset, sub_len);
            self.backing.unlock(&seg_key)?;

            match res {
                Ok(bytes) => out.extend_from_slice(&bytes),
                Err(Error::NoEntry) => {
                    return Err(Error::MissingObject {
                        bytes_so_far: out.len(),
                    });
                }
                Err(e) => return Err(e),
            }

            cursor = next_bound;
        }

        Ok(out)
    }

    /// Write `value` to logical key `key` at `offset`. Returns the total
    /// number of bytes transferred, which equals `value.len()` on success.
    pub fn write(&self, key: &str, offset: u64, value: &[u8]) -> Result<usize> {
        let mask = self.obj_size() - 1;
        let mut cursor = offset;
        let stop = offset + value.len() as u64;
        let mut sum = 0usize;

        while cursor < stop {
            let seg_num = cursor >> self.obj_bits;
            let seg_key = Self::segment_key(key, seg_num);
            let next_bound = (cursor & !mask) + self.obj_size();
            let sub_len = (std::cmp::min(next_bound, stop) - cursor) as usize;
            let intra_offset = cursor & mask;
            let chunk = &value[sum..sum + sub_len];

            self.backing.lock(&seg_key, true)?;
            let written = self.backing.write_obj(&seg_key, intra_offset, chunk);
            self.backing.unlock(&seg_key)?;

            sum += written?;
            cursor = next_bound;
        }

        Ok(sum)
    }

    /// Whether logical key `key` has any data, i.e. whether its first
    /// segment exists. Single-object records (inode/dentry entries) never
    /// span more than one segment, so checking `key$0` is sufficient.
    pub fn exist(&self, key: &str) -> Result<bool> {
        self.backing.exist(&Self::segment_key(key, 0))
    }

    /// Remove a logical key that is known to fit in a single segment (an
    /// inode record or dentry entry). Multi-segment content must go
    /// through [`Osio::delete`] instead, which walks every segment.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.backing.remove(&Self::segment_key(key, 0))
    }

    /// Remove every segment of a logical key whose content spans
    /// `total_len` bytes. Unlike [`Osio::remove`] (which removes one
    /// literal object), this walks the same segment numbering `read`/
    /// `write` use so a file's full backing-object set is freed.
    pub fn delete(&self, key: &str, total_len: u64) -> Result<()> {
        if total_len == 0 {
            return self.backing.remove(&Self::segment_key(key, 0));
        }
        let max_seg = (total_len - 1) >> self.obj_bits;
        for n in 0..=max_seg {
            self.backing.remove(&Self::segment_key(key, n))?;
        }
        Ok(())
    }

    /// After shrinking a logical key from `old_len` to `new_len`, free the
    /// segments that now lie entirely beyond `new_len`. The boundary
    /// segment (partially valid) is left alone: callers never read past
    /// `new_len` anyway, so its trailing bytes are simply never observed.
    pub fn delete_tail(&self, key: &str, new_len: u64, old_len: u64) -> Result<()> {
        if old_len == 0 {
            return Ok(());
        }
        let old_max_seg = (old_len - 1) >> self.obj_bits;
        let first_freed_seg = if new_len == 0 {
            0
        } else {
            ((new_len - 1) >> self.obj_bits) + 1
        };
        if first_freed_seg > old_max_seg {
            return Ok(());
        }
        for n in first_freed_seg..=old_max_seg {
            self.backing.remove(&Self::segment_key(key, n))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An in-memory backing store used to exercise segmentation without a
    /// real transport. Also reused by other core modules' unit tests.
    #[derive(Default)]
    pub struct MemBackingStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        locks: Mutex<HashMap<String, bool>>,
    }

    impl BackingStore for MemBackingStore {
        fn read_obj(&self, key: &str, offset: u64, length: usize) -> Result<Vec<u8>> {
            let objects = self.objects.lock().unwrap();
            let obj = objects.get(key).ok_or(Error::NoEntry)?;
            let start = offset as usize;
            let end = std::cmp::min(start + length, obj.len());
            if start >= obj.len() {
                return Ok(vec![]);
            }
            Ok(obj[start..end].to_vec())
        }

        fn write_obj(&self, key: &str, offset: u64, data: &[u8]) -> Result<usize> {
            let mut objects = self.objects.lock().unwrap();
            let obj = objects.entry(key.to_string()).or_default();
            let start = offset as usize;
            let end = start + data.len();
            if obj.len() < end {
                obj.resize(end, 0);
            }
            obj[start..end].copy_from_slice(data);
            Ok(data.len())
        }

        fn exist(&self, key: &str) -> Result<bool> {
            Ok(self.objects.lock().unwrap().contains_key(key))
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        fn lock(&self, object: &str, exclusive: bool) -> Result<()> {
            let mut locks = self.locks.lock().unwrap();
            if locks.contains_key(object) {
                return Err(Error::LockContended);
            }
            locks.insert(object.to_string(), exclusive);
            Ok(())
        }

        fn unlock(&self, object: &str) -> Result<()> {
            self.locks.lock().unwrap().remove(object);
            Ok(())
        }
    }

    fn osio() -> Osio<MemBackingStore> {
        Osio::with_object_bits(MemBackingStore::default(), 4) // 16-byte objects
    }

    #[test]
    fn round_trip_within_one_segment() {
        let o = osio();
        o.write("k", 0, b"hello").unwrap();
        let back = o.read("k", 0, 5).unwrap();
        assert_eq!(back, b"hello");
    }

    #[test]
    fn stitches_across_segment_boundary() {
        let o = osio();
        let payload: Vec<u8> = (0u8..40).collect();
        let n = o.write("k", 3, &payload).unwrap();
        assert_eq!(n, payload.len());
        let back = o.read("k", 3, payload.len()).unwrap();
        assert_eq!(back, payload);
        assert!(o.backing().exist("k$0").unwrap());
        assert!(o.backing().exist("k$1").unwrap());
        assert!(o.backing().exist("k$2").unwrap());
    }

    #[test]
    fn disjoint_segments_are_independent() {
        let o = osio();
        o.write("k", 0, b"AAAA").unwrap();
        o.write("k", 16, b"BBBB").unwrap();
        assert_eq!(o.read("k", 0, 4).unwrap(), b"AAAA");
        assert_eq!(o.read("k", 16, 4).unwrap(), b"BBBB");
    }

    #[test]
    fn missing_segment_reports_short_read() {
        let o = osio();
        o.write("k", 0, b"0123456789ABCDEF").unwrap(); // exactly one segment
        // second segment (k$1) was never written -> missing on read
        let err = o.read("k", 0, 20).unwrap_err();
        match err {
            Error::MissingObject { bytes_so_far } => assert_eq!(bytes_so_far, 16),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn remove_is_idempotent() {
        let o = osio();
        o.remove("never-existed").unwrap();
    }

    #[test]
    fn remove_clears_a_single_segment_record() {
        let o = osio();
        o.write("inode$7", 0, b"record").unwrap();
        assert!(o.exist("inode$7").unwrap());
        o.remove("inode$7").unwrap();
        assert!(!o.exist("inode$7").unwrap());
        assert!(!o.backing().exist("inode$7$0").unwrap());
    }

    #[test]
    fn delete_tail_keeps_boundary_segment() {
        let o = osio();
        let payload: Vec<u8> = (0u8..40).collect(); // spans k$0, k$1, k$2 @ 16-byte objects
        o.write("k", 0, &payload).unwrap();
        o.delete_tail("k", 20, 40).unwrap(); // new length lands inside k$1
        assert!(o.backing().exist("k$0").unwrap());
        assert!(o.backing().exist("k$1").unwrap());
        assert!(!o.backing().exist("k$2").unwrap());
    }

    #[test]
    fn delete_frees_every_segment() {
        let o = osio();
        let payload: Vec<u8> = (0u8..40).collect();
        o.write("k", 0, &payload).unwrap();
        o.delete("k", payload.len() as u64).unwrap();
        assert!(!o.backing().exist("k$0").unwrap());
        assert!(!o.backing().exist("k$1").unwrap());
        assert!(!o.backing().exist("k$2").unwrap());
    }
}
