//! The on-disk dentry record: a directory's children as a
//! `filename -> child ino` map, persisted to `dentry$<ino>`.

use crate::error::{Error, Result};
use crate::osio::{BackingStore, Osio};
use std::collections::BTreeMap;

pub fn dentry_key(ino: u64) -> String {
    format!("dentry${ino}")
}

/// The object size bound used when reading back a dentry object; dentries
/// are assumed to fit in one backing object (see the `TODO` left in the
/// source about dentries exceeding a single object, not addressed here).
const MAX_DENTRY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dentry {
    pub ino: u64,
    /// filename -> child ino. A `BTreeMap` gives a deterministic
    /// serialization order, which keeps round-trip tests simple.
    pub children: BTreeMap<String, u64>,
}

impl Dentry {
    pub fn new(ino: u64) -> Self {
        Self {
            ino,
            children: BTreeMap::new(),
        }
    }

    pub fn add_child(&mut self, name: String, ino: u64) {
        self.children.insert(name, ino);
    }

    pub fn delete_child(&mut self, name: &str) -> Option<u64> {
        self.children.remove(name)
    }

    pub fn get_child_ino(&self, name: &str) -> Option<u64> {
        self.children.get(name).copied()
    }

    /// `(child_count, Σ(namelen, name, child_ino))`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.children.len() as u64).to_le_bytes());
        for (name, ino) in &self.children {
            let name_bytes = name.as_bytes();
            buf.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(name_bytes);
            buf.extend_from_slice(&ino.to_le_bytes());
        }
        buf
    }

    /// Deserializes a dentry, verifying the invariant that the total
    /// consumed byte length equals the object size (`raw.len()`).
    pub fn deserialize(ino: u64, raw: &[u8]) -> Result<Self> {
        let mut r = 0usize;
        let read_u64 = |raw: &[u8], r: &mut usize| -> Result<u64> {
            let v = raw
                .get(*r..*r + 8)
                .ok_or_else(|| Error::Corrupt("dentry: truncated u64".into()))?;
            *r += 8;
            Ok(u64::from_le_bytes(v.try_into().unwrap()))
        };
        let read_u32 = |raw: &[u8], r: &mut usize| -> Result<u32> {
            let v = raw
                .get(*r..*r + 4)
                .ok_or_else(|| Error::Corrupt("dentry: truncated u32".into()))?;
            *r += 4;
            Ok(u32::from_le_bytes(v.try_into().unwrap()))
        };

        let count = read_u64(raw, &mut r)?;
        let mut children = BTreeMap::new();
        for _ in 0..count {
            let namelen = read_u32(raw, &mut r)? as usize;
            let name_bytes = raw
                .get(r..r + namelen)
                .ok_or_else(|| Error::Corrupt("dentry: truncated name".into()))?;
            let name = String::from_utf8(name_bytes.to_vec())
                .map_err(|_| Error::Corrupt("dentry: non-utf8 name".into()))?;
            r += namelen;
            let child_ino = read_u64(raw, &mut r)?;
            children.insert(name, child_ino);
        }

        if r != raw.len() {
            return Err(Error::Corrupt(format!(
                "dentry: consumed {r} bytes but object was {}",
                raw.len()
            )));
        }

        Ok(Dentry { ino, children })
    }

    pub fn sync<B: BackingStore>(&self, osio: &Osio<B>) -> Result<()> {
        let raw = self.serialize();
        osio.write(&dentry_key(self.ino), 0, &raw)?;
        Ok(())
    }

    pub fn load<B: BackingStore>(osio: &Osio<B>, ino: u64) -> Result<Self> {
        match osio.read(&dentry_key(ino), 0, MAX_DENTRY_BYTES) {
            Ok(raw) => Self::deserialize(ino, &raw),
            Err(Error::MissingObject { bytes_so_far }) if bytes_so_far == 0 => Ok(Self::new(ino)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_round_trips() {
        let mut d = Dentry::new(7);
        d.add_child("a".into(), 100);
        d.add_child("bee".into(), 200);
        let raw = d.serialize();
        let back = Dentry::deserialize(7, &raw).unwrap();
        assert_eq!(d, back);
    }

    #[test]
    fn empty_dentry_round_trips() {
        let d = Dentry::new(1);
        let raw = d.serialize();
        let back = Dentry::deserialize(1, &raw).unwrap();
        assert!(back.children.is_empty());
    }

    #[test]
    fn rejects_trailing_garbage() {
        let d = Dentry::new(1);
        let mut raw = d.serialize();
        raw.push(0xFF);
        assert!(Dentry::deserialize(1, &raw).is_err());
    }
}
