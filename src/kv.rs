//! The KV backend adapter (spec §4.1): a buffered, batch-committing wrapper
//! around an ordered KV store.
//!
//! The `KvBackend` trait plays the role the teacher's `KvsEngine` trait
//! plays for its two interchangeable storage engines (`KvStore`,
//! `SledKvsEngine`) -- one interface, selected at construction time, no
//! runtime polymorphism required. The buffering semantics (uncommitted
//! writes shadow the backing store; an uncommitted delete reads back as
//! absent) come from `db.py`'s `LevelDB` adapter in the original
//! prototype.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use sled::{Batch, Db};

use crate::error::Result;

/// An ordered KV store with staged writes and an atomic batch commit.
pub trait KvBackend {
    /// Current value for `key`, honoring any uncommitted staged write.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    /// Stage a write; visible to `get` immediately, durable only after `commit`.
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);
    /// Stage a delete; visible to `get` immediately, durable only after `commit`.
    fn delete(&mut self, key: Vec<u8>);
    /// Apply every staged write/delete in one durable batch, then clear the buffer.
    fn commit(&mut self) -> Result<()>;
}

/// A `KvBackend` over a `sled::Db`.
pub struct SledBackend {
    db: Db,
    uncommitted: HashMap<Vec<u8>, Option<Vec<u8>>>,
    fsync_on_commit: bool,
}

impl SledBackend {
    /// Open (or create) a sled database rooted at `path`.
    pub fn open(path: impl AsRef<Path>, fsync_on_commit: bool) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(SledBackend {
            db,
            uncommitted: HashMap::new(),
            fsync_on_commit,
        })
    }
}

impl KvBackend for SledBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.uncommitted.get(key) {
            return Ok(staged.clone());
        }
        Ok(self.db.get(key)?.map(|ivec| ivec.as_ref().to_vec()))
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.uncommitted.insert(key, Some(value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.uncommitted.insert(key, None);
    }

    fn commit(&mut self) -> Result<()> {
        if self.uncommitted.is_empty() {
            return Ok(());
        }
        let mut batch = Batch::default();
        for (key, value) in self.uncommitted.drain() {
            match value {
                Some(v) => batch.insert(key, v),
                None => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        if self.fsync_on_commit {
            self.db.flush()?;
        }
        debug!("kv backend committed");
        Ok(())
    }
}
