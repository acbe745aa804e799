//! The public writer API (spec §4.3): `StateJournal::open/get/get_raw/
//! update/delete/commit/rollback`.
//!
//! Grounded on `statejournal.py::StateJournal` for semantics, and on the
//! teacher's `KvStore::open` for the shape of "replay on open, keep a
//! handful of fields tracking write position" construction.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::JournalConfig;
use crate::encoding::{decode_stored_record, encode_log_record, encode_stored_record};
use crate::error::{JournalError, Result};
use crate::hash::{self, Digest32};
use crate::journal::JournalWriter;
use crate::kv::{KvBackend, SledBackend};
use crate::reader::JournalReader;

/// The journal-backed key-value store: the single writer for one journal
/// directory.
pub struct StateJournal<K: KvBackend = SledBackend> {
    dir: PathBuf,
    config: JournalConfig,
    kv: K,
    journal: JournalWriter,
    update_counter: u64,
    state_digest: Digest32,
}

impl StateJournal<SledBackend> {
    /// Open (or create) a state journal rooted at `directory`, using the
    /// default `sled`-backed KV adapter.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(directory, JournalConfig::default())
    }

    /// Open with an explicit [`JournalConfig`].
    pub fn open_with_config(directory: impl AsRef<Path>, config: JournalConfig) -> Result<Self> {
        let kv = SledBackend::open(directory.as_ref().join("kv"), config.fsync_on_commit)?;
        Self::open_with_backend(directory, config, kv)
    }
}

impl<K: KvBackend> StateJournal<K> {
    /// Open a state journal over a caller-supplied `KvBackend`, e.g. for
    /// tests that want an in-memory backend instead of `sled`.
    pub fn open_with_backend(directory: impl AsRef<Path>, config: JournalConfig, kv: K) -> Result<Self> {
        let dir = directory.as_ref().to_path_buf();
        let empty = hash::empty_digest(config.hash);
        let (journal, update_counter, state_digest) = JournalWriter::open(&dir, empty)?;
        info!(
            "opened state journal at {:?}, update_counter={}",
            dir, update_counter
        );
        Ok(StateJournal {
            dir,
            config,
            kv,
            journal,
            update_counter,
            state_digest,
        })
    }

    /// The number of updates committed so far (0 for a fresh journal).
    pub fn update_counter(&self) -> u64 {
        self.update_counter
    }

    /// The current rolling state digest.
    pub fn state_digest(&self) -> Digest32 {
        self.state_digest
    }

    /// Look up the current value for `key`; the empty byte string if it was
    /// never written or has since been deleted.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        Ok(self.get_raw(key)?.0)
    }

    /// Look up `(value, update_counter)` for `key`. Returns `(vec![], 0)`
    /// for a key that was never written, or has been deleted.
    pub fn get_raw(&self, key: &[u8]) -> Result<(Vec<u8>, u64)> {
        match self.kv.get(key)? {
            Some(stored) => decode_stored_record(&stored),
            None => Ok((Vec::new(), 0)),
        }
    }

    /// Set `key` to `value`. An empty `value` is equivalent to `delete`.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<u64> {
        let (_, old_counter) = self.get_raw(key)?;
        let new_counter = self.update_counter + 1;

        let log = encode_log_record(key, value, old_counter);
        let entry_len = 32 + log.len() + 2;
        if entry_len >= 1 << 16 {
            return Err(JournalError::EntryTooLarge { len: entry_len });
        }

        if value.is_empty() {
            self.kv.delete(key.to_vec());
        } else {
            let stored = encode_stored_record(value, new_counter);
            self.kv.put(key.to_vec(), stored);
        }

        let log_hash = hash::digest(self.config.hash, &log);
        let new_state_digest = hash::state_hash(self.config.hash, &self.state_digest, &log_hash);

        self.journal.append(&new_state_digest, &log)?;

        self.state_digest = new_state_digest;
        self.update_counter = new_counter;
        debug!("update_counter={} key_len={}", self.update_counter, key.len());
        Ok(new_counter)
    }

    /// Delete `key`. Equivalent to `update(key, &[])`.
    pub fn delete(&mut self, key: &[u8]) -> Result<u64> {
        self.update(key, &[])
    }

    /// Flush the journal, index, and KV batch as one logical transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.journal.flush()?;
        self.kv.commit()?;
        Ok(())
    }

    /// Revert to the state immediately after update `target_counter`
    /// (`target_counter == 0` reverts to the empty journal).
    ///
    /// O(N - target_counter) plus one random seek per restored key; intended
    /// for small recent rewinds, not deep history.
    pub fn rollback(&mut self, target_counter: u64) -> Result<()> {
        if target_counter > self.update_counter {
            return Err(JournalError::InvalidRollback {
                target: target_counter,
                current: self.update_counter,
            });
        }
        if target_counter == self.update_counter {
            return Ok(());
        }

        let reader = JournalReader::open(&self.dir)?;
        for counter in (target_counter + 1..=self.update_counter).rev() {
            let entry = reader.read_update(counter)?;
            if entry.prev_update_counter > 0 {
                let prev = reader.read_update(entry.prev_update_counter)?;
                let stored = encode_stored_record(&prev.value, entry.prev_update_counter);
                self.kv.put(entry.key.clone(), stored);
            } else {
                self.kv.delete(entry.key.clone());
            }
        }

        self.state_digest = if target_counter == 0 {
            hash::empty_digest(self.config.hash)
        } else {
            reader.read_update(target_counter)?.state_digest
        };

        let journal_offset = if target_counter == 0 {
            0
        } else {
            reader.entry_end_offset(target_counter)?
        };
        self.journal.truncate(target_counter, journal_offset)?;
        self.update_counter = target_counter;

        self.kv.commit()?;
        info!("rolled back to update_counter={}", target_counter);
        Ok(())
    }
}
