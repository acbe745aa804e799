//! The journal reader (spec §4.4): seek by update counter, parse entries,
//! recompute the digest chain, and yield SSV proofs.
//!
//! Grounded on `statejournal.py::JournalReader`, restructured around
//! `std::cell::RefCell`-guarded file handles so the read-only API can stay
//! `&self` the way a reader with no mutable state should, the same shape
//! the teacher's `BufReaderWithPos` gives its one mutable owner inside
//! `KvStore`.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::config::HashAlgorithm;
use crate::encoding::decode_log_record;
use crate::error::{JournalError, Result};
use crate::hash::{self, Digest32};
use crate::journal::{index_path, journal_path};

const INDEX_SLOT_SIZE: u64 = 4;
const LENGTH_TRAILER_SIZE: u64 = 2;
const DIGEST_SIZE: u64 = 32;

/// One parsed journal entry.
#[derive(Debug, Clone)]
pub struct Update {
    /// the counter naming this update (first is 1)
    pub update_counter: u64,
    /// the caller-supplied key
    pub key: Vec<u8>,
    /// the caller-supplied value (empty for a deletion)
    pub value: Vec<u8>,
    /// the counter at which this key was previously written (0 if never)
    pub prev_update_counter: u64,
    /// the rolling state digest after this update was folded in
    pub state_digest: Digest32,
    /// `H(log_record)` for this entry
    pub log_hash: Digest32,
}

/// A Simplified State Verification proof for the value written at
/// `get_ssv`'s `start_counter` argument.
#[derive(Debug, Clone)]
pub struct SsvProof {
    /// the value written at the proof's target counter
    pub value: Vec<u8>,
    /// that update's `prev_update_counter`
    pub prev_update_counter: u64,
    /// `prev_state_digest, log_hash(target), log_hash(target+1), ...,
    /// log_hash(current)`; folding left-to-right with `H(s || h)` must
    /// reproduce the current state digest
    pub hash_chain: Vec<Digest32>,
}

/// Read-only access to a journal directory's committed entries.
pub struct JournalReader {
    journal: RefCell<File>,
    index: RefCell<File>,
    algo: HashAlgorithm,
}

impl JournalReader {
    /// Open a journal directory for reading, assuming the default hash
    /// algorithm (SHA3-256).
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with_algo(dir, HashAlgorithm::Sha3_256)
    }

    /// Open a journal directory for reading with an explicit hash
    /// algorithm -- the file format does not self-describe which one
    /// produced it, so the caller must know.
    pub fn open_with_algo(dir: &Path, algo: HashAlgorithm) -> Result<Self> {
        let journal = File::open(journal_path(dir))?;
        let index = File::open(index_path(dir))?;
        Ok(JournalReader {
            journal: RefCell::new(journal),
            index: RefCell::new(index),
            algo,
        })
    }

    /// The number of committed updates, re-derived from the current index
    /// file length (readers re-stat rather than caching).
    pub fn update_counter(&self) -> Result<u64> {
        Ok(self.index.borrow().metadata()?.len() / INDEX_SLOT_SIZE)
    }

    /// The most recent committed update, or `None` if the journal is empty.
    pub fn last_update(&self) -> Result<Option<Update>> {
        let counter = self.update_counter()?;
        if counter == 0 {
            Ok(None)
        } else {
            Ok(Some(self.read_update(counter)?))
        }
    }

    /// The journal byte offset immediately past update `counter`'s entry.
    pub(crate) fn entry_end_offset(&self, counter: u64) -> Result<u64> {
        if counter == 0 || counter > self.update_counter()? {
            return Err(JournalError::NotFound(counter));
        }
        let mut index = self.index.borrow_mut();
        index.seek(SeekFrom::Start((counter - 1) * INDEX_SLOT_SIZE))?;
        let mut buf = [0u8; 4];
        index.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf) as u64)
    }

    /// Parse the entry for `update_counter` (first update is 1).
    pub fn read_update(&self, update_counter: u64) -> Result<Update> {
        let end_offset = self.entry_end_offset(update_counter)?;

        let mut journal = self.journal.borrow_mut();
        journal.seek(SeekFrom::Start(end_offset - LENGTH_TRAILER_SIZE))?;
        let mut len_buf = [0u8; 2];
        journal.read_exact(&mut len_buf)?;
        let entry_len = u16::from_be_bytes(len_buf) as u64;
        if entry_len < DIGEST_SIZE + LENGTH_TRAILER_SIZE || entry_len > end_offset {
            return Err(JournalError::Corrupt(format!(
                "entry {} has an implausible length trailer {}",
                update_counter, entry_len
            )));
        }

        journal.seek(SeekFrom::Start(end_offset - entry_len))?;
        let mut digest = [0u8; 32];
        journal.read_exact(&mut digest)?;
        let log_len = (entry_len - DIGEST_SIZE - LENGTH_TRAILER_SIZE) as usize;
        let mut log = vec![0u8; log_len];
        journal.read_exact(&mut log)?;
        drop(journal);

        let (key, value, prev_update_counter) = decode_log_record(&log)
            .map_err(|e| JournalError::Corrupt(format!("entry {}: {}", update_counter, e)))?;
        let log_hash = hash::digest(self.algo, &log);

        Ok(Update {
            update_counter,
            key,
            value,
            prev_update_counter,
            state_digest: digest,
            log_hash,
        })
    }

    /// Fold `state <- H(state || H(log))` over entries `1..=up_to` starting
    /// from `H("")`, asserting the running digest matches each entry's
    /// stored digest. Returns the final digest (`H("")` if `up_to == 0`).
    pub fn validate_state(&self, up_to: u64) -> Result<Digest32> {
        let mut state = hash::empty_digest(self.algo);
        for counter in 1..=up_to {
            let entry = self.read_update(counter)?;
            let folded = hash::state_hash(self.algo, &state, &entry.log_hash);
            if folded != entry.state_digest {
                return Err(JournalError::Corrupt(format!(
                    "digest chain broken at update_counter {}",
                    counter
                )));
            }
            state = folded;
        }
        Ok(state)
    }

    /// Produce a Simplified State Verification proof that the value
    /// written at `start_counter` is part of the current digest.
    pub fn get_ssv(&self, start_counter: u64) -> Result<SsvProof> {
        let start = self.read_update(start_counter)?;
        let prev_state_digest = if start_counter == 1 {
            hash::empty_digest(self.algo)
        } else {
            self.read_update(start_counter - 1)?.state_digest
        };

        let mut hash_chain = vec![prev_state_digest, start.log_hash];
        let total = self.update_counter()?;
        for counter in (start_counter + 1)..=total {
            hash_chain.push(self.read_update(counter)?.log_hash);
        }

        Ok(SsvProof {
            value: start.value,
            prev_update_counter: start.prev_update_counter,
            hash_chain,
        })
    }
}

/// Fold an SSV `hash_chain` the way a light client would: `s <- chain[0]`,
/// then `s <- H(s || h)` for every subsequent hash. The result should equal
/// the journal's current state digest.
pub fn evaluate_ssv(algo: HashAlgorithm, hash_chain: &[Digest32]) -> Option<Digest32> {
    let (first, rest) = hash_chain.split_first()?;
    Some(rest.iter().fold(*first, |s, h| hash::state_hash(algo, &s, h)))
}
