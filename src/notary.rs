//! The notary (spec §4.5): a standalone hash-chained, proof-of-existence
//! log with a base-2/base-64 skip-list ancestry giving O(log n) inclusion
//! proofs.
//!
//! Ported from `proofofexistence/notary.py` -- the skip-list math
//! (`distant_ancestor`, `get_path`, proof assembly/evaluation) is carried
//! over faithfully since it *is* the algorithm under test, just rewritten
//! without recursion and with on-disk access mediated by a single
//! `RefCell`-guarded file the way `JournalReader` does it.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::HashAlgorithm;
use crate::error::Result;
use crate::hash::{self, notary_data_hash, notary_hash, Digest32};

const RECORD_SIZE: u64 = 64;

/// The skip-pointer target for position `n`: even positions chain densely
/// (base 2) for short-range proofs, odd positions jump aggressively (base
/// 64) so proofs through mostly-odd ranges stay short.
fn distant_ancestor(n: u64) -> u64 {
    assert!(n > 0);
    let (base, m) = if n % 2 == 0 { (2u64, n) } else { (64u64, n + 1) };
    let mut p = 0u32;
    while m % base.pow(p + 1) == 0 {
        p += 1;
    }
    if m == base.pow(p) {
        p -= 1;
    }
    let bn = m - base.pow(p);
    if bn == n {
        n - 1
    } else {
        bn
    }
}

#[derive(Debug, Clone, Copy)]
enum Hop {
    /// the proof jumped from `number` via its distant ancestor
    Distant(u64),
    /// the proof jumped from `number` via its direct predecessor
    Direct(u64),
}

/// The sequence of hops from `start` down to (but not including) `target`,
/// ordered from `target` upward to `start` (i.e. the order a verifier
/// folds proof hashes in).
fn get_path(start: u64, target: u64) -> Vec<Hop> {
    let mut number = start;
    let mut hops = Vec::new();
    while number != target {
        let prev = number - 1;
        let distant = distant_ancestor(number);
        if distant >= target {
            hops.push(Hop::Distant(number));
            number = distant;
        } else {
            hops.push(Hop::Direct(number));
            number = prev;
        }
    }
    hops.reverse();
    hops
}

/// Fold a proof's hashes the way `get_proof` assembled them: pair up the
/// first two, then fold every remaining hash in with the order-normalising
/// `H`. The result should equal the notary's current top `rolling_hash`.
pub fn evaluate_proof(hashes: &[Digest32]) -> Option<Digest32> {
    match hashes {
        [] => None,
        [single] => Some(*single),
        [first, second, rest @ ..] => {
            let mut h = notary_hash(first, second);
            for next in rest {
                h = notary_hash(&h, next);
            }
            Some(h)
        }
    }
}

/// A proof-of-existence log backed by a fixed-record file.
///
/// Position 0 is seeded with `(H(""), H(""))`; every subsequent position
/// holds `(rolling_hash, data_hash)` for one `append` call.
pub struct Notary {
    file: RefCell<File>,
    counter: u64,
}

impl Notary {
    /// Open (or create) a notary log at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let existed = path.exists();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let on_disk = if existed {
            file.metadata()?.len() / RECORD_SIZE
        } else {
            0
        };

        let notary = Notary {
            file: RefCell::new(file),
            counter: on_disk.max(1),
        };
        if on_disk == 0 {
            let seed = hash::empty_digest(HashAlgorithm::Sha256);
            notary.write_record(0, &seed, &seed)?;
        }
        Ok(notary)
    }

    fn write_record(&self, position: u64, rolling: &Digest32, data: &Digest32) -> Result<()> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(position * RECORD_SIZE))?;
        file.write_all(rolling)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    fn read_record(&self, position: u64) -> Result<(Digest32, Digest32)> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(position * RECORD_SIZE))?;
        let mut rolling = [0u8; 32];
        let mut data = [0u8; 32];
        file.read_exact(&mut rolling)?;
        file.read_exact(&mut data)?;
        Ok((rolling, data))
    }

    fn hash_at(&self, position: u64) -> Result<Digest32> {
        Ok(self.read_record(position)?.0)
    }

    fn data_at(&self, position: u64) -> Result<Digest32> {
        Ok(self.read_record(position)?.1)
    }

    fn prev_hash(&self, number: u64) -> Result<Digest32> {
        self.hash_at(number - 1)
    }

    fn distant_hash(&self, number: u64) -> Result<Digest32> {
        self.hash_at(distant_ancestor(number))
    }

    /// The number of appended entries (not counting the position-0 seed).
    pub fn counter(&self) -> u64 {
        self.counter - 1
    }

    /// The notary's current top digest.
    pub fn digest(&self) -> Result<Digest32> {
        self.hash_at(self.counter - 1)
    }

    /// Append a data hash.
    pub fn append(&mut self, data_hash: Digest32) -> Result<()> {
        let number = self.counter;
        let h = notary_hash(
            &self.distant_hash(number)?,
            &notary_hash(&data_hash, &self.prev_hash(number)?),
        );
        self.write_record(number, &h, &data_hash)?;
        self.counter += 1;
        Ok(())
    }

    /// Hash arbitrary bytes and append it in one step.
    pub fn append_data(&mut self, data: &[u8]) -> Result<()> {
        self.append(notary_data_hash(data))
    }

    /// Build an inclusion proof for position `number` (1-based from the
    /// caller's point of view: `number < counter()+1`). When `digest` is
    /// true the proof is for the *rolling hash* at that position rather
    /// than the raw data hash.
    pub fn get_proof(&self, number: u64, digest: bool) -> Result<Vec<Digest32>> {
        let top = self.counter - 1;
        let path = get_path(top, number);

        let mut hashes = Vec::new();
        if digest {
            hashes.push(self.hash_at(number)?);
        } else {
            hashes.push(self.data_at(number)?);
            hashes.push(self.prev_hash(number)?);
            hashes.push(self.distant_hash(number)?);
        }
        for hop in path {
            match hop {
                Hop::Distant(n) => hashes.push(notary_hash(&self.prev_hash(n)?, &self.data_at(n)?)),
                Hop::Direct(n) => {
                    hashes.push(self.data_at(n)?);
                    hashes.push(self.distant_hash(n)?);
                }
            }
        }
        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distant_ancestor_even_positions_use_base_two() {
        assert_eq!(distant_ancestor(2), 1);
        assert_eq!(distant_ancestor(4), 2);
        assert_eq!(distant_ancestor(8), 4);
    }

    #[test]
    fn distant_ancestor_odd_positions_prefer_base_sixty_four() {
        assert_eq!(distant_ancestor(1), 0);
        assert_eq!(distant_ancestor(63), 62);
    }
}
