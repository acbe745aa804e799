//! The journal writer (spec §4.2): the two append-only files
//! (`state_journal`, `state_journal.idx`) and their open/recovery,
//! append, flush and truncate operations.
//!
//! Grounded on `statejournal.py::StateJournal`'s file layout and on the
//! teacher's `new_log_file`/generation-scan recovery pattern in
//! `engines/kvs.rs`, adapted from "one writer file per generation" (always
//! freshly created, so `tell()` right after open is trustworthy) to "one
//! writer file for the life of the directory" (which may already hold
//! bytes on reopen, so the position is restored with an explicit seek to
//! EOF instead of relying on `SeekFrom::Current(0)` immediately after
//! opening in append mode).

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{JournalError, Result};
use crate::hash::Digest32;
use crate::io_util::CountingWriter;

const JOURNAL_FILE: &str = "state_journal";
const INDEX_FILE: &str = "state_journal.idx";
const INDEX_SLOT_SIZE: u64 = 4;
const LENGTH_TRAILER_SIZE: u64 = 2;
const DIGEST_SIZE: u64 = 32;

pub(crate) fn journal_path(dir: &Path) -> PathBuf {
    dir.join(JOURNAL_FILE)
}

pub(crate) fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

fn open_for_append(path: &Path) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    // An append-mode fd does not necessarily report EOF from
    // `SeekFrom::Current(0)` right after opening if the file already held
    // bytes, so the position is fixed up explicitly.
    file.seek(SeekFrom::End(0))?;
    Ok(file)
}

/// Read the 32-byte digest stored at the start of the journal entry whose
/// post-entry offset is `end_offset`.
fn read_entry_digest(journal: &mut File, end_offset: u64) -> Result<Digest32> {
    journal.seek(SeekFrom::Start(end_offset - LENGTH_TRAILER_SIZE))?;
    let mut len_buf = [0u8; 2];
    journal.read_exact(&mut len_buf)?;
    let entry_len = u16::from_be_bytes(len_buf) as u64;
    journal.seek(SeekFrom::Start(end_offset - entry_len))?;
    let mut digest = [0u8; 32];
    journal.read_exact(&mut digest)?;
    Ok(digest)
}

fn read_index_slot(index: &mut File, slot: u64) -> Result<u64> {
    index.seek(SeekFrom::Start(slot * INDEX_SLOT_SIZE))?;
    let mut buf = [0u8; 4];
    index.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf) as u64)
}

/// The recovered in-memory state of a journal directory: how many complete,
/// index-backed entries exist, and the journal byte offset just past the
/// last one of them.
struct Recovered {
    update_counter: u64,
    journal_end: u64,
}

/// Find the largest prefix of the index file whose claimed offsets are
/// actually backed by journal bytes, truncating both files down to that
/// prefix. This is the recovery rule from spec §4.2: the journal is always
/// flushed before the index, so a crash can only ever leave the index
/// short of the journal's last complete entries (or, after a partial index
/// write, with a ragged final slot) -- never claim an offset the journal
/// doesn't actually contain.
fn recover(dir: &Path) -> Result<Recovered> {
    let jpath = journal_path(dir);
    let ipath = index_path(dir);

    let journal_len = fs::metadata(&jpath).map(|m| m.len()).unwrap_or(0);
    let index_len = fs::metadata(&ipath).map(|m| m.len()).unwrap_or(0);

    let mut n_slots = index_len / INDEX_SLOT_SIZE;
    if index_len % INDEX_SLOT_SIZE != 0 {
        warn!("state_journal.idx has a ragged trailing slot, dropping it");
    }

    let mut journal = OpenOptions::new()
        .read(true)
        .write(true)
        .open_or_create(&jpath)?;
    let mut index = OpenOptions::new()
        .read(true)
        .write(true)
        .open_or_create(&ipath)?;

    let mut journal_end = 0u64;
    while n_slots > 0 {
        let offset = read_index_slot(&mut index, n_slots - 1)?;
        if offset <= journal_len {
            journal_end = offset;
            break;
        }
        warn!(
            "state_journal.idx slot {} claims offset {} beyond journal length {}, truncating",
            n_slots - 1,
            offset,
            journal_len
        );
        n_slots -= 1;
    }

    if journal_end != journal_len {
        info!(
            "truncating state_journal from {} to {} bytes to drop an unindexed tail",
            journal_len, journal_end
        );
        journal.set_len(journal_end)?;
    }
    let index_target = n_slots * INDEX_SLOT_SIZE;
    if index_target != index_len {
        index.set_len(index_target)?;
    }

    Ok(Recovered {
        update_counter: n_slots,
        journal_end,
    })
}

/// `File::open`, creating the file first if it is absent (`OpenOptions`
/// alone refuses to open a missing file unless `.create(true).write(true)`,
/// which would also truncate an existing one).
trait OpenOrCreate {
    fn open_or_create(&self, path: &Path) -> Result<File>;
}

impl OpenOrCreate for OpenOptions {
    fn open_or_create(&self, path: &Path) -> Result<File> {
        if !path.exists() {
            File::create(path)?;
        }
        Ok(self.open(path)?)
    }
}

/// Owns the two journal files and knows how to append, flush, and truncate
/// them.
pub(crate) struct JournalWriter {
    dir: PathBuf,
    journal: CountingWriter<File>,
    index: CountingWriter<File>,
}

impl JournalWriter {
    /// Open (creating if absent) the journal directory, recovering
    /// `update_counter` and the journal-end offset.
    ///
    /// Returns the writer together with the recovered `update_counter` and
    /// the digest stored in the last surviving entry (or `empty_digest` if
    /// there are no entries).
    pub fn open(dir: &Path, empty_digest: Digest32) -> Result<(Self, u64, Digest32)> {
        fs::create_dir_all(dir)?;
        let recovered = recover(dir)?;

        let state_digest = if recovered.update_counter == 0 {
            empty_digest
        } else {
            let mut journal_file = File::open(journal_path(dir))?;
            read_entry_digest(&mut journal_file, recovered.journal_end)?
        };

        let journal = CountingWriter::new(open_for_append(&journal_path(dir))?)?;
        let index = CountingWriter::new(open_for_append(&index_path(dir))?)?;

        Ok((
            JournalWriter {
                dir: dir.to_path_buf(),
                journal,
                index,
            },
            recovered.update_counter,
            state_digest,
        ))
    }

    /// Append one journal entry (`digest || log || length`) plus its index
    /// slot. Returns the new post-entry offset (the value written to the
    /// index).
    pub fn append(&mut self, state_digest: &Digest32, log: &[u8]) -> Result<u64> {
        let entry_len = DIGEST_SIZE + log.len() as u64 + LENGTH_TRAILER_SIZE;
        if entry_len >= 1 << 16 {
            return Err(JournalError::EntryTooLarge {
                len: log.len() + DIGEST_SIZE as usize,
            });
        }

        self.journal.write_all(state_digest)?;
        self.journal.write_all(log)?;
        self.journal.write_all(&(entry_len as u16).to_be_bytes())?;

        let post_offset = self.journal.pos();
        if post_offset >= 1 << 32 {
            return Err(JournalError::JournalFull {
                offset: post_offset,
            });
        }
        self.index.write_all(&(post_offset as u32).to_be_bytes())?;
        Ok(post_offset)
    }

    /// Flush both files -- journal before index, so a crash between the two
    /// leaves the index short of the journal, which `recover` resolves by
    /// truncation.
    pub fn flush(&mut self) -> Result<()> {
        self.journal.flush()?;
        self.index.flush()?;
        Ok(())
    }

    /// Truncate the journal to `journal_offset` bytes and the index to
    /// `update_counter * 4` bytes, then reopen both writers at the new end.
    /// Used by `rollback`.
    pub fn truncate(&mut self, update_counter: u64, journal_offset: u64) -> Result<()> {
        {
            let file = OpenOptions::new().write(true).open(journal_path(&self.dir))?;
            file.set_len(journal_offset)?;
        }
        {
            let file = OpenOptions::new().write(true).open(index_path(&self.dir))?;
            file.set_len(update_counter * INDEX_SLOT_SIZE)?;
        }
        self.journal = CountingWriter::new(open_for_append(&journal_path(&self.dir))?)?;
        self.index = CountingWriter::new(open_for_append(&index_path(&self.dir))?)?;
        Ok(())
    }
}
