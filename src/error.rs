use failure::Fail;
use std::io;

/// Error type for the state journal.
#[derive(Fail, Debug)]
pub enum JournalError {
    /// IO error
    #[fail(display = "IO error: {}", _0)]
    Io(#[cause] io::Error),
    /// Error returned by the sled storage engine
    #[fail(display = "sled error: {}", _0)]
    Sled(#[cause] sled::Error),
    /// A byte string or integer did not decode under the canonical encoding
    #[fail(display = "encoding error: {}", _0)]
    Encoding(String),
    /// A stored digest did not match the digest recomputed from bytes, or the
    /// length trailer of a journal entry was inconsistent with its framing
    #[fail(display = "corrupt journal entry: {}", _0)]
    Corrupt(String),
    /// `key.len() + value.len()` plus framing would not fit in the 16-bit
    /// entry length trailer
    #[fail(display = "journal entry too large: {} bytes", len)]
    EntryTooLarge {
        /// the length that was rejected
        len: usize,
    },
    /// the next entry's post-offset would not fit in 32 bits
    #[fail(display = "journal file full at offset {}", offset)]
    JournalFull {
        /// the offset that was rejected
        offset: u64,
    },
    /// `rollback` was asked for a target counter beyond the current one
    #[fail(
        display = "invalid rollback target {} (current update_counter is {})",
        target, current
    )]
    InvalidRollback {
        /// requested rollback target
        target: u64,
        /// current update_counter
        current: u64,
    },
    /// an update counter outside `[1, update_counter]` was requested from a reader
    #[fail(display = "update counter {} not found", _0)]
    NotFound(u64),
}

impl From<io::Error> for JournalError {
    fn from(err: io::Error) -> JournalError {
        JournalError::Io(err)
    }
}

impl From<sled::Error> for JournalError {
    fn from(err: sled::Error) -> JournalError {
        JournalError::Sled(err)
    }
}

/// `Result` type for the state journal, simplifying the return of `JournalError`.
pub type Result<T> = std::result::Result<T, JournalError>;
