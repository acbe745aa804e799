//! A journal-based, cryptographically authenticated key-value store.
//!
//! The state journal (`StateJournal`/`JournalReader`) maintains a direct
//! key-value mapping alongside an append-only journal that hash-chains
//! every update into one rolling state digest, plus a fixed-width
//! positional index over that journal. It supports replaying past
//! updates, validating the full digest chain, rolling back recent
//! history, and generating Simplified State Verification proofs.
//!
//! The notary (`Notary`) is a related but standalone proof-of-existence
//! log: a hash chain with skip-list ancestry giving O(log n) inclusion
//! proofs, sharing the "hash-chain + skip pointer" shape of the state
//! journal's digest chain in its purest form.
//!
//! ```rust
//! # use statejournal::{JournalReader, Result, StateJournal};
//! # fn try_main() -> Result<()> {
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! let mut journal = StateJournal::open(dir.path())?;
//! journal.update(b"k1", b"v1")?;
//! journal.commit()?;
//! assert_eq!(journal.get_raw(b"k1")?, (b"v1".to_vec(), 1));
//!
//! let reader = JournalReader::open(dir.path())?;
//! assert_eq!(reader.validate_state(1)?, journal.state_digest());
//! # Ok(())
//! # }
//! ```
#![deny(missing_docs)]

pub use config::{HashAlgorithm, JournalConfig};
pub use error::{JournalError, Result};
pub use hash::Digest32;
pub use kv::{KvBackend, SledBackend};
pub use notary::{evaluate_proof, Notary};
pub use reader::{evaluate_ssv, JournalReader, SsvProof, Update};
pub use state_journal::StateJournal;

mod config;
mod encoding;
mod error;
mod hash;
mod io_util;
mod journal;
mod kv;
mod notary;
mod reader;
mod state_journal;
