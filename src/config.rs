use serde::{Deserialize, Serialize};

/// Which digest a [`crate::StateJournal`] folds into its rolling state digest.
///
/// The choice is fixed at file-creation time: nothing in the on-disk format
/// records which algorithm produced it, so callers must not mix hash
/// algorithms within one journal directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA3-256, the default.
    Sha3_256,
    /// SHA-256.
    Sha256,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha3_256
    }
}

/// Configuration for a [`crate::StateJournal`].
///
/// Round-trips through `serde_json` so it can be written alongside a journal
/// directory and read back on the next open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// digest used for the rolling state digest
    #[serde(default)]
    pub hash: HashAlgorithm,
    /// flush the sled tree on every `commit` rather than relying on its
    /// background flush thread
    #[serde(default = "default_fsync")]
    pub fsync_on_commit: bool,
}

fn default_fsync() -> bool {
    true
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            hash: HashAlgorithm::default(),
            fsync_on_commit: default_fsync(),
        }
    }
}
