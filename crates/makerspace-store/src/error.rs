//! Store errors

use makerspace_types::{EquipmentId, UserId};
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Snapshot file could not be read
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        /// Snapshot path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot is not valid JSON or fails validation
    #[error("invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two policies share an equipment ID
    #[error("duplicate policy for equipment {0}")]
    DuplicatePolicy(EquipmentId),

    /// Two wallets share an owner
    #[error("duplicate wallet for user {0}")]
    DuplicateWallet(UserId),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
