//! Identity Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Identity-related errors
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}
