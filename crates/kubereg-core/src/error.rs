//! Bookkeeper errors

use thiserror::Error;

/// Failure of a single work item.
///
/// All variants except [`BookkeeperError::CommandQueueClosed`] abandon the
/// offending event only; the work loop moves on to the next one.
#[derive(Debug, Error)]
pub enum BookkeeperError {
    #[error("node {0} is already tracked")]
    DuplicateNode(String),
    #[error("node {0} is not tracked")]
    UnknownNode(String),
    #[error("node {0} reports no addresses")]
    NoAddress(String),
    #[error("authoritative node listing failed: {0}")]
    Listing(#[from] anyhow::Error),
    #[error("registry command queue closed")]
    CommandQueueClosed,
}

impl BookkeeperError {
    /// Whether the work loop can keep running after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BookkeeperError::CommandQueueClosed)
    }
}

pub type Result<T, E = BookkeeperError> = std::result::Result<T, E>;
