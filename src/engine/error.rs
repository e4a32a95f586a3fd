use thiserror::Error;
use ulid::Ulid;

use crate::crypto::CryptoError;
use crate::model::BlockedWindow;
use crate::pictures::PictureError;

use super::availability::SweepError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(Ulid),
    #[error("already exists: {0}")]
    AlreadyExists(Ulid),
    /// One or more fields failed validation; the message lists all of them.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The requested slot overlaps a blocked window.
    #[error(
        "slot unavailable: blocked on {} from {} to {}",
        .0.date,
        .0.start_time.format("%H:%M"),
        .0.end_time.format("%H:%M")
    )]
    Unavailable(BlockedWindow),
    #[error("cannot delete category {0}: has items")]
    HasItems(Ulid),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("encryption error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("availability sweep failed: {0}")]
    Sweep(#[from] SweepError),
    #[error(transparent)]
    Picture(#[from] PictureError),
    #[error("WAL error: {0}")]
    WalError(String),
}
