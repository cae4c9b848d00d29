use thiserror::Error;

use telechat_session::SessionError;

use crate::storage::StorageError;

/// Errors originating from `telechat-core`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("not connected")]
    NotConnected,

    #[error("gave up after {attempts} connection attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: SessionError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
