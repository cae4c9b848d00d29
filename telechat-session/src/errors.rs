use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session I/O error: {0}")]
    IO(#[from] io::Error),

    #[error("failed to resolve host {0}")]
    HostResolution(String),

    #[error("session is closed")]
    Closed,
}
