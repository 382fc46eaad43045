//! Error types for bindery operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while generating a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("source document not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("no chapters produced from the source document")]
    EmptyBook,
}

pub type Result<T> = std::result::Result<T, Error>;
