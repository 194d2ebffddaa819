//! Centralized error types for mailextract.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailextract library.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The connection could not be established or the server rejected the login.
    #[error("Could not sign in to '{host}' as '{username}': {reason}")]
    Authentication {
        host: String,
        username: String,
        reason: String,
    },

    /// The server refused to select the folder.
    #[error("Could not open IMAP folder '{folder}': {reason}")]
    FolderNotFound {
        folder: String,
        reason: String,
        /// Folder names the server offered, gathered on the same session.
        available: Vec<String>,
    },

    /// A SEARCH command did not complete with an OK status.
    #[error("Error searching with '{query}': {reason}")]
    Search { query: String, reason: String },

    /// A FETCH command failed or returned no message body.
    #[error("Error fetching message {id}: {reason}")]
    Fetch { id: u32, reason: String },

    /// Any other IMAP failure (LIST, CLOSE, LOGOUT).
    #[error("IMAP error: {0}")]
    Imap(String),

    /// The message has no usable `Message-Id` header to name its directory.
    #[error("Message has no usable Message-Id header")]
    MissingMessageId,

    /// The MIME parser could not make sense of the message.
    #[error("Could not parse message: {0}")]
    UnparseableMessage(String),

    /// A MIME part whose content type has no handler.
    #[error("Unrecognized content type: {0}")]
    UnrecognizedContentType(String),

    /// Serializing a header mapping failed.
    #[error("Could not serialize headers: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
