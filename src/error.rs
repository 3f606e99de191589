//! Error types for the scores-dl library.

use thiserror::Error;

/// Errors that can occur while building trees and fetching remote content.
#[derive(Error, Debug)]
pub enum Error {
    /// A node's name could not be determined from its metadata.
    #[error("metadata does not name the entry")]
    InvalidMetadata,

    /// A reparent operation would attach a node below itself.
    #[error("reparenting would create a cycle")]
    Cycle,

    /// No host interface is registered for a URL's host.
    #[error("no host interface registered for {host}")]
    NoHostInterface {
        /// Hostname (or raw URL, when it could not be parsed) that missed.
        host: String,
    },

    /// Metadata retrieval failed for a single remote entry.
    #[error("metadata retrieval failed for {id}: {reason}")]
    Metadata {
        /// Remote identifier of the entry.
        id: String,
        /// Host-reported failure reason.
        reason: String,
    },

    /// A credential could not be established or refreshed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// A specialized `Result` type for scores-dl operations.
pub type Result<T> = std::result::Result<T, Error>;
