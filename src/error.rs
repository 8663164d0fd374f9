//! Error types shared across the resolver, adapters and cache.
//!
//! Remote errors are contained inside adapters and reshaped before they
//! reach the resolver: the resolver's control flow only ever distinguishes
//! "got a (possibly empty) candidate list" from "this node cannot progress".
//! Constraint violations are never thrown; they live inside `ResolverState`
//! and are only surfaced as diagnostics on the final `Outcome`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid range syntax: {0}")]
    RangeSyntax(String),

    #[error("transport error talking to {collaborator}: {message}")]
    Transport {
        collaborator: String,
        message: String,
    },

    #[error("could not decode payload from {collaborator}: {message}")]
    Decode {
        collaborator: String,
        message: String,
    },

    #[error("authentication failed against {collaborator}")]
    Auth { collaborator: String },

    #[error("package not found: {0}")]
    PackageNotFound(String),

    #[error("invalid threshold encoding: {0}")]
    InvalidThreshold(String),

    #[error("resolution was cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
