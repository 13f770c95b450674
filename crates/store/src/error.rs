//! Error types produced by the store crate.
//!
//! | Error | Raised by | Read path | Write path |
//! |-------|-----------|-----------|------------|
//! | [`CorruptPayload`](StoreError::CorruptPayload) | codec | absence | n/a |
//! | [`Transport`](StoreError::Transport) | table clients | absence | propagated |
//! | [`MissingClientId`](StoreError::MissingClientId) | `put_profile` | n/a | propagated |
//! | [`Backend`](StoreError::Backend) | backend construction | propagated | propagated |
//! | [`Unsupported`](StoreError::Unsupported) | table administration | n/a | propagated |
//!
//! A missing row or item is not an error at all; backends report it as
//! [`Lookup::NotFound`](crate::Lookup::NotFound).

use thiserror::Error;

/// Errors surfaced by codecs, backends, and table clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("corrupt profile payload: {0}")]
    CorruptPayload(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("profile record has no string `client_id` field")]
    MissingClientId,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl StoreError {
    pub fn corrupt<E: std::fmt::Display>(err: E) -> Self {
        Self::CorruptPayload(err.to_string())
    }

    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// True for failures caused by the stored bytes rather than the transport.
    pub fn is_corrupt_payload(&self) -> bool {
        matches!(self, Self::CorruptPayload(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
