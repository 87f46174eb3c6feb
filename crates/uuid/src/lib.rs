//! Request identifiers for list fetches.
//!
//! Every fetch the list core dispatches carries a [`RequestId`]. Fetch completions can arrive in
//! any order, so the store needs a way to tell which completion belongs to the most recently
//! issued request for a list. A `RequestId` pairs a strictly increasing sequence number (the
//! ordering key) with a random UUID (so identifiers from different sessions never collide) and
//! the time the request was issued.
//!
//! ## Text form
//! `r<sequence>-<canonical_uuid>`, for example `r12-550e8400e29b41d4a716446655440000`.
//! The UUID part uses the canonical form: 32 lowercase hex characters, no hyphens.

mod service;

pub use service::{RequestId, RequestIdGenerator, Uuid};

/// Error type for request identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for request identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
