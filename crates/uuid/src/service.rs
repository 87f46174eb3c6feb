//! Internal implementation of request identifiers.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Identifier attached to a single dispatched fetch.
///
/// Ordering and equality consider the sequence number and UUID only. The issue time is logged
/// when a newer request supersedes this one and is not part of the text form.
#[derive(Clone, Debug)]
pub struct RequestId {
    sequence: u64,
    uuid: Uuid,
    issued_at: DateTime<Utc>,
}

impl RequestId {
    /// Returns the monotonic sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Returns true if `self` was issued after `other` by the same generator.
    pub fn supersedes(&self, other: &RequestId) -> bool {
        self.sequence > other.sequence
    }

    /// Returns true if `input` is a canonical UUID (32 lowercase hex characters).
    fn is_canonical_uuid(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl PartialEq for RequestId {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence && self.uuid == other.uuid
    }
}

impl Eq for RequestId {}

impl std::hash::Hash for RequestId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sequence.hash(state);
        self.uuid.hash(state);
    }
}

impl PartialOrd for RequestId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RequestId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.uuid.cmp(&other.uuid))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}-{}", self.sequence, self.uuid.simple())
    }
}

impl FromStr for RequestId {
    type Err = UuidError;

    /// Parses the `r<sequence>-<uuid>` text form.
    ///
    /// The issue time is not carried in the text form; parsed identifiers take the current time.
    fn from_str(s: &str) -> UuidResult<Self> {
        let rest = s.strip_prefix('r').ok_or_else(|| {
            UuidError::InvalidInput(format!("Request id must start with 'r': '{}'", s))
        })?;
        let (seq_str, uuid_str) = rest.split_once('-').ok_or_else(|| {
            UuidError::InvalidInput(format!("Invalid request id format: '{}'", s))
        })?;

        let sequence = seq_str.parse::<u64>().map_err(|e| {
            UuidError::InvalidInput(format!("Invalid request sequence '{}': {}", seq_str, e))
        })?;

        if !Self::is_canonical_uuid(uuid_str) {
            return Err(UuidError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                uuid_str
            )));
        }
        let uuid = Uuid::parse_str(uuid_str)
            .map_err(|e| UuidError::InvalidInput(format!("Invalid UUID '{}': {}", uuid_str, e)))?;

        Ok(Self {
            sequence,
            uuid,
            issued_at: Utc::now(),
        })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RequestId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Issues strictly increasing [`RequestId`]s.
///
/// One generator is owned by each list session. Sequence numbers start at 1.
#[derive(Debug, Clone, Default)]
pub struct RequestIdGenerator {
    last_sequence: u64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next identifier.
    pub fn next_id(&mut self) -> RequestId {
        self.last_sequence = self.last_sequence.saturating_add(1);
        RequestId {
            sequence: self.last_sequence,
            uuid: Uuid::new_v4(),
            issued_at: Utc::now(),
        }
    }

    /// Sequence number of the most recently issued identifier, or 0 if none was issued.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}
