//! Correlation identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Longest client-supplied id accepted.
pub const MAX_ID_LEN: usize = 128;

/// Token linking a submitted task to its completion record.
///
/// Gateway-minted ids are UUID v4 text. Client-supplied ids (WebSocket wait mode only)
/// are accepted when they are 1..=128 characters of `[A-Za-z0-9._:-]`, which keeps
/// them safe to use as store keys and URL path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

/// Rejected client-supplied id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidId {
    #[error("correlation id is empty")]
    Empty,

    #[error("correlation id exceeds {MAX_ID_LEN} characters")]
    TooLong,

    #[error("correlation id contains invalid character {0:?}")]
    BadChar(char),
}

impl CorrelationId {
    /// Mint a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate an id received from a client.
    pub fn parse(raw: &str) -> Result<Self, InvalidId> {
        if raw.is_empty() {
            return Err(InvalidId::Empty);
        }
        if raw.len() > MAX_ID_LEN {
            return Err(InvalidId::TooLong);
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')))
        {
            return Err(InvalidId::BadChar(c));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
