//! Validated session identity.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted session id length in characters.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Error raised for rejected session identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionIdError {
    /// The identifier was empty or whitespace-only.
    #[error("session id must not be empty")]
    Empty,
    /// The identifier exceeds [`MAX_SESSION_ID_LEN`] characters.
    #[error("session id exceeds {MAX_SESSION_ID_LEN} characters")]
    TooLong,
    /// The identifier contains a character outside `[A-Za-z0-9_-]`.
    #[error("session id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Opaque identity of one memory partition.
///
/// A session id is non-empty, at most [`MAX_SESSION_ID_LEN`] characters, and
/// restricted to `[A-Za-z0-9_-]`. Construction goes through [`SessionId::parse`]
/// so an invalid id can never reach the registry or a server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a raw session identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionIdError`] when the id is empty, too long, or
    /// contains a character outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, SessionIdError> {
        if raw.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if raw.chars().count() > MAX_SESSION_ID_LEN {
            return Err(SessionIdError::TooLong);
        }
        for ch in raw.chars() {
            if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
                return Err(SessionIdError::InvalidChar(ch));
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// Raw string form of this id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}
