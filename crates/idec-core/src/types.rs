//! Strong type definitions for IDEC identifiers.
//!
//! Identifiers that end up in file names and URL paths are validated once, at
//! construction, so the rest of the node can use them without re-checking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Length of a msgid in characters.
pub const MSGID_LEN: usize = 20;

/// Maximum length of an echoarea name in bytes.
pub const MAX_ECHOAREA_LEN: usize = 120;

/// A 20-character message identifier derived from the canonical record.
///
/// The alphabet is ASCII letters and digits only: the two URL-safe base64
/// symbols are substituted away when the id is derived (see
/// [`crate::crypto::msgid_for`]), which keeps ids safe as file names and path
/// segments.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MsgId(String);

impl MsgId {
    /// Parse and validate a msgid.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() == MSGID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidMsgId(s.to_string()))
        }
    }

    /// Build from a string already known to be a valid msgid.
    pub(crate) fn from_valid(s: String) -> Self {
        debug_assert!(s.len() == MSGID_LEN);
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MsgId({})", self.0)
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MsgId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for MsgId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MsgId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<MsgId> for String {
    fn from(id: MsgId) -> Self {
        id.0
    }
}

/// An authenticated point as seen by the node that admits its messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointIdentity {
    /// Display name of the point (its registered username).
    pub name: String,
    /// Node-assigned point address.
    pub address: String,
}

impl PointIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Check that an echoarea name is safe to use as a file name and path segment.
pub fn validate_echoarea(name: &str) -> Result<()> {
    let bad_char = |c: char| {
        matches!(c, '/' | '\\' | ':' | '?' | '#' | '%') || c.is_whitespace() || c.is_control()
    };
    if name.is_empty()
        || name.len() > MAX_ECHOAREA_LEN
        || name == "."
        || name == ".."
        || name.chars().any(bad_char)
    {
        return Err(CoreError::InvalidEchoarea(name.to_string()));
    }
    Ok(())
}

/// Check that a point username can be stored in every backend.
///
/// `:` separates fields in the flat-file points list, so it is rejected along
/// with whitespace and control characters.
pub fn validate_username(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c == ':' || c.is_whitespace() || c.is_control()) {
        return Err(CoreError::InvalidUsername(name.to_string()));
    }
    Ok(())
}
