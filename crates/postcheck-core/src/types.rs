//! Strong type definitions for postcheck.
//!
//! Identifiers are newtypes so a postcode can never be passed where an
//! address identifier is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::record::{NO_DATA_SENTINEL, TRANSIENT_SENTINEL};

/// A postcode, as stored in the directory and returned by the oracle.
///
/// Postcodes are opaque strings. Construction trims surrounding whitespace
/// and rejects values that could not round-trip through a delimited table,
/// as well as the two sentinel spellings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Postcode(String);

impl Postcode {
    /// Create a postcode, validating its shape.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty()
            || trimmed == TRANSIENT_SENTINEL
            || trimmed == NO_DATA_SENTINEL
            || trimmed.contains(|c: char| c == ';' || c == '\n' || c == '\r')
        {
            return Err(CoreError::InvalidPostcode(raw.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the postcode as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Postcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Postcode({})", self.0)
    }
}

impl fmt::Display for Postcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Postcode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Postcode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Postcode> for String {
    fn from(value: Postcode) -> Self {
        value.0
    }
}

impl AsRef<str> for Postcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of an address in the internal directory (a GUID in
/// practice, but nothing here depends on that).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressId(String);

impl AddressId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidAddressId(raw.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form used in log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressId({})", self.short())
    }
}

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AddressId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AddressId> for String {
    fn from(value: AddressId) -> Self {
        value.0
    }
}

/// One address of the internal directory, together with the postcode the
/// directory assigns to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: AddressId,
    pub address: String,
    pub target_postcode: Postcode,
}

impl AddressRecord {
    pub fn new(id: AddressId, address: impl Into<String>, target_postcode: Postcode) -> Self {
        Self {
            id,
            address: address.into(),
            target_postcode,
        }
    }
}
