//! Verification outcomes and the records persisted for them.
//!
//! Every lookup ends in exactly one [`Outcome`]: a value, a transient
//! failure, or a definitive "no data". The two failure kinds are written to
//! the cache tables using fixed sentinel spellings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{AddressId, AddressRecord, Postcode};

/// Sentinel written for a transient failure. Never survives a save.
pub const TRANSIENT_SENTINEL: &str = "error";

/// Sentinel written when the service answered but had nothing to return.
pub const NO_DATA_SENTINEL: &str = "n/a";

/// Result of one external lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome<T> {
    /// The service returned a value.
    Found(T),
    /// Transport failure or unparsable response. Retried next session.
    TransientError,
    /// A valid response with no match. Terminal.
    NoData,
}

/// Outcome of resolving an address to a postcode.
pub type Observation = Outcome<Postcode>;

impl<T> Outcome<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            Outcome::Found(value) => Some(value),
            Outcome::TransientError | Outcome::NoData => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Outcome::TransientError)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Found(value) => Outcome::Found(f(value)),
            Outcome::TransientError => Outcome::TransientError,
            Outcome::NoData => Outcome::NoData,
        }
    }
}

impl<T: FromStr> Outcome<T> {
    /// Parse a table cell, recognising the sentinel spellings first.
    pub fn parse(cell: &str) -> Result<Self, T::Err> {
        match cell.trim() {
            TRANSIENT_SENTINEL => Ok(Outcome::TransientError),
            NO_DATA_SENTINEL => Ok(Outcome::NoData),
            other => other.parse().map(Outcome::Found),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Found(value) => value.fmt(f),
            Outcome::TransientError => f.write_str(TRANSIENT_SENTINEL),
            Outcome::NoData => f.write_str(NO_DATA_SENTINEL),
        }
    }
}

impl Observation {
    /// True if the observed postcode is `target`.
    pub fn confirms(&self, target: &Postcode) -> bool {
        self.found() == Some(target)
    }
}

/// One attempted address of the primary verification loop.
///
/// Created once per oracle call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub id: AddressId,
    pub target_postcode: Postcode,
    pub address: String,
    pub observed: Observation,
}

impl VerificationRecord {
    /// Record the outcome of looking up `record`.
    pub fn attempt(record: &AddressRecord, observed: Observation) -> Self {
        Self {
            id: record.id.clone(),
            target_postcode: record.target_postcode.clone(),
            address: record.address.clone(),
            observed,
        }
    }

    /// True if this attempt returned the postcode it was verifying.
    pub fn is_match(&self) -> bool {
        self.observed.confirms(&self.target_postcode)
    }
}

/// Final verdict of a reverse verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HopelessStatus {
    Confirmed,
    Declined,
}

impl HopelessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HopelessStatus::Confirmed => "confirmed",
            HopelessStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for HopelessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HopelessStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "confirmed" => Ok(HopelessStatus::Confirmed),
            "declined" => Ok(HopelessStatus::Declined),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// One postcode checked by the postcode -> address -> postcode round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopelessRecord {
    pub target: Postcode,
    /// Representative address from the secondary directory.
    pub address: Outcome<String>,
    /// Postcode the oracle returned for that address.
    pub response: Observation,
    pub status: HopelessStatus,
}

impl HopelessRecord {
    /// Build a record, deriving the status from the round trip.
    pub fn round_trip(target: Postcode, address: Outcome<String>, response: Observation) -> Self {
        let status = if response.confirms(&target) {
            HopelessStatus::Confirmed
        } else {
            HopelessStatus::Declined
        };
        Self {
            target,
            address,
            response,
            status,
        }
    }

    /// True if either leg of the round trip failed transiently.
    pub fn is_transient(&self) -> bool {
        self.address.is_transient() || self.response.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(s: &str) -> Postcode {
        Postcode::new(s).unwrap()
    }

    #[test]
    fn test_outcome_sentinel_roundtrip() {
        let cells = ["101000", "error", "n/a"];
        for cell in cells {
            let parsed = Observation::parse(cell).unwrap();
            assert_eq!(parsed.to_string(), cell);
        }
        assert_eq!(Observation::parse("error").unwrap(), Outcome::TransientError);
        assert_eq!(Observation::parse(" n/a ").unwrap(), Outcome::NoData);
    }

    #[test]
    fn test_outcome_rejects_bad_postcode() {
        assert!(Observation::parse("").is_err());
    }

    #[test]
    fn test_verification_record_match() {
        let address = AddressRecord::new(AddressId::new("a1").unwrap(), "Moscow, 1", pc("101000"));

        let hit = VerificationRecord::attempt(&address, Outcome::Found(pc("101000")));
        assert!(hit.is_match());

        let miss = VerificationRecord::attempt(&address, Outcome::Found(pc("101001")));
        assert!(!miss.is_match());

        let none = VerificationRecord::attempt(&address, Outcome::NoData);
        assert!(!none.is_match());
    }

    #[test]
    fn test_hopeless_round_trip_status() {
        let confirmed = HopelessRecord::round_trip(
            pc("630000"),
            Outcome::Found("Novosibirsk, Lenina 5".into()),
            Outcome::Found(pc("630000")),
        );
        assert_eq!(confirmed.status, HopelessStatus::Confirmed);
        assert!(!confirmed.is_transient());

        let missing = HopelessRecord::round_trip(pc("630001"), Outcome::NoData, Outcome::NoData);
        assert_eq!(missing.status, HopelessStatus::Declined);
        assert!(!missing.is_transient());

        let flaky = HopelessRecord::round_trip(
            pc("630002"),
            Outcome::Found("Novosibirsk".into()),
            Outcome::TransientError,
        );
        assert_eq!(flaky.status, HopelessStatus::Declined);
        assert!(flaky.is_transient());
    }

    #[test]
    fn test_hopeless_status_parse() {
        assert_eq!("confirmed".parse::<HopelessStatus>().unwrap(), HopelessStatus::Confirmed);
        assert_eq!("declined".parse::<HopelessStatus>().unwrap(), HopelessStatus::Declined);
        assert!("maybe".parse::<HopelessStatus>().is_err());
    }
}
