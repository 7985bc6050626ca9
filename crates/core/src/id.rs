//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Pseudo-id for ledger entries that concern the whole herd (e.g. daily milk totals).
pub const HERD_ID: &str = "HERD";

/// Herd-level pseudo-id written by earlier versions of the ledger.
pub const LEGACY_HERD_ID: &str = "LOTE_GENERAL";

/// Identifier of an animal (the registry's primary key).
///
/// Ids are operator-assigned codes (ear tag numbers, farm codes), so they are free text:
/// surrounding whitespace is dropped and blank ids are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnimalId(String);

impl AnimalId {
    /// Parse an id, trimming surrounding whitespace.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("AnimalId: id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The herd-level pseudo-id.
    pub fn herd() -> Self {
        Self(HERD_ID.to_string())
    }

    /// True for the herd-level pseudo-id (current or legacy spelling).
    pub fn is_herd(&self) -> bool {
        self.0 == HERD_ID || self.0 == LEGACY_HERD_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a raw cell value the way the id column is scanned.
    pub fn matches_cell(&self, cell: &str) -> bool {
        cell.trim() == self.0
    }
}

impl core::fmt::Display for AnimalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AnimalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AnimalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AnimalId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AnimalId> for String {
    fn from(value: AnimalId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_trims_whitespace() {
        let id = AnimalId::parse("  A1 ").unwrap();
        assert_eq!(id.as_str(), "A1");
        assert!(id.matches_cell(" A1"));
    }

    #[test]
    fn parse_rejects_blank() {
        assert!(matches!(AnimalId::parse("   "), Err(DomainError::InvalidId(_))));
        assert!(matches!("".parse::<AnimalId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn herd_pseudo_id_recognizes_legacy_spelling() {
        assert!(AnimalId::herd().is_herd());
        assert!(AnimalId::parse("LOTE_GENERAL").unwrap().is_herd());
        assert!(!AnimalId::parse("A1").unwrap().is_herd());
    }

    #[test]
    fn serde_rejects_blank_ids() {
        let ok: AnimalId = serde_json::from_str("\"B7\"").unwrap();
        assert_eq!(ok.as_str(), "B7");
        assert!(serde_json::from_str::<AnimalId>("\"  \"").is_err());
    }

    proptest! {
        #[test]
        fn parse_is_idempotent(raw in "[A-Za-z0-9-]{1,16}") {
            let once = AnimalId::parse(&raw).unwrap();
            let twice = AnimalId::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
