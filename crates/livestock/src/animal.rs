use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use herdbook_core::{AnimalId, DomainError, DomainResult};

use crate::photo::PhotoRef;

/// Health / lifecycle status of an animal.
///
/// `Sold` is terminal: once an animal is sold no operation moves it back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimalStatus {
    Healthy,
    Sick,
    Pregnant,
    Sold,
}

impl AnimalStatus {
    pub const ALL: [AnimalStatus; 4] = [
        AnimalStatus::Healthy,
        AnimalStatus::Sick,
        AnimalStatus::Pregnant,
        AnimalStatus::Sold,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AnimalStatus::Healthy => "Healthy",
            AnimalStatus::Sick => "Sick",
            AnimalStatus::Pregnant => "Pregnant",
            AnimalStatus::Sold => "Sold",
        }
    }

    fn legacy_label(self) -> &'static str {
        match self {
            AnimalStatus::Healthy => "Sano",
            AnimalStatus::Sick => "Enfermo",
            AnimalStatus::Pregnant => "Preñada",
            AnimalStatus::Sold => "VENDIDO",
        }
    }

    /// Parse a stored status cell (canonical or legacy label, case-insensitive).
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| {
                s.label().eq_ignore_ascii_case(raw)
                    || s.legacy_label().to_lowercase() == raw.to_lowercase()
            })
            .ok_or_else(|| DomainError::schema(format!("unknown status '{raw}'")))
    }

    pub fn is_sold(self) -> bool {
        self == AnimalStatus::Sold
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_become(self, next: AnimalStatus) -> bool {
        !self.is_sold() || next.is_sold()
    }
}

impl core::fmt::Display for AnimalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn label(self) -> &'static str {
        match self {
            Sex::Female => "Female",
            Sex::Male => "Male",
        }
    }

    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "female" | "hembra" => Ok(Sex::Female),
            "male" | "macho" => Ok(Sex::Male),
            other => Err(DomainError::schema(format!("unknown sex '{other}'"))),
        }
    }
}

/// Live weight in kilograms (never negative).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Weight(Decimal);

impl Weight {
    pub fn new(kg: Decimal) -> DomainResult<Self> {
        if kg.is_sign_negative() && !kg.is_zero() {
            return Err(DomainError::validation("weight cannot be negative"));
        }
        Ok(Self(kg))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn kg(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Weight {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Weight> for Decimal {
    fn from(value: Weight) -> Self {
        value.0
    }
}

/// One animal as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub id: AnimalId,
    pub category: String,
    pub name: String,
    pub tag: String,
    pub breed: String,
    pub sex: Sex,
    pub weight: Weight,
    pub birth_date: Option<NaiveDate>,
    pub status: AnimalStatus,
    pub photo_ref: PhotoRef,
}

impl AnimalRecord {
    /// A healthy animal with no photo and every optional field blank.
    pub fn new(id: AnimalId, sex: Sex) -> Self {
        Self {
            id,
            category: String::new(),
            name: String::new(),
            tag: String::new(),
            breed: String::new(),
            sex,
            weight: Weight::zero(),
            birth_date: None,
            status: AnimalStatus::Healthy,
            photo_ref: PhotoRef::NoPhoto,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_sold()
    }
}
