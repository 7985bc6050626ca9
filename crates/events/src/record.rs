use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use herdbook_core::{AnimalId, DomainError, DomainResult};

use crate::sale::SaleTerms;

/// Recognized ledger event types.
///
/// The ledger stores the type label as text and does not enforce this set; `recognize`
/// maps a stored label back to a variant when it is one of the known spellings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Sale,
    Milk,
    Weighing,
    Health,
    Heat,
    Purchase,
    /// Compensating entry that neutralizes an earlier entry (see `EventRecord::void`).
    Void,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Sale,
        EventType::Milk,
        EventType::Weighing,
        EventType::Health,
        EventType::Heat,
        EventType::Purchase,
        EventType::Void,
    ];

    /// Canonical label written for new entries.
    pub fn label(self) -> &'static str {
        match self {
            EventType::Sale => "SALE",
            EventType::Milk => "MILK",
            EventType::Weighing => "WEIGHING",
            EventType::Health => "HEALTH",
            EventType::Heat => "HEAT",
            EventType::Purchase => "PURCHASE",
            EventType::Void => "VOID",
        }
    }

    /// Label used by ledgers written before the canonical labels existed.
    pub fn legacy_label(self) -> Option<&'static str> {
        match self {
            EventType::Sale => Some("VENTA"),
            EventType::Milk => Some("PRODUCCION_LECHE"),
            EventType::Weighing => Some("PESAJE"),
            EventType::Health => Some("SANIDAD"),
            EventType::Heat => Some("CELO"),
            EventType::Purchase => Some("COMPRA"),
            EventType::Void => None,
        }
    }

    /// Map a stored label to a known type (case-insensitive, canonical or legacy spelling).
    pub fn recognize(label: &str) -> Option<EventType> {
        let label = label.trim();
        Self::ALL.into_iter().find(|t| {
            t.label().eq_ignore_ascii_case(label)
                || t.legacy_label().is_some_and(|l| l.eq_ignore_ascii_case(label))
        })
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of health treatment recorded by `EventRecord::health`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Treatment {
    Vaccine,
    Vitamins,
    Antibiotic,
    Dewormer,
}

impl Treatment {
    pub fn label(self) -> &'static str {
        match self {
            Treatment::Vaccine => "Vaccine",
            Treatment::Vitamins => "Vitamins",
            Treatment::Antibiotic => "Antibiotic",
            Treatment::Dewormer => "Dewormer",
        }
    }
}

/// One ledger row.
///
/// `event_type` is kept exactly as written so that unrecognized labels survive a read
/// unchanged. `animal_id` may be the herd-level pseudo-id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub date: NaiveDate,
    pub event_type: String,
    pub animal_id: AnimalId,
    pub detail1: String,
    pub detail2: String,
    pub notes: String,
}

impl EventRecord {
    /// Free-form entry; the label is stored verbatim.
    pub fn new(date: NaiveDate, event_type: impl Into<String>, animal_id: AnimalId) -> Self {
        Self {
            date,
            event_type: event_type.into(),
            animal_id,
            detail1: String::new(),
            detail2: String::new(),
            notes: String::new(),
        }
    }

    pub fn with_details(mut self, detail1: impl Into<String>, detail2: impl Into<String>) -> Self {
        self.detail1 = detail1.into();
        self.detail2 = detail2.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Sale of one animal under the given terms.
    pub fn sale(date: NaiveDate, animal_id: AnimalId, terms: &SaleTerms) -> Self {
        Self::new(date, EventType::Sale.label(), animal_id)
            .with_details(terms.price_detail(), terms.buyer_detail())
            .with_notes(terms.notes_detail())
    }

    /// Daily milk total for the whole herd.
    pub fn milk(date: NaiveDate, litres: Decimal, cows_milked: u32) -> DomainResult<Self> {
        if litres.is_sign_negative() {
            return Err(DomainError::validation("litres cannot be negative"));
        }
        if cows_milked == 0 {
            return Err(DomainError::validation("at least one cow must be milked"));
        }
        Ok(Self::new(date, EventType::Milk.label(), AnimalId::herd())
            .with_details(litres.normalize().to_string(), cows_milked.to_string()))
    }

    /// Individual weigh-in.
    pub fn weighing(date: NaiveDate, animal_id: AnimalId, kg: Decimal) -> DomainResult<Self> {
        if kg.is_sign_negative() {
            return Err(DomainError::validation("weight cannot be negative"));
        }
        Ok(Self::new(date, EventType::Weighing.label(), animal_id)
            .with_details(kg.normalize().to_string(), "")
            .with_notes("Control"))
    }

    /// Health treatment (vaccine, vitamins, ...).
    pub fn health(
        date: NaiveDate,
        animal_id: AnimalId,
        treatment: Treatment,
        product: impl Into<String>,
        observations: impl Into<String>,
    ) -> Self {
        Self::new(date, EventType::Health.label(), animal_id)
            .with_details(treatment.label(), product)
            .with_notes(observations)
    }

    pub fn heat(date: NaiveDate, animal_id: AnimalId, notes: impl Into<String>) -> Self {
        Self::new(date, EventType::Heat.label(), animal_id).with_notes(notes)
    }

    pub fn purchase(
        date: NaiveDate,
        animal_id: AnimalId,
        price: impl Into<String>,
        seller: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self::new(date, EventType::Purchase.label(), animal_id)
            .with_details(price, seller)
            .with_notes(notes)
    }

    /// Compensating entry for `original`.
    ///
    /// detail1 carries the voided entry's type, detail2 its date; `voids` relies on both.
    pub fn void(date: NaiveDate, original: &EventRecord, reason: impl Into<String>) -> Self {
        Self::new(date, EventType::Void.label(), original.animal_id.clone())
            .with_details(original.event_type.clone(), original.date.to_string())
            .with_notes(reason)
    }

    /// Known type of this entry, if its label is recognized.
    pub fn kind(&self) -> Option<EventType> {
        EventType::recognize(&self.event_type)
    }

    pub fn is_kind(&self, kind: EventType) -> bool {
        self.kind() == Some(kind)
    }

    /// Case-insensitive substring match over the stored type label.
    pub fn type_contains(&self, needle: &str) -> bool {
        self.event_type
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// True when `self` is a VOID entry neutralizing `other`.
    pub fn voids(&self, other: &EventRecord) -> bool {
        self.is_kind(EventType::Void)
            && self.animal_id == other.animal_id
            && EventType::recognize(&self.detail1) == other.kind()
            && other.kind().is_some()
            && self.detail2.trim() == other.date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::{Currency, PriceBasis};
    use proptest::prelude::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn id(raw: &str) -> AnimalId {
        AnimalId::parse(raw).unwrap()
    }

    #[test]
    fn recognize_accepts_canonical_and_legacy_labels() {
        assert_eq!(EventType::recognize("sale"), Some(EventType::Sale));
        assert_eq!(EventType::recognize("VENTA"), Some(EventType::Sale));
        assert_eq!(EventType::recognize(" produccion_leche "), Some(EventType::Milk));
        assert_eq!(EventType::recognize("PESAJE"), Some(EventType::Weighing));
        assert_eq!(EventType::recognize("SHEARING"), None);
    }

    #[test]
    fn unknown_labels_are_kept_verbatim() {
        let e = EventRecord::new(day(), "Shearing-Spring", id("A1"));
        assert_eq!(e.event_type, "Shearing-Spring");
        assert_eq!(e.kind(), None);
    }

    #[test]
    fn type_contains_is_case_insensitive_substring() {
        let e = EventRecord::new(day(), "PRODUCCION_LECHE", AnimalId::herd());
        assert!(e.type_contains("leche"));
        assert!(e.type_contains("Produccion"));
        assert!(!e.type_contains("pesaje"));
    }

    #[test]
    fn milk_entry_targets_the_herd() {
        let e = EventRecord::milk(day(), Decimal::new(1525, 1), 12).unwrap();
        assert!(e.animal_id.is_herd());
        assert_eq!(e.detail1, "152.5");
        assert_eq!(e.detail2, "12");
        assert!(e.is_kind(EventType::Milk));
    }

    #[test]
    fn milk_entry_rejects_zero_cows() {
        let err = EventRecord::milk(day(), Decimal::ONE, 0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn weighing_rejects_negative_weight() {
        let err = EventRecord::weighing(day(), id("A1"), Decimal::new(-5, 0)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn sale_entry_formats_terms() {
        let terms = SaleTerms {
            price: Decimal::new(1200, 0),
            currency: Currency::Usd,
            basis: PriceBasis::PerHead,
            buyer: "Hacienda El Roble".into(),
            destination: "Valencia".into(),
            transport_guide: "G-77".into(),
            notes: "paid in cash".into(),
            ..SaleTerms::default()
        };
        let e = EventRecord::sale(day(), id("A1"), &terms);
        assert_eq!(e.event_type, "SALE");
        assert_eq!(e.detail1, "1200 USD (per head)");
        assert_eq!(e.detail2, "Buyer: Hacienda El Roble | Dest: Valencia");
        assert_eq!(e.notes, "Guide: G-77 | paid in cash");
    }

    #[test]
    fn void_matches_only_its_original() {
        let sale = EventRecord::sale(day(), id("A1"), &SaleTerms::default());
        let other_day = EventRecord::sale(day().succ_opt().unwrap(), id("A1"), &SaleTerms::default());
        let other_animal = EventRecord::sale(day(), id("A2"), &SaleTerms::default());

        let void = EventRecord::void(day(), &sale, "status write failed");
        assert!(void.voids(&sale));
        assert!(!void.voids(&other_day));
        assert!(!void.voids(&other_animal));
        assert!(!sale.voids(&sale));
    }

    #[test]
    fn void_matches_legacy_sale_label() {
        let legacy = EventRecord::new(day(), "VENTA", id("A1"));
        let void = EventRecord::void(day(), &legacy, "manual");
        assert!(void.voids(&legacy));
    }

    proptest! {
        #[test]
        fn type_search_ignores_case(label in "[A-Za-z_]{1,12}", start in 0usize..12, len in 1usize..6) {
            let e = EventRecord::new(day(), label.clone(), id("A1"));
            let start = start.min(label.len() - 1);
            let end = (start + len).min(label.len());
            let needle = &label[start..end];
            prop_assert!(e.type_contains(&needle.to_uppercase()));
            prop_assert!(e.type_contains(&needle.to_lowercase()));
        }
    }
}
