//! Append-only event ledger over a secondary sheet.
//!
//! There is no update or delete here: corrections are new entries (see
//! `EventRecord::void`).

use herdbook_events::EventRecord;
use herdbook_livestock::LEDGER;
use herdbook_livestock::schema::encode_event;

use crate::error::HerdResult;
use crate::projections::LedgerSnapshot;
use crate::tabular::{StoreError, TabularStore};

pub const DEFAULT_LEDGER_SHEET: &str = "Historial";

#[derive(Debug, Clone)]
pub struct EventLedger<S> {
    store: S,
    sheet: String,
}

impl<S> EventLedger<S>
where
    S: TabularStore,
{
    pub fn new(store: S, sheet: impl Into<String>) -> Self {
        Self {
            store,
            sheet: sheet.into(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create the ledger sheet and its header on first use; a no-op afterwards.
    pub fn ensure_provisioned(&self) -> HerdResult<bool> {
        let created = self.store.get_or_create_sheet(&self.sheet, LEDGER.columns)?;
        if created {
            tracing::info!(sheet = %self.sheet, "provisioned ledger sheet");
        }
        Ok(created)
    }

    /// Append one entry after the last row.
    ///
    /// The type label is not checked against the recognized set. A ledger sheet that does
    /// not exist yet is provisioned and the append retried once; an existing sheet costs a
    /// single round trip.
    pub fn append(&self, event: &EventRecord) -> HerdResult<()> {
        let row = encode_event(event);
        match self.store.append_row(&self.sheet, &row) {
            Ok(()) => {}
            Err(StoreError::SheetNotFound(_)) => {
                self.ensure_provisioned()?;
                self.store.append_row(&self.sheet, &row)?;
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(
            sheet = %self.sheet,
            event_type = %event.event_type,
            animal_id = %event.animal_id,
            date = %event.date,
            "ledger entry appended"
        );
        Ok(())
    }

    /// The whole ledger. A ledger sheet that was never provisioned reads as empty.
    pub fn load(&self) -> HerdResult<LedgerSnapshot> {
        match self.store.get_rows(&self.sheet) {
            Ok(data) => Ok(LedgerSnapshot::from_sheet(&data)?),
            Err(StoreError::SheetNotFound(_)) => {
                tracing::debug!(sheet = %self.sheet, "ledger sheet absent, reading as empty");
                Ok(LedgerSnapshot::empty())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Entries whose type contains `needle` (case-insensitive), in append order.
    pub fn query_by_type(&self, needle: &str) -> HerdResult<Vec<EventRecord>> {
        let snapshot = self.load()?;
        let matches: Vec<EventRecord> = snapshot.query_by_type(needle).into_iter().cloned().collect();
        tracing::debug!(sheet = %self.sheet, needle, matches = matches.len(), "ledger query");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::tabular::{InMemoryStore, StoreOp};
    use herdbook_core::AnimalId;

    fn ledger() -> EventLedger<Arc<InMemoryStore>> {
        EventLedger::new(Arc::new(InMemoryStore::new()), DEFAULT_LEDGER_SHEET)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn id(raw: &str) -> AnimalId {
        AnimalId::parse(raw).unwrap()
    }

    prop_compose! {
        fn event_strategy()(
            d in 1u32..=28,
            label in prop_oneof![
                Just("SALE".to_string()),
                Just("WEIGHING".to_string()),
                Just("HEALTH".to_string()),
                "[A-Z_]{3,10}",
            ],
            raw_id in "[A-Z][0-9]{1,3}",
            detail in "[a-z0-9 ]{0,10}",
        ) -> EventRecord {
            EventRecord::new(day(d), label, id(&raw_id)).with_details(detail.trim(), "").with_notes("")
        }
    }

    proptest! {
        #[test]
        fn append_preserves_submission_order(events in prop::collection::vec(event_strategy(), 0..20)) {
            let ledger = ledger();
            for event in &events {
                ledger.append(event).unwrap();
            }
            let stored: Vec<EventRecord> = ledger.load().unwrap().all().cloned().collect();
            prop_assert_eq!(stored, events);
        }
    }

    #[test]
    fn first_append_provisions_the_sheet_once() {
        let ledger = ledger();
        assert!(!ledger.store().has_sheet(DEFAULT_LEDGER_SHEET));

        ledger.append(&EventRecord::heat(day(1), id("A1"), "")).unwrap();
        ledger.append(&EventRecord::heat(day(2), id("A1"), "")).unwrap();

        let data = ledger.store().get_rows(DEFAULT_LEDGER_SHEET).unwrap();
        assert_eq!(data.header, LEDGER.columns);
        assert_eq!(data.rows.len(), 2);
        assert!(!ledger.ensure_provisioned().unwrap());
    }

    #[test]
    fn append_to_a_provisioned_sheet_is_one_round_trip() {
        let ledger = ledger();
        ledger.ensure_provisioned().unwrap();

        let before = ledger.store().round_trips();
        ledger.append(&EventRecord::heat(day(1), id("A1"), "")).unwrap();
        ledger.append(&EventRecord::heat(day(2), id("A1"), "")).unwrap();
        assert_eq!(ledger.store().round_trips() - before, 2);
    }

    #[test]
    fn missing_sheet_reads_as_empty_ledger() {
        let ledger = ledger();
        assert!(ledger.load().unwrap().is_empty());
        assert!(ledger.query_by_type("sale").unwrap().is_empty());
    }

    #[test]
    fn interleaved_types_keep_append_order() {
        let ledger = ledger();
        let milk = EventRecord::milk(day(1), Decimal::new(110, 0), 9).unwrap();
        let weigh = EventRecord::weighing(day(1), id("A1"), Decimal::new(312, 0)).unwrap();
        let milk_again = EventRecord::milk(day(2), Decimal::new(98, 0), 9).unwrap();
        for e in [&milk, &weigh, &milk_again] {
            ledger.append(e).unwrap();
        }

        assert_eq!(ledger.query_by_type("milk").unwrap(), vec![milk, milk_again]);
        assert_eq!(ledger.query_by_type("WEIGH").unwrap(), vec![weigh]);
    }

    #[test]
    fn legacy_labels_match_by_substring() {
        let ledger = ledger();
        ledger
            .append(&EventRecord::new(day(3), "PRODUCCION_LECHE", AnimalId::herd()).with_details("75", "8"))
            .unwrap();
        ledger
            .append(&EventRecord::new(day(3), "PESAJE", id("A1")).with_details("300", ""))
            .unwrap();

        let leche = ledger.query_by_type("leche").unwrap();
        assert_eq!(leche.len(), 1);
        assert_eq!(leche[0].event_type, "PRODUCCION_LECHE");
        assert!(leche.iter().all(|e| !e.type_contains("pesaje")));
    }

    #[test]
    fn unrecognized_types_are_stored_verbatim() {
        let ledger = ledger();
        ledger
            .append(&EventRecord::new(day(4), "Hoof trimming", id("B2")))
            .unwrap();
        let stored = ledger.query_by_type("hoof").unwrap();
        assert_eq!(stored[0].event_type, "Hoof trimming");
    }

    #[test]
    fn failed_append_writes_nothing() {
        let ledger = ledger();
        ledger.ensure_provisioned().unwrap();
        ledger.store().fail_next(StoreOp::AppendRow, DEFAULT_LEDGER_SHEET);

        let err = ledger.append(&EventRecord::heat(day(5), id("A1"), "")).unwrap_err();
        assert!(err.is_connection());
        assert!(ledger.load().unwrap().is_empty());
    }
}
