//! Sale reconciliation.
//!
//! Compares the ledger's (non-voided) sale entries with animal statuses. A sale whose
//! status write failed and could not be voided shows up as `sold_without_status`; in
//! `Repair` mode those animals are marked Sold.

use std::collections::HashSet;

use herdbook_core::AnimalId;

use crate::error::HerdResult;
use crate::ledger::EventLedger;
use crate::registry::AnimalRegistry;
use crate::tabular::TabularStore;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReconcileMode {
    ReportOnly,
    Repair,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Sale recorded in the ledger, animal not Sold.
    pub sold_without_status: Vec<AnimalId>,
    /// Animal Sold, no sale entry in the ledger.
    pub status_without_sale: Vec<AnimalId>,
    /// Sale entries for ids the registry does not know.
    pub unknown_ids: Vec<AnimalId>,
    /// Animals marked Sold by this pass (`Repair` only).
    pub repaired: Vec<AnimalId>,
    pub repair_failures: Vec<(AnimalId, String)>,
}

impl ReconciliationReport {
    /// True when the two sheets agree (status-without-sale is tolerated: animals sold
    /// before the ledger existed have no entry).
    pub fn is_consistent(&self) -> bool {
        self.sold_without_status
            .iter()
            .all(|id| self.repaired.contains(id))
            && self.unknown_ids.is_empty()
    }
}

pub fn reconcile<S>(
    registry: &AnimalRegistry<S>,
    ledger: &EventLedger<S>,
    mode: ReconcileMode,
) -> HerdResult<ReconciliationReport>
where
    S: TabularStore,
{
    let herd = registry.load()?;
    let book = ledger.load()?;
    let mut report = ReconciliationReport::default();

    let mut sold_in_ledger: HashSet<&AnimalId> = HashSet::new();
    for sale in book.sales() {
        if !sold_in_ledger.insert(&sale.animal_id) {
            continue;
        }
        match herd.get(&sale.animal_id) {
            None => report.unknown_ids.push(sale.animal_id.clone()),
            Some(entry) if !entry.record.status.is_sold() => {
                report.sold_without_status.push(sale.animal_id.clone())
            }
            Some(_) => {}
        }
    }

    for animal in herd.sold() {
        if !sold_in_ledger.contains(&animal.id) && !report.status_without_sale.contains(&animal.id) {
            report.status_without_sale.push(animal.id.clone());
        }
    }

    if mode == ReconcileMode::Repair {
        for id in &report.sold_without_status {
            match registry.transition_to_sold(id) {
                Ok(_) => report.repaired.push(id.clone()),
                Err(e) => {
                    tracing::warn!(animal_id = %id, error = %e, "could not repair sale status");
                    report.repair_failures.push((id.clone(), e.to_string()));
                }
            }
        }
    }

    tracing::info!(
        ?mode,
        sold_without_status = report.sold_without_status.len(),
        status_without_sale = report.status_without_sale.len(),
        unknown_ids = report.unknown_ids.len(),
        repaired = report.repaired.len(),
        "reconciliation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::ledger::DEFAULT_LEDGER_SHEET;
    use crate::registry::DEFAULT_ANIMALS_SHEET;
    use crate::tabular::InMemoryStore;
    use herdbook_events::{EventRecord, SaleTerms};
    use herdbook_livestock::{AnimalRecord, AnimalStatus, Sex};

    fn id(raw: &str) -> AnimalId {
        AnimalId::parse(raw).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 2).unwrap()
    }

    fn setup() -> (AnimalRegistry<Arc<InMemoryStore>>, EventLedger<Arc<InMemoryStore>>) {
        let store = Arc::new(InMemoryStore::new());
        let registry = AnimalRegistry::new(store.clone(), DEFAULT_ANIMALS_SHEET);
        registry.ensure_provisioned().unwrap();
        for raw in ["A1", "A2", "A3"] {
            registry.create(&AnimalRecord::new(id(raw), Sex::Female)).unwrap();
        }
        (registry, EventLedger::new(store, DEFAULT_LEDGER_SHEET))
    }

    fn sale(raw: &str) -> EventRecord {
        EventRecord::sale(day(), id(raw), &SaleTerms::default())
    }

    #[test]
    fn consistent_sheets_report_nothing() {
        let (registry, ledger) = setup();
        ledger.append(&sale("A1")).unwrap();
        registry.transition_to_sold(&id("A1")).unwrap();

        let report = reconcile(&registry, &ledger, ReconcileMode::ReportOnly).unwrap();
        assert_eq!(report, ReconciliationReport::default());
        assert!(report.is_consistent());
    }

    #[test]
    fn half_applied_sale_is_reported_and_repaired() {
        let (registry, ledger) = setup();
        ledger.append(&sale("A2")).unwrap();

        let report = reconcile(&registry, &ledger, ReconcileMode::ReportOnly).unwrap();
        assert_eq!(report.sold_without_status, vec![id("A2")]);
        assert!(!report.is_consistent());
        assert_eq!(registry.find_by_id(&id("A2")).unwrap().record.status, AnimalStatus::Healthy);

        let report = reconcile(&registry, &ledger, ReconcileMode::Repair).unwrap();
        assert_eq!(report.repaired, vec![id("A2")]);
        assert!(report.is_consistent());
        assert!(registry.find_by_id(&id("A2")).unwrap().record.status.is_sold());
    }

    #[test]
    fn voided_sales_are_not_repaired() {
        let (registry, ledger) = setup();
        let entry = sale("A3");
        ledger.append(&entry).unwrap();
        ledger
            .append(&EventRecord::void(day(), &entry, "status update failed"))
            .unwrap();

        let report = reconcile(&registry, &ledger, ReconcileMode::Repair).unwrap();
        assert!(report.sold_without_status.is_empty());
        assert!(report.repaired.is_empty());
        assert!(!registry.find_by_id(&id("A3")).unwrap().record.status.is_sold());
    }

    #[test]
    fn sold_without_entry_and_unknown_ids_are_listed() {
        let (registry, ledger) = setup();
        registry.transition_to_sold(&id("A1")).unwrap();
        ledger.append(&sale("GONE")).unwrap();

        let report = reconcile(&registry, &ledger, ReconcileMode::ReportOnly).unwrap();
        assert_eq!(report.status_without_sale, vec![id("A1")]);
        assert_eq!(report.unknown_ids, vec![id("GONE")]);
    }
}
