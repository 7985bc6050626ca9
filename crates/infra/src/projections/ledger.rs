use core::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use herdbook_core::{AnimalId, DomainResult};
use herdbook_events::{EventRecord, EventType};
use herdbook_livestock::LEDGER;
use herdbook_livestock::schema::{decode_event, is_blank};

use super::{Located, RejectedRow};
use crate::tabular::SheetData;

/// One day of herd milk yield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilkTotal {
    pub date: NaiveDate,
    pub litres: Decimal,
    pub cows: u32,
}

/// The ledger as read at one point in time, in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    entries: Vec<Located<EventRecord>>,
    rejected: Vec<RejectedRow>,
}

impl LedgerSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a full read of the ledger sheet (same rules as the herd snapshot).
    pub fn from_sheet(sheet: &SheetData) -> DomainResult<Self> {
        LEDGER.check_header(&sheet.header)?;
        let mut entries = Vec::with_capacity(sheet.rows.len());
        let mut rejected = Vec::new();

        for row in &sheet.rows {
            if is_blank(&row.cells) {
                continue;
            }
            match decode_event(&row.cells) {
                Ok(record) => entries.push(Located {
                    address: row.address,
                    record,
                }),
                Err(e) => {
                    tracing::warn!(address = %row.address, error = %e, "rejected ledger row");
                    rejected.push(RejectedRow {
                        address: row.address,
                        cells: row.cells.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(Self { entries, rejected })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &EventRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// Entries whose type label contains `needle`, case-insensitively, in append order.
    pub fn query_by_type(&self, needle: &str) -> Vec<&EventRecord> {
        self.all().filter(|e| e.type_contains(needle)).collect()
    }

    pub fn for_animal(&self, id: &AnimalId) -> Vec<&EventRecord> {
        self.all().filter(|e| &e.animal_id == id).collect()
    }

    /// Sale entries that no VOID entry neutralizes.
    ///
    /// Each VOID entry cancels at most one sale, so a repeated sale on the same day needs
    /// one VOID per copy.
    pub fn sales(&self) -> Vec<&EventRecord> {
        let voids: Vec<&EventRecord> = self.all().filter(|e| e.is_kind(EventType::Void)).collect();
        let mut used = vec![false; voids.len()];

        self.all()
            .filter(|e| e.is_kind(EventType::Sale))
            .filter(|sale| {
                let hit = voids
                    .iter()
                    .enumerate()
                    .find(|(idx, void)| !used[*idx] && void.voids(sale))
                    .map(|(idx, _)| idx);
                match hit {
                    Some(idx) => {
                        used[idx] = true;
                        false
                    }
                    None => true,
                }
            })
            .collect()
    }

    /// Herd milk totals by date (oldest first). Entries whose litres or cow count do not
    /// parse are skipped with a warning.
    pub fn milk_history(&self) -> Vec<MilkTotal> {
        let mut history: Vec<MilkTotal> = self
            .entries
            .iter()
            .filter(|e| e.record.is_kind(EventType::Milk))
            .filter_map(|e| {
                let litres = Decimal::from_str(e.record.detail1.trim());
                let cows = e.record.detail2.trim().parse::<u32>();
                match (litres, cows) {
                    (Ok(litres), Ok(cows)) => Some(MilkTotal {
                        date: e.record.date,
                        litres,
                        cows,
                    }),
                    _ => {
                        tracing::warn!(
                            address = %e.address,
                            litres = %e.record.detail1,
                            cows = %e.record.detail2,
                            "milk entry skipped: figures do not parse"
                        );
                        None
                    }
                }
            })
            .collect();
        history.sort_by_key(|m| m.date);
        history
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }
}
