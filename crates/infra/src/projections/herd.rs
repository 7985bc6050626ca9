use std::collections::{BTreeMap, HashMap, HashSet};

use herdbook_core::{AnimalId, DomainResult};
use herdbook_livestock::schema::{decode_animal, is_blank};
use herdbook_livestock::{ANIMALS, AnimalRecord, HeaderVersion, Sex};

use super::{Located, RejectedRow};
use crate::tabular::{RowAddress, SheetData};

/// Head counts over the active (not sold) animals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HerdSummary {
    pub active: usize,
    pub females: usize,
    pub males: usize,
    pub by_category: BTreeMap<String, usize>,
}

/// The animals sheet as read at one point in time, in store order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HerdSnapshot {
    header: HeaderVersion,
    entries: Vec<Located<AnimalRecord>>,
    rejected: Vec<RejectedRow>,
}

impl HerdSnapshot {
    /// Decode a full read of the animals sheet.
    ///
    /// An unknown header fails the whole snapshot; an undecodable row is only rejected.
    /// Blank rows are skipped.
    pub fn from_sheet(sheet: &SheetData) -> DomainResult<Self> {
        let header = ANIMALS.check_header(&sheet.header)?;
        let mut entries = Vec::with_capacity(sheet.rows.len());
        let mut rejected = Vec::new();

        for row in &sheet.rows {
            if is_blank(&row.cells) {
                continue;
            }
            match decode_animal(&row.cells) {
                Ok(record) => entries.push(Located {
                    address: row.address,
                    record,
                }),
                Err(e) => {
                    tracing::warn!(address = %row.address, error = %e, "rejected animal row");
                    rejected.push(RejectedRow {
                        address: row.address,
                        cells: row.cells.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            header,
            entries,
            rejected,
        })
    }

    pub fn header_version(&self) -> HeaderVersion {
        self.header
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &AnimalRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn located(&self) -> &[Located<AnimalRecord>] {
        &self.entries
    }

    /// Animals that are not sold.
    pub fn active(&self) -> impl Iterator<Item = &AnimalRecord> {
        self.all().filter(|r| r.is_active())
    }

    pub fn sold(&self) -> impl Iterator<Item = &AnimalRecord> {
        self.all().filter(|r| r.status.is_sold())
    }

    pub fn ids(&self) -> Vec<&AnimalId> {
        self.all().map(|r| &r.id).collect()
    }

    /// Ids offered for selection in sales and events.
    pub fn active_ids(&self) -> Vec<&AnimalId> {
        self.active().map(|r| &r.id).collect()
    }

    /// First record with `id`, in store order.
    pub fn get(&self, id: &AnimalId) -> Option<&Located<AnimalRecord>> {
        self.entries.iter().find(|e| &e.record.id == id)
    }

    pub fn contains(&self, id: &AnimalId) -> bool {
        self.get(id).is_some()
    }

    /// Id → row index; for duplicated ids the first row wins.
    pub fn index(&self) -> HashMap<AnimalId, RowAddress> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            index
                .entry(entry.record.id.clone())
                .or_insert(entry.address);
        }
        index
    }

    /// Ids carried by more than one row, in order of first appearance.
    pub fn duplicate_ids(&self) -> Vec<AnimalId> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for id in self.all().map(|r| &r.id) {
            if !seen.insert(id) && !duplicates.contains(id) {
                duplicates.push(id.clone());
            }
        }
        duplicates
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn summary(&self) -> HerdSummary {
        let mut summary = HerdSummary::default();
        for record in self.active() {
            summary.active += 1;
            match record.sex {
                Sex::Female => summary.females += 1,
                Sex::Male => summary.males += 1,
            }
            let category = if record.category.trim().is_empty() {
                "Uncategorized".to_string()
            } else {
                record.category.trim().to_string()
            };
            *summary.by_category.entry(category).or_insert(0) += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdbook_core::DomainError;
    use herdbook_livestock::AnimalStatus;
    use herdbook_livestock::schema::encode_animal;

    fn animal(id: &str, sex: Sex, category: &str, status: AnimalStatus) -> Vec<String> {
        let mut rec = AnimalRecord::new(AnimalId::parse(id).unwrap(), sex);
        rec.category = category.to_string();
        rec.status = status;
        encode_animal(&rec)
    }

    fn sheet(rows: Vec<Vec<String>>) -> SheetData {
        let mut values: Vec<Vec<String>> = vec![ANIMALS.columns.iter().map(|c| c.to_string()).collect()];
        values.extend(rows);
        SheetData::from_values(values)
    }

    fn id(raw: &str) -> AnimalId {
        AnimalId::parse(raw).unwrap()
    }

    #[test]
    fn active_and_sold_partition_the_herd() {
        let snap = HerdSnapshot::from_sheet(&sheet(vec![
            animal("A1", Sex::Female, "Cow", AnimalStatus::Healthy),
            animal("A2", Sex::Male, "Bull", AnimalStatus::Sold),
            animal("A3", Sex::Female, "Cow", AnimalStatus::Pregnant),
        ]))
        .unwrap();

        assert_eq!(snap.active_ids(), vec![&id("A1"), &id("A3")]);
        assert_eq!(snap.sold().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["A2"]);
        assert_eq!(snap.ids().len(), 3);
    }

    #[test]
    fn duplicates_resolve_to_first_row() {
        let mut second = AnimalRecord::new(id("A1"), Sex::Male);
        second.name = "Impostor".into();
        let snap = HerdSnapshot::from_sheet(&sheet(vec![
            animal("A1", Sex::Female, "Cow", AnimalStatus::Healthy),
            animal("B1", Sex::Female, "Cow", AnimalStatus::Healthy),
            encode_animal(&second),
        ]))
        .unwrap();

        let first = snap.get(&id("A1")).unwrap();
        assert_eq!(first.address, RowAddress::new(2));
        assert_eq!(first.record.sex, Sex::Female);
        assert_eq!(snap.index()[&id("A1")], RowAddress::new(2));
        assert_eq!(snap.duplicate_ids(), vec![id("A1")]);
    }

    #[test]
    fn undecodable_rows_are_rejected_and_blank_rows_skipped() {
        let mut bad = animal("A2", Sex::Male, "Bull", AnimalStatus::Healthy);
        bad[6] = "heavy".into();
        let snap = HerdSnapshot::from_sheet(&sheet(vec![
            animal("A1", Sex::Female, "Cow", AnimalStatus::Healthy),
            vec![String::new(), " ".into()],
            bad,
        ]))
        .unwrap();

        assert_eq!(snap.len(), 1);
        assert_eq!(snap.rejected().len(), 1);
        assert_eq!(snap.rejected()[0].address, RowAddress::new(4));
    }

    #[test]
    fn unknown_header_fails_the_snapshot() {
        let data = SheetData::from_values(vec![vec!["Code".into(), "Name".into()]]);
        assert!(matches!(HerdSnapshot::from_sheet(&data), Err(DomainError::Schema(_))));
    }

    #[test]
    fn summary_counts_active_animals_only() {
        let snap = HerdSnapshot::from_sheet(&sheet(vec![
            animal("A1", Sex::Female, "Cow", AnimalStatus::Healthy),
            animal("A2", Sex::Male, "Bull", AnimalStatus::Sick),
            animal("A3", Sex::Female, "Cow", AnimalStatus::Pregnant),
            animal("A4", Sex::Female, "Heifer", AnimalStatus::Sold),
            animal("A5", Sex::Female, "", AnimalStatus::Healthy),
        ]))
        .unwrap();

        let summary = snap.summary();
        assert_eq!(summary.active, 4);
        assert_eq!(summary.females, 3);
        assert_eq!(summary.males, 1);
        assert_eq!(summary.by_category.get("Cow"), Some(&2));
        assert_eq!(summary.by_category.get("Heifer"), None);
        assert_eq!(summary.by_category.get("Uncategorized"), Some(&1));
    }
}
