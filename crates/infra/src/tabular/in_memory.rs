use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use super::{RowAddress, SheetData, StoreError, TabularStore};

/// Store operations, used to target injected failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreOp {
    GetRows,
    AppendRow,
    UpdateRow,
    UpdateCell,
    DeleteRow,
    GetOrCreateSheet,
}

#[derive(Debug, Clone)]
struct Fault {
    op: StoreOp,
    sheet: String,
    /// Matching calls still allowed through before this fault fires.
    skip: usize,
}

#[derive(Debug, Clone)]
struct Sheet {
    name: String,
    /// Row 1 (the header, if written) is `values[0]`.
    values: Vec<Vec<String>>,
}

/// In-memory tabular store.
///
/// Intended for tests/dev. Sheets keep creation order, rows keep append order, and a
/// deleted row shifts the rows below it up, like the remote backend does.
///
/// Failures can be injected per operation and sheet with [`InMemoryStore::fail_next`] and
/// [`InMemoryStore::fail_after`]; each injected failure fires once, as a
/// `StoreError::Connection`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sheets: RwLock<Vec<Sheet>>,
    faults: Mutex<Vec<Fault>>,
    round_trips: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sheet with a header and data rows.
    pub fn with_sheet(self, name: &str, header: &[&str], rows: Vec<Vec<String>>) -> Self {
        if let Ok(mut sheets) = self.sheets.write() {
            let mut values = vec![header.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
            values.extend(rows);
            sheets.push(Sheet {
                name: name.to_string(),
                values,
            });
        }
        self
    }

    /// Make the next `op` on `sheet` fail.
    pub fn fail_next(&self, op: StoreOp, sheet: &str) {
        self.fail_after(op, sheet, 0);
    }

    /// Let `skip` calls of `op` on `sheet` succeed, then fail the one after.
    pub fn fail_after(&self, op: StoreOp, sheet: &str, skip: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(Fault {
                op,
                sheet: sheet.to_string(),
                skip,
            });
        }
    }

    /// Number of data rows (header excluded) in `sheet`.
    pub fn row_count(&self, sheet: &str) -> usize {
        self.sheets
            .read()
            .ok()
            .and_then(|sheets| {
                sheets
                    .iter()
                    .find(|s| s.name == sheet)
                    .map(|s| s.values.len().saturating_sub(1))
            })
            .unwrap_or(0)
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheets
            .read()
            .map(|sheets| sheets.iter().any(|s| s.name == sheet))
            .unwrap_or(false)
    }

    /// Calls served so far (each one stands for a remote round trip).
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    fn begin(&self, op: StoreOp, sheet: &str) -> Result<(), StoreError> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock().map_err(|_| poisoned())?;
        let Some(pos) = faults.iter().position(|f| f.op == op && f.sheet == sheet) else {
            return Ok(());
        };
        if faults[pos].skip > 0 {
            faults[pos].skip -= 1;
            return Ok(());
        }
        faults.remove(pos);
        Err(StoreError::Connection(format!(
            "injected failure: {op:?} on '{sheet}'"
        )))
    }

    fn with_sheet_mut<T>(
        &self,
        sheet: &str,
        f: impl FnOnce(&mut Vec<Vec<String>>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut sheets = self.sheets.write().map_err(|_| poisoned())?;
        let target = sheets
            .iter_mut()
            .find(|s| s.name == sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        f(&mut target.values)
    }
}

fn poisoned() -> StoreError {
    StoreError::Connection("in-memory store lock poisoned".to_string())
}

fn data_index(
    values: &[Vec<String>],
    sheet: &str,
    address: RowAddress,
) -> Result<usize, StoreError> {
    let idx = address.row() as usize;
    if idx < 2 || idx > values.len() {
        return Err(StoreError::RowOutOfRange {
            sheet: sheet.to_string(),
            address,
        });
    }
    Ok(idx - 1)
}

impl TabularStore for InMemoryStore {
    fn get_rows(&self, sheet: &str) -> Result<SheetData, StoreError> {
        self.begin(StoreOp::GetRows, sheet)?;
        let sheets = self.sheets.read().map_err(|_| poisoned())?;
        let found = sheets
            .iter()
            .find(|s| s.name == sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        Ok(SheetData::from_values(found.values.clone()))
    }

    fn append_row(&self, sheet: &str, values: &[String]) -> Result<(), StoreError> {
        self.begin(StoreOp::AppendRow, sheet)?;
        self.with_sheet_mut(sheet, |rows| {
            rows.push(values.to_vec());
            Ok(())
        })
    }

    fn update_row(
        &self,
        sheet: &str,
        address: RowAddress,
        values: &[String],
    ) -> Result<(), StoreError> {
        self.begin(StoreOp::UpdateRow, sheet)?;
        self.with_sheet_mut(sheet, |rows| {
            // The header row may be rewritten (provisioning a headerless sheet).
            if address == RowAddress::HEADER {
                if rows.is_empty() {
                    rows.push(Vec::new());
                }
                rows[0] = values.to_vec();
                return Ok(());
            }
            let idx = data_index(rows, sheet, address)?;
            rows[idx] = values.to_vec();
            Ok(())
        })
    }

    fn update_cell(
        &self,
        sheet: &str,
        address: RowAddress,
        column: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        self.begin(StoreOp::UpdateCell, sheet)?;
        self.with_sheet_mut(sheet, |rows| {
            let idx = data_index(rows, sheet, address)?;
            let row = &mut rows[idx];
            if row.len() <= column {
                row.resize(column + 1, String::new());
            }
            row[column] = value.to_string();
            Ok(())
        })
    }

    fn delete_row(&self, sheet: &str, address: RowAddress) -> Result<(), StoreError> {
        self.begin(StoreOp::DeleteRow, sheet)?;
        self.with_sheet_mut(sheet, |rows| {
            let idx = data_index(rows, sheet, address)?;
            rows.remove(idx);
            Ok(())
        })
    }

    fn get_or_create_sheet(&self, name: &str, header: &[&str]) -> Result<bool, StoreError> {
        self.begin(StoreOp::GetOrCreateSheet, name)?;
        let mut sheets = self.sheets.write().map_err(|_| poisoned())?;
        if sheets.iter().any(|s| s.name == name) {
            return Ok(false);
        }
        sheets.push(Sheet {
            name: name.to_string(),
            values: vec![header.iter().map(|h| h.to_string()).collect()],
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let store = InMemoryStore::new();
        assert!(store.get_or_create_sheet("Log", &["A", "B"]).unwrap());
        assert!(!store.get_or_create_sheet("Log", &["A", "B"]).unwrap());

        let data = store.get_rows("Log").unwrap();
        assert_eq!(data.header, vec!["A", "B"]);
        assert!(data.rows.is_empty());
    }

    #[test]
    fn append_update_delete() {
        let store = InMemoryStore::new().with_sheet("S", &["K", "V"], vec![]);
        store.append_row("S", &row(&["a", "1"])).unwrap();
        store.append_row("S", &row(&["b", "2"])).unwrap();
        store.append_row("S", &row(&["c", "3"])).unwrap();

        store.update_row("S", RowAddress::new(3), &row(&["b", "20"])).unwrap();
        store.update_cell("S", RowAddress::new(2), 1, "10").unwrap();
        store.delete_row("S", RowAddress::new(2)).unwrap();

        let data = store.get_rows("S").unwrap();
        let cells: Vec<_> = data.rows.iter().map(|r| r.cells.clone()).collect();
        assert_eq!(cells, vec![row(&["b", "20"]), row(&["c", "3"])]);
        assert_eq!(data.rows[0].address, RowAddress::new(2));
    }

    #[test]
    fn addresses_outside_the_sheet_are_rejected() {
        let store = InMemoryStore::new().with_sheet("S", &["K"], vec![row(&["a"])]);
        assert!(matches!(
            store.delete_row("S", RowAddress::new(3)),
            Err(StoreError::RowOutOfRange { .. })
        ));
        assert!(matches!(
            store.update_cell("S", RowAddress::HEADER, 0, "x"),
            Err(StoreError::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn missing_sheet_is_reported() {
        let store = InMemoryStore::new();
        assert!(matches!(store.get_rows("Nope"), Err(StoreError::SheetNotFound(_))));
        assert!(matches!(
            store.append_row("Nope", &row(&["x"])),
            Err(StoreError::SheetNotFound(_))
        ));
    }

    #[test]
    fn injected_failure_fires_once() {
        let store = InMemoryStore::new().with_sheet("S", &["K"], vec![]);
        store.fail_next(StoreOp::AppendRow, "S");

        assert!(store.append_row("S", &row(&["a"])).unwrap_err().is_connection());
        assert_eq!(store.row_count("S"), 0);

        store.append_row("S", &row(&["a"])).unwrap();
        assert_eq!(store.row_count("S"), 1);
        assert_eq!(store.round_trips(), 2);
    }

    #[test]
    fn delayed_failure_skips_matching_calls_first() {
        let store = InMemoryStore::new().with_sheet("S", &["K"], vec![]);
        store.fail_after(StoreOp::AppendRow, "S", 1);

        store.append_row("S", &row(&["a"])).unwrap();
        assert!(store.append_row("S", &row(&["b"])).is_err());
        store.append_row("S", &row(&["c"])).unwrap();
        assert_eq!(store.row_count("S"), 2);
    }
}
