//! Tabular store boundary.
//!
//! The system of record is a spreadsheet-like backend: named sheets whose first row is a
//! header and whose remaining rows are records. This module defines the adapter contract
//! the registry and ledger are written against, plus two implementations:
//!
//! - [`SheetsStore`]: Google Sheets v4 over blocking HTTP
//! - [`InMemoryStore`]: same contract in memory, for tests and dry runs

pub mod auth;
pub mod in_memory;
pub mod sheets;

use std::sync::Arc;

use thiserror::Error;

pub use auth::ServiceAccountKey;
pub use in_memory::{InMemoryStore, StoreOp};
pub use sheets::SheetsStore;

/// Transient 1-based position of a row in a sheet (row 1 is the header).
///
/// Addresses are only valid until the next structural change to the sheet (a delete
/// shifts every row below it). They are used for in-place writes, never as identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowAddress(u32);

impl RowAddress {
    /// The header row.
    pub const HEADER: RowAddress = RowAddress(1);

    pub fn new(row: u32) -> Self {
        Self(row)
    }

    /// Address of the `index`-th data row (0-based, header excluded).
    pub fn of_data_index(index: usize) -> Self {
        Self(index as u32 + 2)
    }

    pub fn row(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for RowAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// One data row as read from a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub address: RowAddress,
    pub cells: Vec<String>,
}

impl Row {
    /// Cell at a 0-based column; missing trailing cells read as empty.
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Full contents of a sheet: trimmed header plus data rows in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl SheetData {
    /// Build from raw values where the first row is the header.
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut iter = values.into_iter();
        let header = iter
            .next()
            .map(|h| h.into_iter().map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = iter
            .enumerate()
            .map(|(idx, cells)| Row {
                address: RowAddress::of_data_index(idx),
                cells,
            })
            .collect();
        Self { header, rows }
    }

    /// Position of a header-derived field name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name.trim())
    }

    /// Value of a named field in `row`.
    pub fn field<'a>(&self, row: &'a Row, name: &str) -> Option<&'a str> {
        self.column_index(name).map(|idx| row.cell(idx))
    }
}

/// Tabular store operation error.
///
/// These are **infrastructure errors** (reachability, credentials, addressing) as opposed
/// to domain errors (validation, missing records).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or credentials rejected.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Credentials or settings are missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sheet '{0}' does not exist")]
    SheetNotFound(String),

    #[error("{address} is outside sheet '{sheet}'")]
    RowOutOfRange { sheet: String, address: RowAddress },

    /// The backend answered with a non-success status.
    #[error("{operation} rejected by backend ({status}): {message}")]
    Remote {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The backend answered with something that could not be understood.
    #[error("unexpected backend response: {0}")]
    Protocol(String),
}

impl StoreError {
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Adapter over the remote tabular backend.
///
/// Every call is synchronous and maps to one remote round trip (plus authentication
/// where the implementation needs it). There is no local durability and no retry:
/// callers treat each call as something that can fail on its own.
///
/// ## Write semantics
///
/// - `append_row`: adds one row after the last row
/// - `update_row`: overwrites the full row span in one call (no field-level merge)
/// - `update_cell`: overwrites a single cell
/// - `delete_row`: removes the row and shifts the rows below it up; irreversible
/// - `get_or_create_sheet`: creates the sheet and writes its header exactly once
///
/// None of these are coordinated with concurrent readers or writers: two sessions writing
/// the same row resolve by last-write-wins.
pub trait TabularStore: Send + Sync {
    /// Read the header and every data row of `sheet`, in store order.
    fn get_rows(&self, sheet: &str) -> Result<SheetData, StoreError>;

    fn append_row(&self, sheet: &str, values: &[String]) -> Result<(), StoreError>;

    fn update_row(
        &self,
        sheet: &str,
        address: RowAddress,
        values: &[String],
    ) -> Result<(), StoreError>;

    /// Overwrite the cell at a 0-based `column` of `address`.
    fn update_cell(
        &self,
        sheet: &str,
        address: RowAddress,
        column: usize,
        value: &str,
    ) -> Result<(), StoreError>;

    fn delete_row(&self, sheet: &str, address: RowAddress) -> Result<(), StoreError>;

    /// Returns `true` if the sheet was created by this call.
    fn get_or_create_sheet(&self, name: &str, header: &[&str]) -> Result<bool, StoreError>;
}

impl<S> TabularStore for Arc<S>
where
    S: TabularStore + ?Sized,
{
    fn get_rows(&self, sheet: &str) -> Result<SheetData, StoreError> {
        (**self).get_rows(sheet)
    }

    fn append_row(&self, sheet: &str, values: &[String]) -> Result<(), StoreError> {
        (**self).append_row(sheet, values)
    }

    fn update_row(
        &self,
        sheet: &str,
        address: RowAddress,
        values: &[String],
    ) -> Result<(), StoreError> {
        (**self).update_row(sheet, address, values)
    }

    fn update_cell(
        &self,
        sheet: &str,
        address: RowAddress,
        column: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        (**self).update_cell(sheet, address, column, value)
    }

    fn delete_row(&self, sheet: &str, address: RowAddress) -> Result<(), StoreError> {
        (**self).delete_row(sheet, address)
    }

    fn get_or_create_sheet(&self, name: &str, header: &[&str]) -> Result<bool, StoreError> {
        (**self).get_or_create_sheet(name, header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_is_trimmed_and_rows_are_addressed_from_two() {
        let data = SheetData::from_values(values(&[
            &[" ID ", "Name "],
            &["A1", "Luna"],
            &["A2"],
        ]));
        assert_eq!(data.header, vec!["ID", "Name"]);
        assert_eq!(data.rows[0].address, RowAddress::new(2));
        assert_eq!(data.rows[1].address, RowAddress::new(3));
        assert_eq!(data.field(&data.rows[0], "Name"), Some("Luna"));
        assert_eq!(data.field(&data.rows[1], "Name"), Some(""));
        assert_eq!(data.field(&data.rows[1], "Weight"), None);
    }

    #[test]
    fn empty_values_give_empty_sheet() {
        let data = SheetData::from_values(vec![]);
        assert!(data.header.is_empty());
        assert!(data.rows.is_empty());
    }
}
