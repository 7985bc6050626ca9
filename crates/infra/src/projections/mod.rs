//! Derived views over one read of a sheet.
//!
//! Snapshots are disposable: they are rebuilt from the store after every write and are
//! never written back. Rows that do not decode under the sheet's layout are kept aside as
//! [`RejectedRow`]s instead of being coerced into records.

pub mod herd;
pub mod ledger;

use crate::tabular::RowAddress;

pub use herd::{HerdSnapshot, HerdSummary};
pub use ledger::{LedgerSnapshot, MilkTotal};

/// A decoded record together with the row it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    pub address: RowAddress,
    pub record: T,
}

/// A row that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub address: RowAddress,
    pub cells: Vec<String>,
    pub reason: String,
}
