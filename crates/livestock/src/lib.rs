//! Livestock domain module.
//!
//! Animal records, their status lifecycle, and the versioned row layouts of the two
//! sheets (animals and ledger). Pure domain logic: no IO, no HTTP, no storage.

pub mod animal;
pub mod photo;
pub mod schema;

pub use animal::{AnimalRecord, AnimalStatus, Sex, Weight};
pub use photo::PhotoRef;
pub use schema::{HeaderVersion, SheetLayout, ANIMALS, LEDGER, SCHEMA_VERSION};
