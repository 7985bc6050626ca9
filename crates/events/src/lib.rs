//! Ledger events and command abstractions.
//!
//! The ledger is an append-only log of operational facts (sales, weigh-ins, treatments,
//! milk yield). This crate holds the typed records and the traits the command layer
//! builds on; it performs no IO.

pub mod command;
pub mod handler;
pub mod record;
pub mod sale;

pub use command::Command;
pub use handler::CommandHandler;
pub use record::{EventRecord, EventType, Treatment};
pub use sale::{Currency, PriceBasis, SaleOrder, SaleTerms};
