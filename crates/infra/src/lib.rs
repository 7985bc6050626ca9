//! Infrastructure layer: tabular store adapters, registry, ledger, photo host, config.

pub mod command_dispatcher;
pub mod config;
pub mod error;
pub mod ledger;
pub mod photo;
pub mod projections;
pub mod reconciliation;
pub mod registry;
pub mod tabular;


pub use command_dispatcher::{
    CommandDispatcher, DispatchError, Executed, Feedback, FeedbackLevel, HerdCommand, Outcome,
    SaleLine, SaleLineStatus, SaleReport,
};
pub use config::{ConfigError, SecretBundle, Settings};
pub use error::{HerdError, HerdResult};
pub use ledger::EventLedger;
pub use photo::{ImgbbHost, PhotoHost, PhotoResolver, PhotoUpload, TransportError};
pub use projections::{HerdSnapshot, HerdSummary, LedgerSnapshot, Located, MilkTotal, RejectedRow};
pub use reconciliation::{ReconcileMode, ReconciliationReport, reconcile};
pub use registry::{AnimalRegistry, StatusChange};
pub use tabular::{InMemoryStore, RowAddress, SheetsStore, StoreError, TabularStore};
