//! Command execution for operator actions.
//!
//! Every action the operator can take is a [`HerdCommand`] value handed to one
//! [`CommandDispatcher`]. The dispatcher owns validation, photo resolution, the combined
//! sale operation, and the conversion of every failure into [`Feedback`].
//!
//! ## Execution flow
//!
//! ```text
//! HerdCommand
//!   ↓
//! 1. Validate (types, selection, registry lookups)
//!   ↓
//! 2. Resolve photo (register / update only; failures become a warning)
//!   ↓
//! 3. Write (registry row and/or ledger entry, one remote call each)
//!   ↓
//! 4. Executed { outcome, warnings }  or  DispatchError
//! ```
//!
//! ## Sales
//!
//! A sale touches two sheets without a transaction. Per animal, in selection order:
//!
//! 1. append the SALE entry
//! 2. mark the animal Sold
//! 3. if (2) failed, append a VOID entry neutralizing (1)
//!
//! The first failure stops the batch. The [`SaleReport`] lists every selected animal with
//! what actually happened to it, so a half-applied sale is always visible. Animals whose
//! compensation also failed are reported as inconsistent and are what the reconciliation
//! pass repairs.

use thiserror::Error;

use herdbook_core::{AnimalId, DomainError};
use herdbook_events::{Command, CommandHandler, EventRecord, EventType, SaleOrder};
use herdbook_livestock::{AnimalRecord, AnimalStatus};

use crate::error::HerdError;
use crate::ledger::EventLedger;
use crate::photo::{PhotoHost, PhotoResolver};
use crate::registry::{AnimalRegistry, StatusChange};
use crate::tabular::{StoreError, TabularStore};

/// An operator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HerdCommand {
    /// Add a new animal; `photo` is the raw image, if one was supplied.
    RegisterAnimal {
        record: AnimalRecord,
        photo: Option<Vec<u8>>,
    },
    /// Replace the stored record of `id`. Without a new photo the stored reference is kept.
    UpdateAnimal {
        id: AnimalId,
        record: AnimalRecord,
        photo: Option<Vec<u8>>,
    },
    ChangeStatus {
        id: AnimalId,
        status: AnimalStatus,
    },
    DeleteAnimal {
        id: AnimalId,
    },
    RecordSale(SaleOrder),
    /// Any other ledger entry (milk, weighing, health, heat, purchase, free-form).
    RecordEvent(EventRecord),
}

impl Command for HerdCommand {
    fn name(&self) -> &'static str {
        match self {
            HerdCommand::RegisterAnimal { .. } => "register_animal",
            HerdCommand::UpdateAnimal { .. } => "update_animal",
            HerdCommand::ChangeStatus { .. } => "change_status",
            HerdCommand::DeleteAnimal { .. } => "delete_animal",
            HerdCommand::RecordSale(_) => "record_sale",
            HerdCommand::RecordEvent(_) => "record_event",
        }
    }

    fn target_animal(&self) -> Option<&AnimalId> {
        match self {
            HerdCommand::RegisterAnimal { record, .. } => Some(&record.id),
            HerdCommand::UpdateAnimal { id, .. }
            | HerdCommand::ChangeStatus { id, .. }
            | HerdCommand::DeleteAnimal { id } => Some(id),
            HerdCommand::RecordSale(_) => None,
            HerdCommand::RecordEvent(event) if event.animal_id.is_herd() => None,
            HerdCommand::RecordEvent(event) => Some(&event.animal_id),
        }
    }
}

/// What happened to one animal of a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleLineStatus {
    /// SALE entry written and animal marked Sold.
    Completed,
    /// The SALE entry could not be written; nothing changed for this animal.
    Failed { reason: String },
    /// The status write failed and the SALE entry was neutralized by a VOID entry.
    Voided { reason: String },
    /// The status write failed and so did the VOID entry: the ledger shows a sale the
    /// registry does not.
    Inconsistent { reason: String },
    /// Skipped because an earlier animal of the batch failed.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub animal_id: AnimalId,
    pub status: SaleLineStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleReport {
    pub lines: Vec<SaleLine>,
}

impl SaleReport {
    pub fn completed(&self) -> impl Iterator<Item = &AnimalId> {
        self.lines
            .iter()
            .filter(|l| l.status == SaleLineStatus::Completed)
            .map(|l| &l.animal_id)
    }

    pub fn is_complete(&self) -> bool {
        self.lines
            .iter()
            .all(|l| l.status == SaleLineStatus::Completed)
    }

    /// One clause per animal, e.g. `"A1 sold; A2 voided (...); A3 not attempted"`.
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .map(|l| match &l.status {
                SaleLineStatus::Completed => format!("{} sold", l.animal_id),
                SaleLineStatus::Failed { reason } => format!("{} failed ({reason})", l.animal_id),
                SaleLineStatus::Voided { reason } => format!("{} voided ({reason})", l.animal_id),
                SaleLineStatus::Inconsistent { reason } => {
                    format!("{} INCONSISTENT ({reason})", l.animal_id)
                }
                SaleLineStatus::NotAttempted => format!("{} not attempted", l.animal_id),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl core::fmt::Display for SaleReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Registered(AnimalId),
    Updated(AnimalId),
    StatusChanged { id: AnimalId, change: StatusChange },
    Deleted(AnimalId),
    Sold(SaleReport),
    Recorded {
        event_type: String,
        animal_id: AnimalId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub outcome: Outcome,
    /// Non-fatal problems (photo upload failures).
    pub warnings: Vec<String>,
}

impl Executed {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            warnings: Vec::new(),
        }
    }

    fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warnings.extend(warning);
        self
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Store unreachable or credentials rejected.
    #[error("could not reach the store: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    NotFound(String),

    /// Rejected input; nothing was written.
    #[error("{0}")]
    Validation(String),

    /// Stored data does not match the expected layout.
    #[error("{0}")]
    Schema(String),

    #[error(transparent)]
    Store(StoreError),

    /// Some animals of a sale were not sold; see the report.
    #[error("sale incomplete: {0}")]
    SaleIncomplete(SaleReport),
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::NotFound(what) => DispatchError::NotFound(format!("{what} not found")),
            DomainError::Schema(msg) => DispatchError::Schema(msg),
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Connection(msg) => DispatchError::Connection(msg),
            StoreError::Configuration(msg) => DispatchError::Configuration(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<HerdError> for DispatchError {
    fn from(value: HerdError) -> Self {
        match value {
            HerdError::Domain(e) => e.into(),
            HerdError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FeedbackLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// User-facing result of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub message: String,
    pub warnings: Vec<String>,
}

impl Feedback {
    fn from_executed(executed: Executed) -> Self {
        let message = match &executed.outcome {
            Outcome::Registered(id) => format!("Animal {id} registered"),
            Outcome::Updated(id) => format!("Animal {id} updated"),
            Outcome::StatusChanged {
                id,
                change: StatusChange::Changed { from, to },
            } => format!("Animal {id}: {from} → {to}"),
            Outcome::StatusChanged {
                id,
                change: StatusChange::Unchanged(status),
            } => format!("Animal {id} is already {status}"),
            Outcome::Deleted(id) => format!("Animal {id} deleted"),
            Outcome::Sold(report) => format!("Sale recorded: {report}"),
            Outcome::Recorded {
                event_type,
                animal_id,
            } => format!("{event_type} recorded for {animal_id}"),
        };
        let level = if executed.warnings.is_empty() {
            FeedbackLevel::Success
        } else {
            FeedbackLevel::Warning
        };
        Self {
            level,
            message,
            warnings: executed.warnings,
        }
    }

    fn from_error(error: &DispatchError) -> Self {
        let level = match error {
            DispatchError::NotFound(_) => FeedbackLevel::Info,
            _ => FeedbackLevel::Error,
        };
        let message = match error {
            DispatchError::NotFound(msg) => format!("{msg}; nothing changed"),
            other => other.to_string(),
        };
        Self {
            level,
            message,
            warnings: Vec::new(),
        }
    }
}

/// Executes [`HerdCommand`]s against the registry, the ledger and the photo host.
///
/// Holds no state between commands; every call re-reads what it needs.
#[derive(Debug, Clone)]
pub struct CommandDispatcher<S, H> {
    registry: AnimalRegistry<S>,
    ledger: EventLedger<S>,
    photos: PhotoResolver<H>,
}

impl<S, H> CommandDispatcher<S, H>
where
    S: TabularStore,
    H: PhotoHost,
{
    pub fn new(registry: AnimalRegistry<S>, ledger: EventLedger<S>, photos: PhotoResolver<H>) -> Self {
        Self {
            registry,
            ledger,
            photos,
        }
    }

    pub fn registry(&self) -> &AnimalRegistry<S> {
        &self.registry
    }

    pub fn ledger(&self) -> &EventLedger<S> {
        &self.ledger
    }

    /// Execute `command`. On error nothing is written, except for sales, where the
    /// error carries the per-animal report.
    pub fn dispatch(&self, command: &HerdCommand) -> Result<Executed, DispatchError> {
        tracing::debug!(command = command.name(), target = ?command.target_animal(), "dispatching");
        match command {
            HerdCommand::RegisterAnimal { record, photo } => self.register(record, photo.as_deref()),
            HerdCommand::UpdateAnimal { id, record, photo } => {
                self.update(id, record, photo.as_deref())
            }
            HerdCommand::ChangeStatus { id, status } => {
                let change = self.registry.set_status(id, *status)?;
                Ok(Executed::new(Outcome::StatusChanged {
                    id: id.clone(),
                    change,
                }))
            }
            HerdCommand::DeleteAnimal { id } => {
                self.registry.delete(id)?;
                Ok(Executed::new(Outcome::Deleted(id.clone())))
            }
            HerdCommand::RecordSale(order) => self.sell(order),
            HerdCommand::RecordEvent(event) => self.record(event),
        }
    }

    /// [`dispatch`](Self::dispatch), with the result turned into user feedback.
    pub fn respond(&self, command: &HerdCommand) -> Feedback {
        match self.dispatch(command) {
            Ok(executed) => Feedback::from_executed(executed),
            Err(e) => {
                match &e {
                    DispatchError::NotFound(_) | DispatchError::Validation(_) => {
                        tracing::info!(command = command.name(), error = %e, "command rejected")
                    }
                    _ => tracing::warn!(command = command.name(), error = %e, "command failed"),
                }
                Feedback::from_error(&e)
            }
        }
    }

    /// The photo is uploaded only once the id is known to be free.
    fn register(&self, record: &AnimalRecord, photo: Option<&[u8]>) -> Result<Executed, DispatchError> {
        let mut warning = None;
        let created = self.registry.create_with(&record.id, || {
            let upload = self.photos.upload(photo);
            warning = upload.warning;
            AnimalRecord {
                photo_ref: upload.photo_ref,
                ..record.clone()
            }
        })?;
        Ok(Executed::new(Outcome::Registered(created.id)).with_warning(warning))
    }

    fn update(
        &self,
        id: &AnimalId,
        record: &AnimalRecord,
        photo: Option<&[u8]>,
    ) -> Result<Executed, DispatchError> {
        if &record.id != id {
            return Err(DispatchError::Validation(format!(
                "cannot change animal id {id} to {}",
                record.id
            )));
        }

        let mut warning = None;
        self.registry.update_with(id, |stored| {
            let photo_ref = match photo {
                Some(image) => {
                    let upload = self.photos.upload(Some(image));
                    warning = upload.warning;
                    upload.photo_ref
                }
                None => stored.photo_ref.clone(),
            };
            AnimalRecord {
                photo_ref,
                ..record.clone()
            }
        })?;
        Ok(Executed::new(Outcome::Updated(id.clone())).with_warning(warning))
    }

    fn record(&self, event: &EventRecord) -> Result<Executed, DispatchError> {
        if event.event_type.trim().is_empty() {
            return Err(DispatchError::Validation("event type is required".to_string()));
        }
        if matches!(event.kind(), Some(EventType::Sale | EventType::Void)) {
            return Err(DispatchError::Validation(format!(
                "{} entries are written by a sale; record it with RecordSale",
                event.event_type
            )));
        }
        if !event.animal_id.is_herd() && !self.registry.load()?.contains(&event.animal_id) {
            return Err(DispatchError::Validation(format!(
                "animal {} is not registered",
                event.animal_id
            )));
        }

        self.ledger.append(event)?;
        Ok(Executed::new(Outcome::Recorded {
            event_type: event.event_type.clone(),
            animal_id: event.animal_id.clone(),
        }))
    }

    fn sell(&self, order: &SaleOrder) -> Result<Executed, DispatchError> {
        order.validate()?;

        let herd = self.registry.load()?;
        for id in &order.animal_ids {
            let entry = herd
                .get(id)
                .ok_or_else(|| DispatchError::Validation(format!("animal {id} is not registered")))?;
            if entry.record.status.is_sold() {
                return Err(DispatchError::Validation(format!("animal {id} is already sold")));
            }
        }

        let mut report = SaleReport::default();
        let mut stopped = false;
        for id in &order.animal_ids {
            let status = if stopped {
                SaleLineStatus::NotAttempted
            } else {
                self.sell_one(order, id)
            };
            stopped |= status != SaleLineStatus::Completed;
            report.lines.push(SaleLine {
                animal_id: id.clone(),
                status,
            });
        }

        if report.is_complete() {
            tracing::info!(animals = report.lines.len(), date = %order.date, "sale completed");
            Ok(Executed::new(Outcome::Sold(report)))
        } else {
            Err(DispatchError::SaleIncomplete(report))
        }
    }

    fn sell_one(&self, order: &SaleOrder, id: &AnimalId) -> SaleLineStatus {
        let entry = EventRecord::sale(order.date, id.clone(), &order.terms);
        if let Err(e) = self.ledger.append(&entry) {
            tracing::warn!(animal_id = %id, error = %e, "sale entry not written");
            return SaleLineStatus::Failed {
                reason: e.to_string(),
            };
        }

        let status_error = match self.registry.transition_to_sold(id) {
            Ok(_) => return SaleLineStatus::Completed,
            Err(e) => e.to_string(),
        };
        tracing::warn!(animal_id = %id, error = %status_error, "status write failed, voiding sale entry");

        let void = EventRecord::void(
            order.date,
            &entry,
            format!("status update failed: {status_error}"),
        );
        match self.ledger.append(&void) {
            Ok(()) => SaleLineStatus::Voided {
                reason: status_error,
            },
            Err(e) => {
                tracing::error!(
                    animal_id = %id,
                    status_error = %status_error,
                    void_error = %e,
                    "sale entry could not be voided; ledger and registry disagree"
                );
                SaleLineStatus::Inconsistent {
                    reason: format!("{status_error}; void failed: {e}"),
                }
            }
        }
    }
}

impl<S, H> CommandHandler for CommandDispatcher<S, H>
where
    S: TabularStore,
    H: PhotoHost,
{
    type Cmd = HerdCommand;
    type Output = Feedback;
    type Error = core::convert::Infallible;

    fn handle(&self, command: &Self::Cmd) -> Result<Self::Output, Self::Error> {
        Ok(self.respond(command))
    }
}
