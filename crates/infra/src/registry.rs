//! Animal registry: id-keyed CRUD over the animals sheet.
//!
//! Every id-addressed operation reads the whole sheet once, scans the id column in store
//! order and then addresses the matching row. Row addresses never outlive the call that
//! read them.

use herdbook_core::{AnimalId, DomainError};
use herdbook_livestock::schema::{animal_columns, decode_animal, encode_animal};
use herdbook_livestock::{ANIMALS, AnimalRecord, AnimalStatus, HeaderVersion};

use crate::error::{HerdError, HerdResult};
use crate::projections::{HerdSnapshot, Located};
use crate::tabular::{Row, RowAddress, SheetData, TabularStore};

pub const DEFAULT_ANIMALS_SHEET: &str = "Animals";

/// Result of a status write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Changed {
        from: AnimalStatus,
        to: AnimalStatus,
    },
    /// The animal already had the requested status; nothing was written.
    Unchanged(AnimalStatus),
}

#[derive(Debug, Clone)]
pub struct AnimalRegistry<S> {
    store: S,
    sheet: String,
}

impl<S> AnimalRegistry<S>
where
    S: TabularStore,
{
    pub fn new(store: S, sheet: impl Into<String>) -> Self {
        Self {
            store,
            sheet: sheet.into(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create the animals sheet with its header when it does not exist yet.
    ///
    /// An existing sheet with no header row gets one; an existing sheet with a foreign
    /// header is a schema error. Returns `true` when anything was written.
    pub fn ensure_provisioned(&self) -> HerdResult<bool> {
        if self.store.get_or_create_sheet(&self.sheet, ANIMALS.columns)? {
            tracing::info!(sheet = %self.sheet, "provisioned animals sheet");
            return Ok(true);
        }

        let data = self.store.get_rows(&self.sheet)?;
        if ANIMALS.check_header(&data.header)? == HeaderVersion::Empty {
            let header: Vec<String> = ANIMALS.columns.iter().map(|c| c.to_string()).collect();
            self.store
                .update_row(&self.sheet, RowAddress::HEADER, &header)?;
            tracing::info!(sheet = %self.sheet, "wrote missing animals header");
            return Ok(true);
        }
        Ok(false)
    }

    /// One read of the sheet, decoded.
    pub fn load(&self) -> HerdResult<HerdSnapshot> {
        let data = self.read()?;
        Ok(HerdSnapshot::from_sheet(&data)?)
    }

    /// Append `record` as a new row.
    ///
    /// Fails with a validation error when a row with the same id already exists.
    pub fn create(&self, record: &AnimalRecord) -> HerdResult<()> {
        self.create_with(&record.id, || record.clone()).map(|_| ())
    }

    /// Like [`create`](Self::create), but the record is only built once `id` is known to
    /// be free. `build` runs at most once, after the sheet read and before the append.
    pub fn create_with(
        &self,
        id: &AnimalId,
        build: impl FnOnce() -> AnimalRecord,
    ) -> HerdResult<AnimalRecord> {
        let data = self.read()?;
        if first_match(&data, id).is_some() {
            return Err(DomainError::validation(format!("animal id {id} is already registered")).into());
        }

        let record = build();
        if &record.id != id {
            return Err(DomainError::validation(format!(
                "built record has id {}, expected {id}",
                record.id
            ))
            .into());
        }

        self.store.append_row(&self.sheet, &encode_animal(&record))?;
        tracing::info!(sheet = %self.sheet, animal_id = %id, "registered animal");
        Ok(record)
    }

    /// First row carrying `id`, in store order.
    pub fn find_by_id(&self, id: &AnimalId) -> HerdResult<Located<AnimalRecord>> {
        let data = self.read()?;
        let row = self.locate(&data, id)?;
        let record = decode_animal(&row.cells)?;
        tracing::debug!(sheet = %self.sheet, animal_id = %id, address = %row.address, "found animal");
        Ok(Located {
            address: row.address,
            record,
        })
    }

    /// Overwrite the full row of `id` with `record`.
    ///
    /// The id itself cannot change and a sold animal cannot be moved back to another
    /// status.
    pub fn update(&self, id: &AnimalId, record: &AnimalRecord) -> HerdResult<()> {
        if &record.id != id {
            return Err(DomainError::validation(format!(
                "cannot change animal id {id} to {}",
                record.id
            ))
            .into());
        }

        self.update_with(id, |_| record.clone()).map(|_| ())
    }

    /// Overwrite the row of `id` with a record derived from the stored one.
    ///
    /// One read locates the row; `edit` sees the stored record and returns the
    /// replacement, which is checked like in [`update`](Self::update) before the write.
    pub fn update_with(
        &self,
        id: &AnimalId,
        edit: impl FnOnce(&AnimalRecord) -> AnimalRecord,
    ) -> HerdResult<AnimalRecord> {
        let current = self.find_by_id(id)?;
        let record = edit(&current.record);
        if &record.id != id {
            return Err(DomainError::validation(format!(
                "cannot change animal id {id} to {}",
                record.id
            ))
            .into());
        }
        ensure_transition(id, current.record.status, record.status)?;

        self.store
            .update_row(&self.sheet, current.address, &encode_animal(&record))?;
        tracing::info!(sheet = %self.sheet, animal_id = %id, address = %current.address, "updated animal");
        Ok(record)
    }

    /// Write only the status cell of `id`.
    pub fn set_status(&self, id: &AnimalId, status: AnimalStatus) -> HerdResult<StatusChange> {
        if status.is_sold() {
            return self.transition_to_sold(id);
        }

        let current = self.find_by_id(id)?;
        let from = current.record.status;
        ensure_transition(id, from, status)?;
        if from == status {
            return Ok(StatusChange::Unchanged(status));
        }

        self.write_status(id, current.address, status)?;
        Ok(StatusChange::Changed { from, to: status })
    }

    /// Mark `id` as sold. Idempotent: an animal that is already sold is left untouched.
    pub fn transition_to_sold(&self, id: &AnimalId) -> HerdResult<StatusChange> {
        let current = self.find_by_id(id)?;
        let from = current.record.status;
        if from.is_sold() {
            tracing::debug!(sheet = %self.sheet, animal_id = %id, "animal already sold");
            return Ok(StatusChange::Unchanged(AnimalStatus::Sold));
        }

        self.write_status(id, current.address, AnimalStatus::Sold)?;
        Ok(StatusChange::Changed {
            from,
            to: AnimalStatus::Sold,
        })
    }

    /// Remove the row of `id`. Irreversible.
    ///
    /// The row is located by its id cell only, so rows that no longer decode can still be
    /// deleted.
    pub fn delete(&self, id: &AnimalId) -> HerdResult<()> {
        let data = self.read()?;
        let address = self.locate(&data, id)?.address;
        self.store.delete_row(&self.sheet, address)?;
        tracing::info!(sheet = %self.sheet, animal_id = %id, %address, "deleted animal");
        Ok(())
    }

    fn write_status(
        &self,
        id: &AnimalId,
        address: RowAddress,
        status: AnimalStatus,
    ) -> HerdResult<()> {
        self.store
            .update_cell(&self.sheet, address, animal_columns::STATUS, status.label())?;
        tracing::info!(sheet = %self.sheet, animal_id = %id, status = %status, "status changed");
        Ok(())
    }

    fn read(&self) -> HerdResult<SheetData> {
        let data = self.store.get_rows(&self.sheet)?;
        ANIMALS.check_header(&data.header)?;
        Ok(data)
    }

    fn locate<'a>(&self, data: &'a SheetData, id: &AnimalId) -> HerdResult<&'a Row> {
        let mut matches = data
            .rows
            .iter()
            .filter(|r| id.matches_cell(r.cell(animal_columns::ID)));
        let first = matches
            .next()
            .ok_or_else(|| HerdError::from(DomainError::not_found(format!("animal {id}"))))?;

        let others: Vec<String> = matches.map(|r| r.address.to_string()).collect();
        if !others.is_empty() {
            tracing::warn!(
                sheet = %self.sheet,
                animal_id = %id,
                using = %first.address,
                ignored = %others.join(", "),
                "duplicate animal id"
            );
        }
        Ok(first)
    }
}

fn first_match<'a>(data: &'a SheetData, id: &AnimalId) -> Option<&'a Row> {
    data.rows
        .iter()
        .find(|r| id.matches_cell(r.cell(animal_columns::ID)))
}

fn ensure_transition(id: &AnimalId, from: AnimalStatus, to: AnimalStatus) -> HerdResult<()> {
    if from.can_become(to) {
        Ok(())
    } else {
        Err(DomainError::validation(format!("animal {id} is {from} and cannot become {to}")).into())
    }
}
