//! Versioned row layouts for the animals and ledger sheets.
//!
//! Column order is significant: rows are encoded and decoded by position, and the header
//! row is only used to confirm which layout a sheet carries. Sheets written by the first
//! version of the application use Spanish headers in the same order; they are read as
//! `HeaderVersion::Legacy` and decoded with the same positions.

use core::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use herdbook_core::{AnimalId, DomainError, DomainResult};
use herdbook_events::EventRecord;

use crate::animal::{AnimalRecord, AnimalStatus, Sex, Weight};
use crate::photo::PhotoRef;

/// Version of the current (English header) layouts.
pub const SCHEMA_VERSION: u32 = 2;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which header a sheet carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeaderVersion {
    /// Current layout (`SCHEMA_VERSION`).
    Current,
    /// Version 1 layout (Spanish headers, same column order).
    Legacy,
    /// Sheet has no header row yet (nothing written).
    Empty,
}

/// Column layout of one sheet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub columns: &'static [&'static str],
    pub legacy_columns: &'static [&'static str],
}

/// Layout of the animals sheet.
pub const ANIMALS: SheetLayout = SheetLayout {
    columns: &[
        "ID", "Category", "Name", "Tag", "Breed", "Sex", "Weight", "BirthDate", "Status",
        "PhotoRef",
    ],
    legacy_columns: &[
        "ID", "Tipo", "Nombre", "Arete", "Raza", "Sexo", "Peso", "Nacimiento", "Estado", "Foto",
    ],
};

/// Layout of the ledger sheet.
pub const LEDGER: SheetLayout = SheetLayout {
    columns: &["Date", "EventType", "AnimalID", "Detail1", "Detail2", "Notes"],
    legacy_columns: &[
        "Fecha",
        "Tipo Evento",
        "ID Animal",
        "Detalle 1",
        "Detalle 2",
        "Notas",
    ],
};

/// Zero-based column positions in the animals sheet.
pub mod animal_columns {
    pub const ID: usize = 0;
    pub const CATEGORY: usize = 1;
    pub const NAME: usize = 2;
    pub const TAG: usize = 3;
    pub const BREED: usize = 4;
    pub const SEX: usize = 5;
    pub const WEIGHT: usize = 6;
    pub const BIRTH_DATE: usize = 7;
    pub const STATUS: usize = 8;
    pub const PHOTO_REF: usize = 9;
}

/// Zero-based column positions in the ledger sheet.
pub mod ledger_columns {
    pub const DATE: usize = 0;
    pub const EVENT_TYPE: usize = 1;
    pub const ANIMAL_ID: usize = 2;
    pub const DETAIL1: usize = 3;
    pub const DETAIL2: usize = 4;
    pub const NOTES: usize = 5;
}

impl SheetLayout {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Confirm that `header` (already trimmed by the store) is a known version of this
    /// layout. Trailing blank header cells are ignored.
    pub fn check_header(&self, header: &[String]) -> DomainResult<HeaderVersion> {
        let significant = header
            .iter()
            .rposition(|h| !h.trim().is_empty())
            .map(|last| &header[..=last])
            .unwrap_or(&[]);

        if significant.is_empty() {
            return Ok(HeaderVersion::Empty);
        }

        let same = |expected: &[&str]| {
            significant.len() == expected.len()
                && significant.iter().zip(expected).all(|(h, e)| h.trim() == *e)
        };

        if same(self.columns) {
            Ok(HeaderVersion::Current)
        } else if same(self.legacy_columns) {
            Ok(HeaderVersion::Legacy)
        } else {
            Err(DomainError::schema(format!(
                "unexpected header [{}], expected [{}]",
                significant.join(", "),
                self.columns.join(", ")
            )))
        }
    }

    /// Pad a short row to full width; reject rows carrying data past the last column.
    fn normalize<'a>(&self, cells: &'a [String]) -> DomainResult<Vec<&'a str>> {
        if let Some(extra) = cells.iter().skip(self.width()).find(|c| !c.trim().is_empty()) {
            return Err(DomainError::schema(format!(
                "row has data beyond the last column: '{extra}'"
            )));
        }
        let mut out: Vec<&str> = cells.iter().take(self.width()).map(String::as_str).collect();
        out.resize(self.width(), "");
        Ok(out)
    }
}

/// True for rows with no content at all (skipped by readers).
pub fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

pub fn encode_animal(record: &AnimalRecord) -> Vec<String> {
    vec![
        record.id.to_string(),
        record.category.clone(),
        record.name.clone(),
        record.tag.clone(),
        record.breed.clone(),
        record.sex.label().to_string(),
        record.weight.kg().to_string(),
        record
            .birth_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
        record.status.label().to_string(),
        record.photo_ref.to_cell(),
    ]
}

pub fn decode_animal(cells: &[String]) -> DomainResult<AnimalRecord> {
    use animal_columns as col;

    let row = ANIMALS.normalize(cells)?;
    let id = AnimalId::parse(row[col::ID])
        .map_err(|_| DomainError::schema("animal row has an empty ID"))?;

    Ok(AnimalRecord {
        id,
        category: row[col::CATEGORY].to_string(),
        name: row[col::NAME].to_string(),
        tag: row[col::TAG].to_string(),
        breed: row[col::BREED].to_string(),
        sex: Sex::parse(row[col::SEX])?,
        weight: parse_weight(row[col::WEIGHT])?,
        birth_date: parse_optional_date(row[col::BIRTH_DATE])?,
        status: AnimalStatus::parse(row[col::STATUS])?,
        photo_ref: PhotoRef::from_cell(row[col::PHOTO_REF]),
    })
}

pub fn encode_event(event: &EventRecord) -> Vec<String> {
    vec![
        event.date.format(DATE_FORMAT).to_string(),
        event.event_type.clone(),
        event.animal_id.to_string(),
        event.detail1.clone(),
        event.detail2.clone(),
        event.notes.clone(),
    ]
}

pub fn decode_event(cells: &[String]) -> DomainResult<EventRecord> {
    use ledger_columns as col;

    let row = LEDGER.normalize(cells)?;
    let date = parse_optional_date(row[col::DATE])?
        .ok_or_else(|| DomainError::schema("ledger row has no date"))?;
    let animal_id = AnimalId::parse(row[col::ANIMAL_ID])
        .map_err(|_| DomainError::schema("ledger row has no animal id"))?;

    Ok(EventRecord {
        date,
        event_type: row[col::EVENT_TYPE].to_string(),
        animal_id,
        detail1: row[col::DETAIL1].to_string(),
        detail2: row[col::DETAIL2].to_string(),
        notes: row[col::NOTES].to_string(),
    })
}

/// Blank weight cells read as zero (the first version left them empty when unknown).
fn parse_weight(cell: &str) -> DomainResult<Weight> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(Weight::zero());
    }
    let kg = Decimal::from_str(cell)
        .map_err(|e| DomainError::schema(format!("weight '{cell}' is not a number: {e}")))?;
    Weight::new(kg).map_err(|_| DomainError::schema(format!("weight '{cell}' is negative")))
}

fn parse_optional_date(cell: &str) -> DomainResult<Option<NaiveDate>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(cell, DATE_FORMAT)
        .map(Some)
        .map_err(|e| DomainError::schema(format!("date '{cell}' is not YYYY-MM-DD: {e}")))
}
