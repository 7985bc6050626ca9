use serde::{Deserialize, Serialize};

/// Sentinel stored when no photo was supplied.
pub const NO_PHOTO: &str = "no-photo";

/// Sentinel stored when the upload failed.
pub const PHOTO_ERROR: &str = "error";

/// Reference to an animal's photo as stored in the PhotoRef column.
///
/// Whatever the photo host returned is stored verbatim; reachability is never checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PhotoRef {
    Url(String),
    NoPhoto,
    Error,
}

impl PhotoRef {
    /// Decode a stored cell. Blank cells and the legacy "Sin Foto" read as `NoPhoto`.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case(NO_PHOTO)
            || trimmed.eq_ignore_ascii_case("Sin Foto")
        {
            PhotoRef::NoPhoto
        } else if trimmed.eq_ignore_ascii_case(PHOTO_ERROR) {
            PhotoRef::Error
        } else {
            PhotoRef::Url(cell.to_string())
        }
    }

    pub fn to_cell(&self) -> String {
        match self {
            PhotoRef::Url(url) => url.clone(),
            PhotoRef::NoPhoto => NO_PHOTO.to_string(),
            PhotoRef::Error => PHOTO_ERROR.to_string(),
        }
    }

    /// URL worth handing to an image renderer.
    pub fn displayable_url(&self) -> Option<&str> {
        match self {
            PhotoRef::Url(url) if url.contains("http") => Some(url),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PhotoRef::Error)
    }
}

impl From<String> for PhotoRef {
    fn from(value: String) -> Self {
        PhotoRef::from_cell(&value)
    }
}

impl From<PhotoRef> for String {
    fn from(value: PhotoRef) -> Self {
        value.to_cell()
    }
}
