//! Google Sheets v4 implementation of [`TabularStore`].
//!
//! Values are written with `valueInputOption=RAW` and read as formatted strings, so a
//! cell reads back exactly as it was written (no date or number coercion by the backend).

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::auth::{ServiceAccountKey, TokenSource};
use super::{RowAddress, SheetData, StoreError, TabularStore};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLUMNS: u32 = 10;

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default)]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Handle on one spreadsheet (the "store").
#[derive(Debug)]
pub struct SheetsStore {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: TokenSource,
}

impl SheetsStore {
    /// Open the spreadsheet `store_id`.
    ///
    /// Authenticates and reads the spreadsheet metadata once, so a bad key, a spreadsheet
    /// the service account cannot see, or an unreachable backend all fail here with
    /// `StoreError::Connection`.
    pub fn open(store_id: &str, key: &ServiceAccountKey) -> Result<Self, StoreError> {
        Self::open_at(DEFAULT_BASE_URL, store_id, key)
    }

    /// Like [`SheetsStore::open`], against a different API base URL.
    pub fn open_at(
        base_url: &str,
        store_id: &str,
        key: &ServiceAccountKey,
    ) -> Result<Self, StoreError> {
        if store_id.trim().is_empty() {
            return Err(StoreError::Configuration("store id is empty".to_string()));
        }
        let http = Client::builder()
            .build()
            .map_err(|e| StoreError::Connection(format!("http client: {e}")))?;
        let store = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: store_id.trim().to_string(),
            tokens: TokenSource::new(key.clone())?,
        };

        let sheets = store.sheet_properties().map_err(|e| match e {
            StoreError::Connection(msg) => StoreError::Connection(msg),
            other => StoreError::Connection(other.to_string()),
        })?;
        tracing::info!(
            store_id = %store.spreadsheet_id,
            client_email = %store.tokens.client_email(),
            sheets = sheets.len(),
            "opened spreadsheet"
        );
        Ok(store)
    }

    fn spreadsheet_url(&self, suffix: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::Configuration(format!("bad base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Configuration("base url cannot have a path".to_string()))?
            .push(&format!("{}{suffix}", self.spreadsheet_id));
        Ok(url)
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, StoreError> {
        let mut url = self.spreadsheet_url("")?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Configuration("base url cannot have a path".to_string()))?
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    /// Attach the bearer token, send, and map transport / status failures.
    fn send(
        &self,
        operation: &'static str,
        sheet: Option<&str>,
        request: RequestBuilder,
    ) -> Result<Response, StoreError> {
        let token = self.tokens.bearer(&self.http)?;
        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|e| StoreError::Connection(format!("{operation}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().unwrap_or_default();
        Err(map_status(operation, sheet, status, message))
    }

    fn sheet_properties(&self) -> Result<Vec<SheetProperties>, StoreError> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let meta: SpreadsheetMeta = self
            .send("read metadata", None, self.http.get(url))?
            .json()
            .map_err(|e| StoreError::Protocol(format!("spreadsheet metadata: {e}")))?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    fn sheet_id(&self, title: &str) -> Result<i64, StoreError> {
        self.sheet_properties()?
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| p.sheet_id)
            .ok_or_else(|| StoreError::SheetNotFound(title.to_string()))
    }

    fn batch_update(
        &self,
        operation: &'static str,
        sheet: &str,
        requests: serde_json::Value,
    ) -> Result<(), StoreError> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        self.send(
            operation,
            Some(sheet),
            self.http.post(url).json(&json!({ "requests": requests })),
        )?;
        Ok(())
    }

    fn put_values(
        &self,
        operation: &'static str,
        sheet: &str,
        range: String,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        let mut url = self.values_url(&range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = ValueRange {
            range: Some(range),
            major_dimension: Some("ROWS".to_string()),
            values,
        };
        self.send(operation, Some(sheet), self.http.put(url).json(&body))?;
        Ok(())
    }
}

impl TabularStore for SheetsStore {
    fn get_rows(&self, sheet: &str) -> Result<SheetData, StoreError> {
        let mut url = self.values_url(&quote_sheet(sheet), "")?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        let range: ValueRange = self
            .send("read rows", Some(sheet), self.http.get(url))?
            .json()
            .map_err(|e| StoreError::Protocol(format!("value range of '{sheet}': {e}")))?;

        tracing::debug!(sheet, rows = range.values.len(), "read sheet");
        Ok(SheetData::from_values(range.values))
    }

    fn append_row(&self, sheet: &str, values: &[String]) -> Result<(), StoreError> {
        let mut url = self.values_url(&format!("{}!A1", quote_sheet(sheet)), ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = ValueRange {
            range: None,
            major_dimension: Some("ROWS".to_string()),
            values: vec![values.to_vec()],
        };
        self.send("append row", Some(sheet), self.http.post(url).json(&body))?;
        Ok(())
    }

    fn update_row(
        &self,
        sheet: &str,
        address: RowAddress,
        values: &[String],
    ) -> Result<(), StoreError> {
        let range = row_range(sheet, address, values.len().max(1));
        self.put_values("update row", sheet, range, vec![values.to_vec()])
    }

    fn update_cell(
        &self,
        sheet: &str,
        address: RowAddress,
        column: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        let range = format!(
            "{}!{}{}",
            quote_sheet(sheet),
            column_letter(column),
            address.row()
        );
        self.put_values("update cell", sheet, range, vec![vec![value.to_string()]])
    }

    fn delete_row(&self, sheet: &str, address: RowAddress) -> Result<(), StoreError> {
        let sheet_id = self.sheet_id(sheet)?;
        let start = address.row().saturating_sub(1);
        self.batch_update(
            "delete row",
            sheet,
            json!([{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + 1
                    }
                }
            }]),
        )
    }

    fn get_or_create_sheet(&self, name: &str, header: &[&str]) -> Result<bool, StoreError> {
        if self.sheet_properties()?.iter().any(|p| p.title == name) {
            return Ok(false);
        }

        self.batch_update(
            "create sheet",
            name,
            json!([{
                "addSheet": {
                    "properties": {
                        "title": name,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLUMNS
                        }
                    }
                }
            }]),
        )?;
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        let range = row_range(name, RowAddress::HEADER, header.len().max(1));
        self.put_values("write header", name, range, vec![header])?;

        tracing::info!(sheet = name, "created sheet");
        Ok(true)
    }
}

fn map_status(
    operation: &'static str,
    sheet: Option<&str>,
    status: StatusCode,
    message: String,
) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Connection(format!(
            "{operation}: credentials rejected ({}): {message}",
            status.as_u16()
        )),
        StatusCode::BAD_REQUEST if message.contains("Unable to parse range") => {
            StoreError::SheetNotFound(sheet.unwrap_or_default().to_string())
        }
        s if s.is_server_error() => StoreError::Connection(format!(
            "{operation}: backend unavailable ({}): {message}",
            s.as_u16()
        )),
        s => StoreError::Remote {
            operation,
            status: s.as_u16(),
            message,
        },
    }
}

/// Sheet name as it must appear in an A1 range.
fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// A1 column letters for a 0-based column index (0 → A, 25 → Z, 26 → AA).
fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Range spanning `width` columns of one row.
fn row_range(sheet: &str, address: RowAddress, width: usize) -> String {
    format!(
        "{}!A{row}:{}{row}",
        quote_sheet(sheet),
        column_letter(width - 1),
        row = address.row()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(9), "J");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
    }

    #[test]
    fn ranges_quote_sheet_names() {
        assert_eq!(quote_sheet("Animals"), "'Animals'");
        assert_eq!(quote_sheet("Bob's herd"), "'Bob''s herd'");
        assert_eq!(row_range("Animals", RowAddress::new(7), 10), "'Animals'!A7:J7");
    }

    #[test]
    fn status_mapping_follows_error_taxonomy() {
        assert!(matches!(
            map_status("read rows", Some("X"), StatusCode::FORBIDDEN, String::new()),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            map_status(
                "read rows",
                Some("Historial"),
                StatusCode::BAD_REQUEST,
                "Unable to parse range: 'Historial'".into()
            ),
            StoreError::SheetNotFound(s) if s == "Historial"
        ));
        assert!(matches!(
            map_status("append row", None, StatusCode::SERVICE_UNAVAILABLE, String::new()),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            map_status("append row", None, StatusCode::CONFLICT, "busy".into()),
            StoreError::Remote { status: 409, .. }
        ));
    }

    #[test]
    fn value_range_without_values_reads_as_empty() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"'Historial'!A1:Z1000","majorDimension":"ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
        assert!(SheetData::from_values(range.values).rows.is_empty());
    }

    #[test]
    fn blank_store_id_is_rejected_before_any_request() {
        let key = ServiceAccountKey {
            client_email: "svc@farm".into(),
            private_key: "unused".into(),
            token_uri: "http://127.0.0.1:9/token".into(),
            project_id: None,
        };
        assert!(matches!(
            SheetsStore::open_at("http://127.0.0.1:9", "  ", &key),
            Err(StoreError::Configuration(_))
        ));
    }
}
