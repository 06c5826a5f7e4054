//! Google Sheets v4 REST implementation of [`Workbook`]

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::service_account::{fetch_access_token, ServiceAccountKey, SHEETS_SCOPE};
use super::Workbook;
use crate::error::{Result, TwinError};

/// Client bound to one spreadsheet
pub struct GoogleSheetsClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsClient {
    /// Authenticate with the service account and bind to `spreadsheet_id`
    pub async fn connect(base_url: &str, spreadsheet_id: &str, key: &ServiceAccountKey) -> Result<Self> {
        let token = fetch_access_token(key, SHEETS_SCOPE).await?;
        Self::with_token(base_url, spreadsheet_id, token)
    }

    /// Use an already minted access token
    #[doc(hidden)]
    pub fn with_token(base_url: &str, spreadsheet_id: &str, access_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build().map_err(TwinError::Http)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.into(),
        })
    }

    /// `{base}/v4/spreadsheets/{id}` plus extra path segments, each encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TwinError::config(format!("Invalid sheets API base '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| TwinError::config(format!("Sheets API base '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, title: &str, action: Option<&str>) -> Result<Url> {
        let range = a1_range(title);
        let last = match action {
            Some(action) => format!("{}:{}", range, action),
            None => range,
        };
        self.url(&[self.spreadsheet_id.as_str(), "values", last.as_str()])
    }

    async fn metadata(&self) -> Result<Vec<SheetProperties>> {
        let mut url = self.url(&[self.spreadsheet_id.as_str()])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let response = self.send(self.client.get(url)).await?;
        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| TwinError::invalid_response(format!("Failed to parse spreadsheet metadata: {}", e)))?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn batch_update(&self, request: Value) -> Result<()> {
        let url = self.url(&[format!("{}:batchUpdate", self.spreadsheet_id).as_str()])?;
        self.send(self.client.post(url).json(&json!({ "requests": [request] })))
            .await?;
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let request = request.bearer_auth(&self.access_token).build()?;
        debug!("{} {}", request.method(), request.url());
        let response = self.client.execute(request).await?;
        check_status(response).await
    }
}

/// Whole-sheet A1 range, quoted so titles with spaces work
fn a1_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            Err(TwinError::auth(format!(
                "Sheets API rejected the service account ({}): {}",
                status, body
            )))
        }
        StatusCode::TOO_MANY_REQUESTS => Err(TwinError::RateLimited),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(TwinError::api(status.as_u16(), body))
        }
    }
}

#[async_trait]
impl Workbook for GoogleSheetsClient {
    async fn worksheet_titles(&self) -> Result<Vec<String>> {
        Ok(self.metadata().await?.into_iter().map(|p| p.title).collect())
    }

    async fn add_worksheet(&self, title: &str, columns: usize) -> Result<()> {
        self.batch_update(json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": 1000, "columnCount": columns }
                }
            }
        }))
        .await
    }

    async fn rename_worksheet(&self, from: &str, to: &str) -> Result<()> {
        let sheet_id = self
            .metadata()
            .await?
            .into_iter()
            .find(|p| p.title == from)
            .map(|p| p.sheet_id)
            .ok_or_else(|| TwinError::TableMissing(from.to_string()))?;

        self.batch_update(json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "title": to },
                "fields": "title"
            }
        }))
        .await
    }

    async fn read_rows(&self, title: &str) -> Result<Vec<Vec<Value>>> {
        let mut url = self.values_url(title, None)?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");

        let response = self.send(self.client.get(url)).await?;
        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| TwinError::invalid_response(format!("Failed to parse values of '{}': {}", title, e)))?;
        Ok(range.values)
    }

    async fn append_rows(&self, title: &str, rows: &[Vec<Value>]) -> Result<()> {
        let mut url = self.values_url(title, Some("append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        self.send(self.client.post(url).json(&json!({ "values": rows })))
            .await?;
        Ok(())
    }

    async fn clear(&self, title: &str) -> Result<()> {
        let url = self.values_url(title, Some("clear"))?;
        self.send(self.client.post(url).json(&json!({}))).await?;
        Ok(())
    }
}
