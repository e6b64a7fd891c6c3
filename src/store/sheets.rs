use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{from_row, to_row, JobStore, StoreError, StoredJob, HEADERS};
use crate::job::CanonicalJob;

pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

static SPREADSHEET_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap());

/// Accepts a bare spreadsheet ID or a full `docs.google.com/spreadsheets/d/{id}/...` URL.
pub fn extract_spreadsheet_id(input: &str) -> Result<String, StoreError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(StoreError::Config("spreadsheet id is not set".into()));
    }
    if !input.contains('/') {
        return Ok(input.to_string());
    }
    SPREADSHEET_URL_RE
        .captures(input)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| StoreError::Config(format!("invalid spreadsheet id: {input}")))
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Jobs table in a Google Sheet, one row per job under a header row.
pub struct SheetsStore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet: String,
    access_token: String,
}

impl SheetsStore {
    pub fn new(spreadsheet: &str, sheet: &str, access_token: &str) -> Result<Self, StoreError> {
        if access_token.trim().is_empty() {
            return Err(StoreError::Config("google access token is not set".into()));
        }
        Ok(Self {
            client: Client::new(),
            base_url: SHEETS_API_URL.to_string(),
            spreadsheet_id: extract_spreadsheet_id(spreadsheet)?,
            sheet: sheet.to_string(),
            access_token: access_token.trim().to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn data_range(&self) -> String {
        format!("{}!A2:J", self.sheet)
    }

    fn header_range(&self) -> String {
        format!("{}!A1:J1", self.sheet)
    }

    fn values_url(&self, range: &str, action: Option<&str>) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::Config(format!("bad sheets url {}: {}", self.base_url, e)))?;
        let segment = match action {
            Some(a) => format!("{range}:{a}"),
            None => range.to_string(),
        };
        url.path_segments_mut()
            .map_err(|_| StoreError::Config(format!("bad sheets url {}", self.base_url)))?
            .pop_if_empty()
            .extend([self.spreadsheet_id.as_str(), "values", segment.as_str()]);
        Ok(url)
    }

    async fn get_values(&self, range: &str) -> Result<ValueRange, StoreError> {
        let resp = self
            .client
            .get(self.values_url(range, None)?)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn ensure_headers(&self) -> Result<(), StoreError> {
        let has_headers = match self.get_values(&self.header_range()).await {
            Ok(range) => !range.values.is_empty(),
            Err(e) => {
                debug!(error = %e, "header check failed, writing headers");
                false
            }
        };
        if has_headers {
            return Ok(());
        }

        info!("Adding headers to sheet {}", self.sheet);
        let mut url = self.values_url(&self.header_range(), None)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [HEADERS] }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(())
    }
}

async fn api_error(resp: reqwest::Response) -> StoreError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    if status == StatusCode::BAD_REQUEST && message.contains("Unable to parse range") {
        StoreError::Uninitialized(message)
    } else {
        StoreError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl JobStore for SheetsStore {
    async fn read_all(&self) -> Result<Vec<StoredJob>, StoreError> {
        let range = self.get_values(&self.data_range()).await?;
        Ok(range
            .values
            .iter()
            .map(|row| from_row(row))
            .filter(|job| !(job.title.is_empty() && job.company.is_empty() && job.url.is_empty()))
            .collect())
    }

    async fn append_rows(&self, jobs: &[CanonicalJob]) -> Result<(), StoreError> {
        self.ensure_headers().await?;

        let rows: Vec<Vec<String>> = jobs.iter().map(to_row).collect();
        let mut url = self.values_url(&self.data_range(), Some("append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        info!("Appended {} rows to sheet {}", rows.len(), self.sheet);
        Ok(())
    }
}
