use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ── Raw search results ──

/// Which result shape a search page carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    JobEngine,
    WebSearch,
}

/// One raw search hit, typed by the feed it came from.
#[derive(Debug, Clone)]
pub enum RawResult {
    JobEngine(JobEngineResult),
    WebSearch(WebSearchResult),
}

impl RawResult {
    /// Parse an untyped search item into its variant. Fails on malformed items.
    pub fn parse(kind: ResultKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ResultKind::JobEngine => RawResult::JobEngine(serde_json::from_value(value)?),
            ResultKind::WebSearch => RawResult::WebSearch(serde_json::from_value(value)?),
        })
    }

    pub fn title(&self) -> &str {
        match self {
            RawResult::JobEngine(r) => &r.title,
            RawResult::WebSearch(r) => &r.title,
        }
    }

    /// Free text that policy markers are searched in.
    pub fn description(&self) -> &str {
        match self {
            RawResult::JobEngine(r) => &r.description,
            RawResult::WebSearch(r) => &r.snippet,
        }
    }
}

/// `google_jobs` engine entry from `jobs_results`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobEngineResult {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Publisher label, e.g. "via LinkedIn".
    #[serde(deserialize_with = "null_as_default")]
    pub via: String,
    #[serde(deserialize_with = "null_as_default")]
    pub share_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub apply_options: Vec<ApplyOption>,
    #[serde(deserialize_with = "null_as_default")]
    pub related_links: Vec<RelatedLink>,
    #[serde(deserialize_with = "null_as_default")]
    pub detected_extensions: DetectedExtensions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplyOption {
    /// Site name shown on the apply button, e.g. "Greenhouse".
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub link: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelatedLink {
    #[serde(deserialize_with = "null_as_default")]
    pub link: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectedExtensions {
    #[serde(deserialize_with = "null_as_default")]
    pub posted_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub schedule_type: String,
}

/// Generic web search entry from `organic_results`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebSearchResult {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(deserialize_with = "null_as_default")]
    pub snippet: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
}

/// A JSON `null` reads the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Canonical records ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    Greenhouse,
    Lever,
    Ashby,
    Workable,
    Linkedin,
    Other,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::Greenhouse => "greenhouse",
            JobSource::Lever => "lever",
            JobSource::Ashby => "ashby",
            JobSource::Workable => "workable",
            JobSource::Linkedin => "linkedin",
            JobSource::Other => "other",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "greenhouse" => Ok(JobSource::Greenhouse),
            "lever" => Ok(JobSource::Lever),
            "ashby" => Ok(JobSource::Ashby),
            "workable" => Ok(JobSource::Workable),
            "linkedin" => Ok(JobSource::Linkedin),
            "other" | "unknown" => Ok(JobSource::Other),
            other => Err(format!("unknown job source: {other}")),
        }
    }
}

/// Every scraped job waits for a human before it is acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    ReviewRequired,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::ReviewRequired => "review_required",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub source: JobSource,
    pub posted_at: String,
    pub schedule_type: String,
    pub scraped_at: DateTime<Utc>,
    pub status: JobStatus,
    pub policy_flag: bool,
}

impl CanonicalJob {
    /// Case-insensitive `company|title` identity key.
    pub fn identity_key(&self) -> String {
        identity_key(&self.company, &self.title)
    }
}

pub fn identity_key(company: &str, title: &str) -> String {
    format!("{}|{}", company.to_lowercase(), title.to_lowercase())
}
