use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::filters::SourceFilters;
use crate::job::JobSource;
use crate::policy::PolicyMode;
use crate::search::{Pagination, SearchEngine};
use crate::store::sqlite::DEFAULT_DB_PATH;

pub const DEFAULT_QUERY: &str = "product designer design system remote";
const CONFIG_FILE: &str = "job_scout";
const ENV_PREFIX: &str = "JOB_SCOUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Sheets,
}

/// Runtime settings: defaults, then `job_scout.toml`, then `JOB_SCOUT_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serpapi_key: String,
    pub store: StoreBackend,
    pub db_path: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub google_access_token: String,
    pub policy_mode: PolicyMode,
    pub host: String,
    pub port: u16,
    /// Minutes between scheduled runs while serving. 0 disables the scheduler.
    pub schedule_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serpapi_key: String::new(),
            store: StoreBackend::Sqlite,
            db_path: DEFAULT_DB_PATH.to_string(),
            spreadsheet_id: String::new(),
            sheet_name: "Sheet1".to_string(),
            google_access_token: String::new(),
            policy_mode: PolicyMode::Drop,
            host: "0.0.0.0".to_string(),
            port: 3000,
            schedule_minutes: 0,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to load settings")?;
        settings
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn schedule_interval(&self) -> Option<Duration> {
        (self.schedule_minutes > 0).then(|| Duration::from_secs(self.schedule_minutes * 60))
    }
}

// ── Scrape profiles ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileName {
    Filtered,
    General,
    Boards,
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileName::Filtered => "filtered",
            ProfileName::General => "general",
            ProfileName::Boards => "boards",
        })
    }
}

impl FromStr for ProfileName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filtered" => Ok(ProfileName::Filtered),
            "general" => Ok(ProfileName::General),
            "boards" => Ok(ProfileName::Boards),
            other => Err(format!("unknown profile '{other}' (filtered, general, boards)")),
        }
    }
}

/// One scraper deployment: what to search, how to page, and what to keep.
#[derive(Debug, Clone)]
pub struct ScrapeProfile {
    pub name: ProfileName,
    pub engine: SearchEngine,
    pub pagination: Pagination,
    pub query: String,
    pub engine_params: Vec<(String, String)>,
    pub total_results: usize,
    pub delay: Duration,
    pub filters: SourceFilters,
}

impl ScrapeProfile {
    pub fn named(name: ProfileName) -> Self {
        match name {
            ProfileName::Filtered => Self::filtered(),
            ProfileName::General => Self::general(),
            ProfileName::Boards => Self::boards(),
        }
    }

    /// Job boards only, last two weeks.
    pub fn filtered() -> Self {
        Self {
            name: ProfileName::Filtered,
            engine: SearchEngine::GoogleJobs,
            pagination: Pagination::Token,
            query: DEFAULT_QUERY.to_string(),
            engine_params: vec![("date_posted".to_string(), "month".to_string())],
            total_results: 80,
            delay: Duration::from_millis(2000),
            filters: SourceFilters {
                allowed_sources: vec![
                    JobSource::Greenhouse,
                    JobSource::Lever,
                    JobSource::Ashby,
                    JobSource::Linkedin,
                ],
                max_age_days: Some(14),
            },
        }
    }

    /// Every source, wider pool.
    pub fn general() -> Self {
        Self {
            name: ProfileName::General,
            engine: SearchEngine::GoogleJobs,
            pagination: Pagination::Offset { page_size: 10 },
            query: DEFAULT_QUERY.to_string(),
            engine_params: Vec::new(),
            total_results: 150,
            delay: Duration::from_millis(3000),
            filters: SourceFilters::default(),
        }
    }

    /// Web search restricted to board domains.
    pub fn boards() -> Self {
        Self {
            name: ProfileName::Boards,
            engine: SearchEngine::Google,
            pagination: Pagination::Offset { page_size: 10 },
            query: "product designer remote (site:boards.greenhouse.io OR site:jobs.lever.co OR site:jobs.ashbyhq.com)"
                .to_string(),
            engine_params: Vec::new(),
            total_results: 80,
            delay: Duration::from_millis(2000),
            filters: SourceFilters::default(),
        }
    }
}
