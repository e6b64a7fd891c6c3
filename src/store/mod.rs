pub mod sheets;
pub mod sqlite;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::job::CanonicalJob;

/// Column headers of the jobs table, in row order.
pub const HEADERS: [&str; 10] = [
    "Scraped At",
    "Title",
    "Company",
    "Location",
    "URL",
    "Source",
    "Posted At",
    "Schedule Type",
    "Status",
    "Policy Flag",
];

#[derive(Debug, Error)]
pub enum StoreError {
    /// The table is missing or has never been written. Readers treat it as empty.
    #[error("job table is not initialized: {0}")]
    Uninitialized(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheets api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("store misconfigured: {0}")]
    Config(String),
}

/// A previously persisted job, reduced to the fields used for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub title: String,
    pub company: String,
    pub url: String,
}

/// Append-only job table. Appends do not deduplicate; callers must.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn read_all(&self) -> Result<Vec<StoredJob>, StoreError>;

    async fn append_rows(&self, jobs: &[CanonicalJob]) -> Result<(), StoreError>;
}

/// One job as table cells, in `HEADERS` order.
pub fn to_row(job: &CanonicalJob) -> Vec<String> {
    vec![
        job.scraped_at.to_rfc3339(),
        job.title.clone(),
        job.company.clone(),
        job.location.clone(),
        job.url.clone(),
        job.source.to_string(),
        job.posted_at.clone(),
        job.schedule_type.clone(),
        job.status.as_str().to_string(),
        job.policy_flag.to_string(),
    ]
}

/// Reads title, company and URL back out of a row. Short rows yield empty cells.
pub fn from_row(row: &[String]) -> StoredJob {
    let cell = |i: usize| row.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
    StoredJob {
        title: cell(1),
        company: cell(2),
        url: cell(4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobSource, JobStatus};

    #[test]
    fn row_layout_matches_headers() {
        let job = CanonicalJob {
            title: "Designer".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            url: "https://acme.com/j/1".into(),
            source: JobSource::Greenhouse,
            posted_at: "1 day ago".into(),
            schedule_type: "Full-time".into(),
            scraped_at: chrono::Utc::now(),
            status: JobStatus::ReviewRequired,
            policy_flag: true,
        };
        let row = to_row(&job);
        assert_eq!(row.len(), HEADERS.len());
        assert_eq!(row[5], "greenhouse");
        assert_eq!(row[8], "review_required");
        assert_eq!(row[9], "true");

        let stored = from_row(&row);
        assert_eq!(stored.title, "Designer");
        assert_eq!(stored.company, "Acme");
        assert_eq!(stored.url, "https://acme.com/j/1");
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let stored = from_row(&["2025-01-01".to_string(), "Designer".to_string()]);
        assert_eq!(stored.title, "Designer");
        assert!(stored.company.is_empty());
        assert!(stored.url.is_empty());
    }
}
