use std::sync::LazyLock;

use regex::Regex;

use crate::job::{CanonicalJob, JobSource};

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Source allow-list and posting-age checks applied before the policy filter.
#[derive(Debug, Clone, Default)]
pub struct SourceFilters {
    /// Keep only these sources. Empty keeps everything.
    pub allowed_sources: Vec<JobSource>,
    /// Drop postings older than this many days, when the age can be read.
    pub max_age_days: Option<u32>,
}

/// Why a job did not pass `SourceFilters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Source,
    Stale,
}

impl SourceFilters {
    /// `board_sources` are the other boards the posting links to. Any allowed one is enough.
    pub fn check(&self, job: &CanonicalJob, board_sources: &[JobSource]) -> Result<(), Rejection> {
        if !self.allowed_sources.is_empty()
            && !std::iter::once(&job.source)
                .chain(board_sources)
                .any(|source| self.allowed_sources.contains(source))
        {
            return Err(Rejection::Source);
        }
        if let Some(max_days) = self.max_age_days {
            if !is_recent(&job.posted_at, max_days) {
                return Err(Rejection::Stale);
            }
        }
        Ok(())
    }
}

/// Reads relative ages like "3 days ago" or "2 weeks ago". Unreadable ages count as recent.
pub fn is_recent(posted_at: &str, max_days: u32) -> bool {
    let posted = posted_at.to_lowercase();
    if posted.is_empty() {
        return true;
    }

    if posted.contains("minute") || posted.contains("hour") || posted.contains("day") {
        true
    } else if posted.contains("week") {
        let weeks: u32 = NUMBER_RE
            .find(&posted)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        weeks.saturating_mul(7) <= max_days
    } else {
        !(posted.contains("month") || posted.contains("year"))
    }
}
