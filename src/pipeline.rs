use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ScrapeProfile;
use crate::dedupe::KnownJobIndex;
use crate::filters::{Rejection, SourceFilters};
use crate::job::{CanonicalJob, RawResult, ResultKind};
use crate::normalize::{board_sources, normalize, NormalizeContext};
use crate::policy::{is_policy_excluded, PolicyMode};
use crate::search::{PageCursor, SearchPage, SearchRequest, SearchSource};
use crate::store::{JobStore, StoreError};

/// Knobs for a single scraper run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub query: String,
    pub total_results: usize,
    pub delay: Duration,
    pub filters: SourceFilters,
    pub policy_mode: PolicyMode,
}

impl RunOptions {
    pub fn from_profile(profile: &ScrapeProfile, policy_mode: PolicyMode) -> Self {
        Self {
            query: profile.query.clone(),
            total_results: profile.total_results,
            delay: profile.delay,
            filters: profile.filters.clone(),
            policy_mode,
        }
    }
}

/// Outcome of one run. `totalFetched` and `newJobsAdded` are the stable contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub success: bool,
    pub total_fetched: usize,
    pub new_jobs_added: usize,
    pub pages: usize,
    pub malformed: usize,
    pub missing_url: usize,
    pub filtered_out: usize,
    pub policy_excluded: usize,
    pub policy_flagged: usize,
    pub duplicates: usize,
}

/// Load known jobs → fetch pages → normalize, filter, dedupe → append once.
///
/// Store errors are fatal, except an uninitialized table which reads as empty.
/// A failing search page ends fetching but keeps what was already gathered.
pub async fn run(
    search: &dyn SearchSource,
    store: &dyn JobStore,
    opts: &RunOptions,
    progress: &ProgressBar,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    info!("Fetching existing jobs from store...");
    let mut index = load_index(store).await?;

    let raw = fetch_all(search, opts, progress, &mut summary).await;
    summary.total_fetched = raw.len();
    info!("Total jobs fetched: {}", raw.len());

    let ctx = NormalizeContext::for_query(&opts.query);
    let new_jobs = process_batch(raw, &ctx, opts, &mut index, &mut summary);
    summary.new_jobs_added = new_jobs.len();
    info!("New unique jobs found: {}", new_jobs.len());

    if new_jobs.is_empty() {
        info!("No new jobs to add");
    } else {
        progress.set_message(format!("appending {} jobs", new_jobs.len()));
        store
            .append_rows(&new_jobs)
            .await
            .context("Failed to append new jobs")?;
        info!("Appended {} jobs", new_jobs.len());
    }

    summary.success = true;
    Ok(summary)
}

async fn load_index(store: &dyn JobStore) -> Result<KnownJobIndex> {
    match store.read_all().await {
        Ok(rows) => {
            info!("Found {} existing jobs", rows.len());
            Ok(KnownJobIndex::from_stored(&rows))
        }
        Err(StoreError::Uninitialized(msg)) => {
            info!("Job table is empty ({}), starting fresh", msg);
            Ok(KnownJobIndex::default())
        }
        Err(e) => Err(e).context("Failed to read existing jobs"),
    }
}

async fn fetch_all(
    search: &dyn SearchSource,
    opts: &RunOptions,
    progress: &ProgressBar,
    summary: &mut RunSummary,
) -> Vec<(ResultKind, Value)> {
    let mut raw = Vec::new();
    let mut cursor = PageCursor::Start;

    while raw.len() < opts.total_results {
        if summary.pages > 0 {
            debug!("Waiting {}ms before next request", opts.delay.as_millis());
            tokio::time::sleep(opts.delay).await;
        }

        let remaining = opts.total_results - raw.len();
        let request = SearchRequest {
            query: opts.query.clone(),
            cursor: cursor.clone(),
            result_count: remaining.min(search.page_size()),
        };
        progress.set_message(format!("page {} ({} results so far)", summary.pages + 1, raw.len()));

        let SearchPage { kind, items, next } = match search.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Fetch of page {} failed, keeping {} results: {}", summary.pages + 1, raw.len(), e);
                break;
            }
        };
        summary.pages += 1;

        let got = items.len();
        raw.extend(items.into_iter().take(remaining).map(|item| (kind, item)));
        progress.inc(got.min(remaining) as u64);
        info!("Fetched {} jobs (total: {})", got.min(remaining), raw.len());

        match next {
            Some(next) if got > 0 => cursor = next,
            _ => {
                info!("No more pages available");
                break;
            }
        }
    }

    raw
}

/// Per-record stage, in fetch order. Accepted jobs are registered before the next record.
fn process_batch(
    raw: Vec<(ResultKind, Value)>,
    ctx: &NormalizeContext,
    opts: &RunOptions,
    index: &mut KnownJobIndex,
    summary: &mut RunSummary,
) -> Vec<CanonicalJob> {
    let mut accepted = Vec::new();

    for (kind, value) in raw {
        let raw = match RawResult::parse(kind, value) {
            Ok(r) => r,
            Err(e) => {
                debug!("Dropping malformed result: {}", e);
                summary.malformed += 1;
                continue;
            }
        };

        let Some(mut job) = normalize(&raw, ctx) else {
            debug!("Dropping result without URL: {}", raw.title());
            summary.missing_url += 1;
            continue;
        };

        if let Err(reason) = opts.filters.check(&job, &board_sources(&raw)) {
            match reason {
                Rejection::Source => debug!("Filtered out (source {}): {}", job.source, job.title),
                Rejection::Stale => debug!("Filtered out (posted {}): {}", job.posted_at, job.title),
            }
            summary.filtered_out += 1;
            continue;
        }

        if is_policy_excluded(&job.title, raw.description()) {
            match opts.policy_mode {
                PolicyMode::Drop => {
                    info!("Filtered out (no AI): {} at {}", job.title, job.company);
                    summary.policy_excluded += 1;
                    continue;
                }
                PolicyMode::Flag => {
                    info!("Flagged (no AI): {} at {}", job.title, job.company);
                    job.policy_flag = true;
                }
            }
        }

        if index.is_duplicate(&job) {
            debug!("Duplicate: {} at {}", job.title, job.company);
            summary.duplicates += 1;
            continue;
        }

        if job.policy_flag {
            summary.policy_flagged += 1;
        }
        index.register(&job);
        accepted.push(job);
    }

    accepted
}
