pub mod engine;
pub mod source;
pub mod web;

use crate::job::{CanonicalJob, JobSource, RawResult};

pub const REMOTE_LOCATION: &str = "Remote";
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// Per-run facts the normalizers need beyond the raw item.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    /// Query targets remote roles, so a missing location means "Remote".
    pub remote_query: bool,
}

impl NormalizeContext {
    pub fn for_query(query: &str) -> Self {
        Self {
            remote_query: query.to_lowercase().contains("remote"),
        }
    }
}

/// Raw search hit → canonical job. `None` when no usable URL exists.
pub fn normalize(raw: &RawResult, ctx: &NormalizeContext) -> Option<CanonicalJob> {
    match raw {
        RawResult::JobEngine(r) => engine::normalize(r, ctx),
        RawResult::WebSearch(r) => web::normalize(r, ctx),
    }
}

/// Job boards the raw hit links to, beyond its canonical URL.
pub fn board_sources(raw: &RawResult) -> Vec<JobSource> {
    match raw {
        RawResult::JobEngine(r) => engine::board_sources(r),
        RawResult::WebSearch(r) => match source::classify_url(&r.link) {
            JobSource::Other => Vec::new(),
            source => vec![source],
        },
    }
}

fn default_location(location: &str, ctx: &NormalizeContext) -> String {
    let location = location.trim();
    if location.is_empty() && ctx.remote_query {
        REMOTE_LOCATION.to_string()
    } else {
        location.to_string()
    }
}
