use std::sync::LazyLock;

use regex::Regex;

use super::source::{classify_url, company_from_board_url};
use super::{default_location, NormalizeContext, UNKNOWN_COMPANY};
use crate::job::{CanonicalJob, JobStatus, WebSearchResult};

static SITE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[|\-–]\s*(linkedin|greenhouse|lever|ashby|workable|indeed)\s*$").unwrap()
});
static APPLY_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(job application for|apply for)\s+").unwrap());
static HIRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+hiring\s+(.+?)(?:\s+in\s+.+)?$").unwrap());
static AT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\s+at\s+(.+)$").unwrap());
static DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\s+[-–]\s+(.+)$").unwrap());

pub fn normalize(result: &WebSearchResult, ctx: &NormalizeContext) -> Option<CanonicalJob> {
    let url = result.link.trim();
    if url.is_empty() {
        return None;
    }

    let (title, title_company) = split_title(&result.title);
    let company = company_from_board_url(url)
        .or(title_company)
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());

    Some(CanonicalJob {
        title,
        company,
        location: default_location("", ctx),
        url: url.to_string(),
        source: classify_url(url),
        posted_at: result.date.trim().to_string(),
        schedule_type: String::new(),
        scraped_at: chrono::Utc::now(),
        status: JobStatus::ReviewRequired,
        policy_flag: false,
    })
}

/// Split a search-result title into (job title, company) when the title carries one.
///
/// Handles `"Acme hiring Designer in Remote"`, `"Designer at Acme"` and `"Designer - Acme"`,
/// after dropping site suffixes like `" | LinkedIn"` and `"Job Application for "` prefixes.
pub fn split_title(raw: &str) -> (String, Option<String>) {
    let cleaned = SITE_SUFFIX_RE.replace(raw.trim(), "");
    let cleaned = APPLY_PREFIX_RE.replace(&cleaned, "");
    let cleaned = cleaned.trim();

    for re in [&*AT_RE, &*DASH_RE] {
        if let Some(caps) = re.captures(cleaned) {
            return (caps[1].trim().to_string(), Some(caps[2].trim().to_string()));
        }
    }
    if let Some(caps) = HIRING_RE.captures(cleaned) {
        return (caps[2].trim().to_string(), Some(caps[1].trim().to_string()));
    }

    (cleaned.to_string(), None)
}
