use crate::job::JobSource;

/// Board domains in match priority order. First hit wins.
const BOARD_DOMAINS: &[(&str, JobSource)] = &[
    ("greenhouse.io", JobSource::Greenhouse),
    ("lever.co", JobSource::Lever),
    ("ashbyhq.com", JobSource::Ashby),
    ("workable.com", JobSource::Workable),
    ("linkedin.com", JobSource::Linkedin),
];

/// Hosts whose first path segment is the company slug.
const COMPANY_PATH_HOSTS: &[&str] = &[
    "boards.greenhouse.io",
    "job-boards.greenhouse.io",
    "jobs.lever.co",
    "jobs.ashbyhq.com",
    "apply.workable.com",
];

pub fn classify_url(url: &str) -> JobSource {
    let url = url.to_lowercase();
    BOARD_DOMAINS
        .iter()
        .find(|(domain, _)| url.contains(domain))
        .map(|(_, source)| *source)
        .unwrap_or(JobSource::Other)
}

/// Board named in a display label such as "via LinkedIn" or an apply button title.
pub fn classify_label(label: &str) -> JobSource {
    let label = label.to_lowercase();
    [
        JobSource::Greenhouse,
        JobSource::Lever,
        JobSource::Ashby,
        JobSource::Workable,
        JobSource::Linkedin,
    ]
    .into_iter()
    .find(|source| label.contains(source.as_str()))
    .unwrap_or(JobSource::Other)
}

pub fn extract_domain(url: &str) -> String {
    url.split("//")
        .nth(1)
        .unwrap_or(url)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .trim_start_matches("www.")
        .to_lowercase()
}

/// Company slug from `https://boards.greenhouse.io/{company}/jobs/...` and friends.
pub fn company_from_board_url(url: &str) -> Option<String> {
    let domain = extract_domain(url);
    if !COMPANY_PATH_HOSTS.contains(&domain.as_str()) {
        return None;
    }

    let path = url.split("//").nth(1).unwrap_or(url);
    path.split(['?', '#'])
        .next()
        .unwrap_or("")
        .split('/')
        .nth(1)
        .filter(|seg| !seg.is_empty())
        .map(|seg| seg.to_string())
}
