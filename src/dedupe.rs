use std::collections::HashSet;

use crate::job::{identity_key, CanonicalJob};
use crate::store::StoredJob;

/// URLs and `company|title` keys of every job recorded so far in this run.
///
/// Built from the persisted table at the start of a run and grown as jobs are
/// accepted, so a batch never emits the same job twice.
#[derive(Debug, Default)]
pub struct KnownJobIndex {
    urls: HashSet<String>,
    company_title_keys: HashSet<String>,
}

impl KnownJobIndex {
    pub fn from_stored(rows: &[StoredJob]) -> Self {
        let mut index = Self::default();
        for row in rows {
            index.insert(&row.url, &row.company, &row.title);
        }
        index
    }

    /// Either a known URL or a known company/title pair is enough.
    pub fn is_duplicate(&self, job: &CanonicalJob) -> bool {
        (!job.url.is_empty() && self.urls.contains(&job.url))
            || self.company_title_keys.contains(&job.identity_key())
    }

    pub fn register(&mut self, job: &CanonicalJob) {
        self.insert(&job.url, &job.company, &job.title);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.company_title_keys.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.company_title_keys.is_empty()
    }

    fn insert(&mut self, url: &str, company: &str, title: &str) {
        if !url.is_empty() {
            self.urls.insert(url.to_string());
        }
        self.company_title_keys.insert(identity_key(company, title));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobSource, JobStatus};

    fn job(company: &str, title: &str, url: &str) -> CanonicalJob {
        CanonicalJob {
            title: title.into(),
            company: company.into(),
            location: "Remote".into(),
            url: url.into(),
            source: JobSource::Other,
            posted_at: String::new(),
            schedule_type: String::new(),
            scraped_at: chrono::Utc::now(),
            status: JobStatus::ReviewRequired,
            policy_flag: false,
        }
    }

    fn stored(company: &str, title: &str, url: &str) -> StoredJob {
        StoredJob {
            title: title.into(),
            company: company.into(),
            url: url.into(),
        }
    }

    #[test]
    fn known_url_is_duplicate_regardless_of_identity() {
        let index = KnownJobIndex::from_stored(&[stored("Acme", "Designer", "https://acme.com/j/1")]);
        assert!(index.is_duplicate(&job("Other Co", "Engineer", "https://acme.com/j/1")));
    }

    #[test]
    fn company_title_match_is_case_insensitive() {
        let index = KnownJobIndex::from_stored(&[stored("ACME", "designer", "https://acme.com/j/1")]);
        assert!(index.is_duplicate(&job("Acme", "Designer", "https://acme.com/j/2")));
        assert!(!index.is_duplicate(&job("Acme", "Designer II", "https://acme.com/j/3")));
    }

    #[test]
    fn empty_urls_never_match_each_other() {
        let index = KnownJobIndex::from_stored(&[stored("Acme", "Designer", "")]);
        assert!(!index.is_duplicate(&job("Beta", "Engineer", "")));
    }

    #[test]
    fn registered_jobs_are_caught_in_the_same_batch() {
        let mut index = KnownJobIndex::default();
        assert!(index.is_empty());

        let first = job("Acme", "Designer", "https://acme.com/j/1");
        assert!(!index.is_duplicate(&first));
        index.register(&first);

        assert!(index.is_duplicate(&job("acme", "DESIGNER", "https://acme.com/j/2")));
        assert!(index.is_duplicate(&job("Beta", "Writer", "https://acme.com/j/1")));
        assert_eq!(index.len(), 1);
    }
}
