use super::source::{classify_label, classify_url};
use super::{default_location, NormalizeContext};
use crate::job::{CanonicalJob, JobEngineResult, JobSource, JobStatus};

pub fn normalize(result: &JobEngineResult, ctx: &NormalizeContext) -> Option<CanonicalJob> {
    let url = canonical_url(result)?;

    Some(CanonicalJob {
        title: result.title.trim().to_string(),
        company: result.company_name.trim().to_string(),
        location: default_location(&result.location, ctx),
        source: match classify_url(&url) {
            JobSource::Other => classify_label(&result.via),
            source => source,
        },
        url,
        posted_at: result.detected_extensions.posted_at.trim().to_string(),
        schedule_type: result.detected_extensions.schedule_type.trim().to_string(),
        scraped_at: chrono::Utc::now(),
        status: JobStatus::ReviewRequired,
        policy_flag: false,
    })
}

/// First apply option, then the share link, then the first related link.
fn canonical_url(result: &JobEngineResult) -> Option<String> {
    let apply = result.apply_options.first().map(|o| o.link.as_str());
    let related = result.related_links.first().map(|l| l.link.as_str());

    [apply, Some(result.share_url.as_str()), related]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|u| !u.is_empty())
        .map(str::to_string)
}

/// Every board this posting is reachable through: each apply option, the share
/// link, related links and the `via` label. Other is left out.
pub fn board_sources(result: &JobEngineResult) -> Vec<JobSource> {
    let apply = result.apply_options.iter().map(|o| match classify_url(&o.link) {
        JobSource::Other => classify_label(&o.title),
        source => source,
    });
    let related = result.related_links.iter().map(|l| classify_url(&l.link));

    let mut sources = Vec::new();
    for source in apply
        .chain([classify_url(&result.share_url)])
        .chain(related)
        .chain([classify_label(&result.via)])
    {
        if source != JobSource::Other && !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ApplyOption, DetectedExtensions, JobSource, RelatedLink};

    fn ctx() -> NormalizeContext {
        NormalizeContext { remote_query: true }
    }

    #[test]
    fn prefers_apply_option_link() {
        let result = JobEngineResult {
            title: "Product Designer".into(),
            company_name: "Acme".into(),
            location: "  New York, NY ".into(),
            share_url: "https://www.google.com/search?share=1".into(),
            apply_options: vec![ApplyOption {
                title: "Greenhouse".into(),
                link: "https://boards.greenhouse.io/acme/jobs/1".into(),
            }],
            detected_extensions: DetectedExtensions {
                posted_at: "2 days ago".into(),
                schedule_type: "Full-time".into(),
            },
            ..Default::default()
        };

        let job = normalize(&result, &ctx()).unwrap();
        assert_eq!(job.url, "https://boards.greenhouse.io/acme/jobs/1");
        assert_eq!(job.source, JobSource::Greenhouse);
        assert_eq!(job.company, "Acme");
        assert_eq!(job.location, "New York, NY");
        assert_eq!(job.posted_at, "2 days ago");
        assert_eq!(job.schedule_type, "Full-time");
        assert_eq!(job.status, JobStatus::ReviewRequired);
        assert!(!job.policy_flag);
    }

    #[test]
    fn falls_back_to_share_url_then_related_link() {
        let mut result = JobEngineResult {
            title: "Designer".into(),
            company_name: "Acme".into(),
            share_url: "https://acme.com/j/1".into(),
            related_links: vec![RelatedLink {
                link: "https://jobs.lever.co/acme/7".into(),
            }],
            ..Default::default()
        };
        assert_eq!(normalize(&result, &ctx()).unwrap().url, "https://acme.com/j/1");

        result.share_url.clear();
        let job = normalize(&result, &ctx()).unwrap();
        assert_eq!(job.url, "https://jobs.lever.co/acme/7");
        assert_eq!(job.source, JobSource::Lever);
    }

    #[test]
    fn no_url_is_dropped() {
        let result = JobEngineResult {
            title: "Designer".into(),
            company_name: "Acme".into(),
            apply_options: vec![ApplyOption::default()],
            ..Default::default()
        };
        assert!(normalize(&result, &ctx()).is_none());
    }

    #[test]
    fn missing_location_defaults_to_remote() {
        let result = JobEngineResult {
            title: "Designer".into(),
            share_url: "https://acme.com/j/1".into(),
            ..Default::default()
        };
        assert_eq!(normalize(&result, &ctx()).unwrap().location, "Remote");
    }

    #[test]
    fn via_label_names_source_for_unknown_links() {
        let result = JobEngineResult {
            title: "Designer".into(),
            via: "via LinkedIn".into(),
            share_url: "https://www.google.com/search?ibp=htl;jobs".into(),
            ..Default::default()
        };
        assert_eq!(normalize(&result, &ctx()).unwrap().source, JobSource::Linkedin);
    }

    #[test]
    fn board_sources_cover_every_link() {
        let result = JobEngineResult {
            via: "via Indeed".into(),
            share_url: "https://www.google.com/search?share=1".into(),
            apply_options: vec![
                ApplyOption {
                    title: "Indeed".into(),
                    link: "https://www.indeed.com/viewjob?jk=1".into(),
                },
                ApplyOption {
                    title: "Greenhouse".into(),
                    link: "https://boards.greenhouse.io/acme/jobs/1".into(),
                },
                ApplyOption {
                    title: "Ashby".into(),
                    link: "https://careers.acme.com/apply".into(),
                },
            ],
            related_links: vec![
                RelatedLink {
                    link: "https://jobs.lever.co/acme/7".into(),
                },
                RelatedLink {
                    link: "https://boards.greenhouse.io/acme".into(),
                },
            ],
            ..Default::default()
        };

        assert_eq!(normalize(&result, &ctx()).unwrap().source, JobSource::Other);
        assert_eq!(
            board_sources(&result),
            vec![JobSource::Greenhouse, JobSource::Ashby, JobSource::Lever]
        );
    }
}
