use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::job::ResultKind;

pub const SERPAPI_URL: &str = "https://serpapi.com/search.json";

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("SerpAPI key not configured")]
    NoApiKey,

    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search api error: {0}")]
    Api(String),
}

/// SerpAPI engine to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEngine {
    /// `google_jobs`: listing results in `jobs_results`.
    GoogleJobs,
    /// `google`: web results in `organic_results`.
    Google,
}

impl SearchEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::GoogleJobs => "google_jobs",
            SearchEngine::Google => "google",
        }
    }

    pub fn result_kind(&self) -> ResultKind {
        match self {
            SearchEngine::GoogleJobs => ResultKind::JobEngine,
            SearchEngine::Google => ResultKind::WebSearch,
        }
    }

    fn results_field(&self) -> &'static str {
        match self {
            SearchEngine::GoogleJobs => "jobs_results",
            SearchEngine::Google => "organic_results",
        }
    }
}

/// How consecutive pages are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `start`/`num` offsets, at most `page_size` results per call.
    Offset { page_size: usize },
    /// Opaque `next_page_token` continuation.
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Start,
    Offset(usize),
    Token(String),
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub cursor: PageCursor,
    /// Results wanted from this call. Engines may return fewer.
    pub result_count: usize,
}

#[derive(Debug, Clone)]
pub struct SearchPage {
    pub kind: ResultKind,
    pub items: Vec<Value>,
    /// `None` when the engine has no further pages.
    pub next: Option<PageCursor>,
}

#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Largest `result_count` worth asking for in one call.
    fn page_size(&self) -> usize;

    async fn fetch_page(&self, request: &SearchRequest) -> Result<SearchPage, SearchError>;
}

#[derive(Debug, Default, Deserialize)]
struct SerpPagination {
    next: Option<String>,
    next_page_token: Option<String>,
}

/// SerpAPI over plain HTTP.
pub struct SerpApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    engine: SearchEngine,
    pagination: Pagination,
    extra_params: Vec<(String, String)>,
}

impl SerpApiClient {
    pub fn new(api_key: &str, engine: SearchEngine, pagination: Pagination) -> Result<Self, SearchError> {
        if api_key.trim().is_empty() {
            return Err(SearchError::NoApiKey);
        }
        Ok(Self {
            client: Client::new(),
            base_url: SERPAPI_URL.to_string(),
            api_key: api_key.trim().to_string(),
            engine,
            pagination,
            extra_params: Vec::new(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Engine-specific filters passed through verbatim, e.g. `date_posted=month`.
    pub fn with_params(mut self, params: &[(String, String)]) -> Self {
        self.extra_params.extend_from_slice(params);
        self
    }

    fn query_params(&self, request: &SearchRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("engine".to_string(), self.engine.as_str().to_string()),
            ("q".to_string(), request.query.clone()),
            ("api_key".to_string(), self.api_key.clone()),
        ];
        params.extend(self.extra_params.iter().cloned());

        match (&self.pagination, &request.cursor) {
            (_, PageCursor::Token(token)) => {
                params.push(("next_page_token".to_string(), token.clone()));
            }
            (Pagination::Offset { .. }, cursor) => {
                let start = match cursor {
                    PageCursor::Offset(n) => *n,
                    _ => 0,
                };
                params.push(("start".to_string(), start.to_string()));
                params.push(("num".to_string(), request.result_count.to_string()));
            }
            (Pagination::Token, _) => {}
        }
        params
    }

    async fn get_with_retry(&self, params: &[(String, String)]) -> Result<Value, SearchError> {
        let mut attempt = 0;
        loop {
            let resp = self.client.get(&self.base_url).query(params).send().await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp.json().await?);
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !retryable || attempt == MAX_RETRIES {
                let body = resp.text().await.unwrap_or_default();
                return Err(SearchError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "SerpAPI returned {} (attempt {}/{}), backing off {:.1}s",
                status,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    fn parse_page(&self, request: &SearchRequest, body: Value) -> Result<SearchPage, SearchError> {
        let kind = self.engine.result_kind();

        if let Some(message) = body.get("error").and_then(|e| e.as_str()) {
            // SerpAPI reports an exhausted query as an error string.
            if message.contains("hasn't returned any results") {
                debug!("No results: {}", message);
                return Ok(SearchPage {
                    kind,
                    items: Vec::new(),
                    next: None,
                });
            }
            return Err(SearchError::Api(message.to_string()));
        }

        let items: Vec<Value> = body
            .get(self.engine.results_field())
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let pagination: SerpPagination = body
            .get("serpapi_pagination")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let next = if items.is_empty() {
            None
        } else {
            match self.pagination {
                Pagination::Offset { .. } => {
                    let start = match request.cursor {
                        PageCursor::Offset(n) => n,
                        _ => 0,
                    };
                    // Web search says when it runs out; the jobs engine does not.
                    let exhausted = self.engine == SearchEngine::Google && pagination.next.is_none();
                    (!exhausted).then(|| PageCursor::Offset(start + items.len()))
                }
                Pagination::Token => pagination
                    .next_page_token
                    .filter(|t| !t.is_empty())
                    .map(PageCursor::Token),
            }
        };

        Ok(SearchPage { kind, items, next })
    }
}

#[async_trait]
impl SearchSource for SerpApiClient {
    fn page_size(&self) -> usize {
        match self.pagination {
            Pagination::Offset { page_size } => page_size.max(1),
            // Token pages are fixed-size on the engine side.
            Pagination::Token => 10,
        }
    }

    async fn fetch_page(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let params = self.query_params(request);
        debug!(engine = self.engine.as_str(), cursor = ?request.cursor, "Fetching search page");
        let body = self.get_with_retry(&params).await?;
        self.parse_page(request, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request(cursor: PageCursor) -> SearchRequest {
        SearchRequest {
            query: "product designer remote".into(),
            cursor,
            result_count: 10,
        }
    }

    fn jobs_client(pagination: Pagination) -> SerpApiClient {
        SerpApiClient::new("key", SearchEngine::GoogleJobs, pagination).unwrap()
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(matches!(
            SerpApiClient::new(" ", SearchEngine::Google, Pagination::Token),
            Err(SearchError::NoApiKey)
        ));
    }

    #[test]
    fn offset_params() {
        let client = jobs_client(Pagination::Offset { page_size: 10 })
            .with_params(&[("date_posted".into(), "month".into())]);
        let params = client.query_params(&request(PageCursor::Offset(20)));
        assert!(params.contains(&("engine".into(), "google_jobs".into())));
        assert!(params.contains(&("start".into(), "20".into())));
        assert!(params.contains(&("num".into(), "10".into())));
        assert!(params.contains(&("date_posted".into(), "month".into())));
    }

    #[test]
    fn token_params() {
        let client = jobs_client(Pagination::Token);
        let first = client.query_params(&request(PageCursor::Start));
        assert!(!first.iter().any(|(k, _)| k == "next_page_token" || k == "start"));

        let next = client.query_params(&request(PageCursor::Token("abc".into())));
        assert!(next.contains(&("next_page_token".into(), "abc".into())));
    }

    #[test]
    fn token_page_follows_next_page_token() {
        let client = jobs_client(Pagination::Token);
        let page = client
            .parse_page(
                &request(PageCursor::Start),
                json!({
                    "jobs_results": [{ "title": "Designer" }, { "title": "Writer" }],
                    "serpapi_pagination": { "next_page_token": "tok-2" }
                }),
            )
            .unwrap();
        assert_eq!(page.kind, ResultKind::JobEngine);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next, Some(PageCursor::Token("tok-2".into())));

        let last = client
            .parse_page(&request(PageCursor::Token("tok-2".into())), json!({ "jobs_results": [{}] }))
            .unwrap();
        assert_eq!(last.next, None);
    }

    #[test]
    fn offset_page_advances_by_items_returned() {
        let client = jobs_client(Pagination::Offset { page_size: 10 });
        let page = client
            .parse_page(&request(PageCursor::Offset(10)), json!({ "jobs_results": [{}, {}, {}] }))
            .unwrap();
        assert_eq!(page.next, Some(PageCursor::Offset(13)));
    }

    #[test]
    fn web_search_stops_without_next_link() {
        let client = SerpApiClient::new("key", SearchEngine::Google, Pagination::Offset { page_size: 10 })
            .unwrap();
        let page = client
            .parse_page(
                &request(PageCursor::Start),
                json!({ "organic_results": [{ "title": "a", "link": "https://jobs.lever.co/a/1" }] }),
            )
            .unwrap();
        assert_eq!(page.kind, ResultKind::WebSearch);
        assert_eq!(page.next, None);

        let more = client
            .parse_page(
                &request(PageCursor::Start),
                json!({
                    "organic_results": [{ "title": "a" }],
                    "serpapi_pagination": { "next": "https://serpapi.com/search?start=10" }
                }),
            )
            .unwrap();
        assert_eq!(more.next, Some(PageCursor::Offset(1)));
    }

    #[test]
    fn exhausted_query_is_an_empty_last_page() {
        let client = jobs_client(Pagination::Token);
        let page = client
            .parse_page(
                &request(PageCursor::Start),
                json!({ "error": "Google hasn't returned any results for this query." }),
            )
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next, None);

        let err = client
            .parse_page(&request(PageCursor::Start), json!({ "error": "Invalid API key." }))
            .unwrap_err();
        assert!(matches!(err, SearchError::Api(_)));
    }

    #[tokio::test]
    async fn fetches_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/search\.json".into()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("engine".into(), "google_jobs".into()),
                Matcher::UrlEncoded("q".into(), "product designer remote".into()),
                Matcher::UrlEncoded("api_key".into(), "key".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"jobs_results":[{"title":"Designer"}],"serpapi_pagination":{"next_page_token":"t"}}"#)
            .create_async()
            .await;

        let client = jobs_client(Pagination::Token).with_base_url(format!("{}/search.json", server.url()));
        let page = client.fetch_page(&request(PageCursor::Start)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next, Some(PageCursor::Token("t".into())));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/search\.json".into()))
            .with_status(401)
            .with_body("unauthorized")
            .expect(1)
            .create_async()
            .await;

        let client = jobs_client(Pagination::Token).with_base_url(format!("{}/search.json", server.url()));
        let err = client.fetch_page(&request(PageCursor::Start)).await.unwrap_err();
        mock.assert_async().await;
        assert!(matches!(err, SearchError::Status { status: 401, .. }));
    }
}
