//! Candidate-feed search client: pulls new candidate tweets from the
//! platform's search RPC and hands each raw payload to the Tweet Normalizer.
//!
//! This module owns pagination and HTTP concerns only; field mapping lives
//! in [`crate::normalize`] so both this collector and the Sheets URL
//! importer share one normalization path.

use serde::Deserialize;
use serde_json::Value;

use crate::error::PostingError;
use crate::retry::{with_backoff, BackoffConfig};

const SEARCH_ENDPOINT: &str = "https://api.twitter.com/2/tweets/search/recent";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_PAGES: u32 = 10;

/// Narrows a search query to candidates worth normalizing.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// The raw query string sent to the search backend.
    pub query: String,
    /// Stop paginating once this many results have been collected.
    pub max_tweets: u32,
    /// Drop results with fewer likes than this before returning them.
    pub min_likes: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    meta: SearchMeta,
}

#[derive(Deserialize, Default)]
struct SearchMeta {
    next_token: Option<String>,
}

/// A thin client over the candidate-feed search endpoint, authenticated with
/// a bearer token.
pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
    backoff: BackoffConfig,
}

impl SearchClient {
    /// Build a client using the given bearer token.
    pub fn new(bearer_token: String) -> Self {
        Self::with_base_url(bearer_token, SEARCH_ENDPOINT.to_string())
    }

    /// Testable sibling of [`SearchClient::new`] with an overridden endpoint.
    pub fn with_base_url(bearer_token: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("search HTTP client must build");
        Self {
            client,
            base_url,
            bearer_token,
            backoff: BackoffConfig::default(),
        }
    }

    async fn fetch_page(
        &self,
        query: &str,
        next_token: Option<&str>,
    ) -> Result<SearchResponse, PostingError> {
        let mut req = self
            .client
            .get(&self.base_url)
            .bearer_auth(&self.bearer_token)
            .query(&[("query", query), ("max_results", "100")]);
        if let Some(token) = next_token {
            req = req.query(&[("next_token", token)]);
        }

        let response = req.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(PostingError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json::<SearchResponse>().await.map_err(Into::into)
    }

    /// Collect raw candidate payloads for `query`, paginating until
    /// `max_tweets` is reached, results run out, or the page cap is hit.
    /// Each returned [`Value`] is ready to pass to
    /// [`crate::normalize::CandidateSource::Api`].
    pub async fn collect(&self, query: &SearchQuery) -> Result<Vec<Value>, PostingError> {
        let mut collected = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            if collected.len() as u32 >= query.max_tweets {
                break;
            }
            let page = with_backoff(self.backoff, "search", || {
                self.fetch_page(&query.query, next_token.as_deref())
            })
            .await?;

            for item in page.data {
                let likes = item
                    .get("public_metrics")
                    .and_then(|m| m.get("like_count"))
                    .and_then(Value::as_u64)
                    .or_else(|| item.get("favorite_count").and_then(Value::as_u64))
                    .unwrap_or(0);
                if likes < query.min_likes {
                    continue;
                }
                collected.push(item);
                if collected.len() as u32 >= query.max_tweets {
                    break;
                }
            }

            match page.meta.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn collect_filters_by_min_likes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "1", "text": "low", "public_metrics": {"like_count": 2}},
                    {"id": "2", "text": "high", "public_metrics": {"like_count": 50}},
                ],
                "meta": {}
            })))
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url("token".to_string(), format!("{}/search", server.uri()));
        let results = client
            .collect(&SearchQuery {
                query: "rust".to_string(),
                max_tweets: 100,
                min_likes: 10,
            })
            .await
            .expect("collect");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], "2");
    }

    #[tokio::test]
    async fn collect_stops_at_max_tweets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "1", "text": "a"},
                    {"id": "2", "text": "b"},
                    {"id": "3", "text": "c"},
                ],
                "meta": {}
            })))
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url("token".to_string(), format!("{}/search", server.uri()));
        let results = client
            .collect(&SearchQuery {
                query: "rust".to_string(),
                max_tweets: 2,
                min_likes: 0,
            })
            .await
            .expect("collect");

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn collect_follows_next_token_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("max_results", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "1", "text": "a"}],
                "meta": {"next_token": "page2"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("next_token", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "2", "text": "b"}],
                "meta": {}
            })))
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url("token".to_string(), format!("{}/search", server.uri()));
        let results = client
            .collect(&SearchQuery {
                query: "rust".to_string(),
                max_tweets: 10,
                min_likes: 0,
            })
            .await
            .expect("collect");

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn rate_limit_response_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429).append_header("retry-after", "5"))
            .mount(&server)
            .await;

        let mut client =
            SearchClient::with_base_url("token".to_string(), format!("{}/search", server.uri()));
        client.backoff = BackoffConfig {
            max_attempts: 1,
            base_delay_secs: 0.001,
        };

        let err = client
            .collect(&SearchQuery {
                query: "rust".to_string(),
                max_tweets: 10,
                min_likes: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PostingError::RateLimited { retry_after: Some(5) }));
    }
}
