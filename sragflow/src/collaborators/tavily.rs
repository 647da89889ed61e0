//! Tavily news search client.

use super::{NewsItem, NewsSearch, NewsWindow};
use crate::config::NewsConfig;
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

const NAME: &str = "tavily";

/// Brazilian news domains searched for SRAG coverage.
pub const NEWS_SOURCES: [&str; 3] = [
    "agencia.fiocruz.br",
    "agenciabrasil.ebc.com.br",
    "www.cnnbrasil.com.br",
];

const QUERY: &str = "Relatório de notícias sobre a SRAG Brasil";

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    topic: &'a str,
    search_depth: &'a str,
    max_results: u32,
    include_domains: [&'a str; 1],
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<NewsItem>,
}

/// News search over the Tavily API.
///
/// Each source domain is queried concurrently; the call fails only when
/// every domain request fails.
#[derive(Debug, Clone)]
pub struct TavilySearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: u32,
}

impl TavilySearch {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` without an API key.
    pub fn from_config(config: &NewsConfig, timeout: Duration) -> Result<Self, CollaboratorError> {
        let api_key = config.api_key.clone().ok_or(CollaboratorError::Unavailable {
            collaborator: NAME,
            reason: "TAVILY_API_KEY is not set".to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CollaboratorError::request(NAME, err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            max_results: config.max_results,
        })
    }

    async fn search_domain(
        &self,
        domain: &str,
        window: NewsWindow,
    ) -> Result<Vec<NewsItem>, CollaboratorError> {
        let body = SearchBody {
            query: QUERY,
            topic: "news",
            search_depth: "basic",
            max_results: self.max_results,
            include_domains: [domain],
            start_date: window.start.to_string(),
            end_date: window.end.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CollaboratorError::request(NAME, err.to_string()))?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|err| CollaboratorError::invalid(NAME, err.to_string()))?;
        debug!(domain, results = parsed.results.len(), "News domain searched");
        Ok(parsed.results)
    }
}

#[async_trait]
impl NewsSearch for TavilySearch {
    async fn search(&self, window: NewsWindow) -> Result<Vec<NewsItem>, CollaboratorError> {
        let outcomes = join_all(
            NEWS_SOURCES
                .iter()
                .map(|domain| self.search_domain(domain, window)),
        )
        .await;
        merge_outcomes(outcomes)
    }
}

fn merge_outcomes(
    outcomes: Vec<Result<Vec<NewsItem>, CollaboratorError>>,
) -> Result<Vec<NewsItem>, CollaboratorError> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    let mut last_error = None;
    let mut any_ok = false;

    for outcome in outcomes {
        match outcome {
            Ok(found) => {
                any_ok = true;
                items.extend(found.into_iter().filter(|item| seen.insert(item.url.clone())));
            }
            Err(err) => {
                warn!(error = %err, "News domain search failed");
                last_error = Some(err);
            }
        }
    }

    match (any_ok, last_error) {
        (false, Some(err)) => Err(err),
        _ => Ok(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> NewsItem {
        NewsItem {
            title: "SRAG".to_string(),
            url: url.to_string(),
            ..NewsItem::default()
        }
    }

    #[test]
    fn test_merge_dedupes_by_url() {
        let merged = merge_outcomes(vec![
            Ok(vec![item("https://a"), item("https://b")]),
            Ok(vec![item("https://b"), item("https://c")]),
        ])
        .unwrap();
        let urls: Vec<_> = merged.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
    }

    #[test]
    fn test_merge_tolerates_partial_failure() {
        let merged = merge_outcomes(vec![
            Err(CollaboratorError::request(NAME, "timeout")),
            Ok(vec![item("https://a")]),
        ])
        .unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_fails_when_every_domain_fails() {
        let result = merge_outcomes(vec![
            Err(CollaboratorError::request(NAME, "timeout")),
            Err(CollaboratorError::request(NAME, "500")),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_requires_api_key() {
        let err = TavilySearch::from_config(&NewsConfig::default(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable { .. }));
    }

    #[test]
    fn test_search_body_shape() {
        let body = SearchBody {
            query: QUERY,
            topic: "news",
            search_depth: "basic",
            max_results: 10,
            include_domains: ["agencia.fiocruz.br"],
            start_date: "2024-08-28".to_string(),
            end_date: "2024-09-12".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["topic"], "news");
        assert_eq!(json["include_domains"][0], "agencia.fiocruz.br");
    }
}
