use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use newscheck_common::{ContextEntry, ContextSet};

// ---------------------------------------------------------------------------
// ContextRetriever: external search for corroborating context
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Search results for `headline`, best first. An empty set is a valid answer.
    async fn retrieve(&self, headline: &str, max_results: usize) -> Result<ContextSet>;
}

// --- Serper (Google Search) ---

const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";

pub struct SerperRetriever {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl SerperRetriever {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: SERPER_SEARCH_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ContextRetriever for SerperRetriever {
    async fn retrieve(&self, headline: &str, max_results: usize) -> Result<ContextSet> {
        info!(max_results, "Serper search");

        let body = serde_json::json!({
            "q": headline,
            "num": max_results,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Serper API returned HTTP {}", resp.status());
        }

        let data: SerperResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;

        let context = into_context(data, max_results);
        info!(count = context.len(), "Serper search complete");
        Ok(context)
    }
}

fn into_context(data: SerperResponse, max_results: usize) -> ContextSet {
    data.organic
        .into_iter()
        .filter(|r| !(r.title.is_empty() && r.snippet.is_empty()))
        .take(max_results)
        .map(|r| {
            let entry = ContextEntry::new(r.title, r.snippet);
            if r.link.is_empty() {
                entry
            } else {
                entry.with_url(r.link)
            }
        })
        .collect()
}

// --- No search configured ---

/// Used when no search key is configured: every headline is uncorroborated.
pub struct NoopRetriever;

#[async_trait]
impl ContextRetriever for NoopRetriever {
    async fn retrieve(&self, _headline: &str, _max_results: usize) -> Result<ContextSet> {
        Ok(ContextSet::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serper_results_become_context_entries() {
        let data: SerperResponse = serde_json::from_str(
            r#"{
                "searchParameters": {"q": "Sube el pan"},
                "organic": [
                    {"title": "Sube el pan", "link": "https://a.example", "snippet": "El precio del pan sube", "position": 1},
                    {"title": "", "snippet": ""},
                    {"title": "Otra", "snippet": "sin enlace"}
                ]
            }"#,
        )
        .unwrap();

        let context = into_context(data, 10);
        assert_eq!(context.len(), 2);
        assert_eq!(context.entries()[0].url.as_deref(), Some("https://a.example"));
        assert_eq!(context.entries()[1].url, None);
    }

    #[test]
    fn results_are_capped() {
        let data: SerperResponse = serde_json::from_str(
            r#"{"organic": [{"title": "a"}, {"title": "b"}, {"title": "c"}]}"#,
        )
        .unwrap();
        assert_eq!(into_context(data, 2).len(), 2);
    }

    #[test]
    fn missing_organic_is_empty() {
        let data: SerperResponse = serde_json::from_str("{}").unwrap();
        assert!(into_context(data, 10).is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let retriever = SerperRetriever::new("key", Duration::from_millis(500))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/search");
        assert!(retriever.retrieve("Titular", 5).await.is_err());
    }

    #[tokio::test]
    async fn noop_returns_nothing() {
        assert!(NoopRetriever.retrieve("Titular", 5).await.unwrap().is_empty());
    }
}
