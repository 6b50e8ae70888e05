//! Wikipedia summaries
//!
//! Resolves a free-text topic to an article with the search API, then
//! fetches the article summary from the REST API.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::{KnowledgeSource, LookupError};

/// End of a sentence: terminal punctuation followed by whitespace or end of text
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?]["')\]]*(\s+|$)"#).expect("valid regex"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    extract: String,
}

/// Wikipedia-backed knowledge source
pub struct Wikipedia {
    client: reqwest::Client,
    base_url: String,
}

impl Wikipedia {
    /// Wikipedia for a language edition (e.g. "en")
    #[must_use]
    pub fn new(language: &str) -> Self {
        Self::with_base_url(&format!("https://{language}.wikipedia.org"))
    }

    /// Wikipedia-compatible API at an arbitrary base URL
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn resolve_title(&self, topic: &str) -> Result<String, LookupError> {
        let response = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", topic),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(backend)?;

        if !response.status().is_success() {
            return Err(LookupError::Backend(format!(
                "search returned {}",
                response.status()
            )));
        }

        let found: SearchResponse = response.json().await.map_err(backend)?;
        found
            .query
            .search
            .into_iter()
            .next()
            .map(|hit| hit.title)
            .ok_or(LookupError::NotFound)
    }

    async fn fetch_summary(&self, title: &str) -> Result<SummaryResponse, LookupError> {
        let slug = urlencoding::encode(&title.replace(' ', "_")).into_owned();

        let response = self
            .client
            .get(format!("{}/api/rest_v1/page/summary/{slug}", self.base_url))
            .query(&[("redirect", "true")])
            .send()
            .await
            .map_err(backend)?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Err(LookupError::NotFound),
            status if !status.is_success() => Err(LookupError::Backend(format!(
                "summary returned {status}"
            ))),
            _ => response.json().await.map_err(backend),
        }
    }
}

#[async_trait(?Send)]
impl KnowledgeSource for Wikipedia {
    async fn summary(&self, topic: &str, sentences: usize) -> Result<String, LookupError> {
        let title = self.resolve_title(topic).await?;
        tracing::debug!(topic, title, "resolved article");

        let summary = self.fetch_summary(&title).await?;
        if summary.kind == "disambiguation" {
            return Err(LookupError::Ambiguous);
        }
        if summary.extract.trim().is_empty() {
            return Err(LookupError::NotFound);
        }

        Ok(clip_sentences(&summary.extract, sentences))
    }
}

fn backend(e: reqwest::Error) -> LookupError {
    LookupError::Backend(e.to_string())
}

/// Keep the first `count` sentences of `text`
#[must_use]
pub fn clip_sentences(text: &str, count: usize) -> String {
    let text = text.trim();
    if count == 0 {
        return String::new();
    }

    SENTENCE_END
        .find_iter(text)
        .nth(count - 1)
        .map_or(text, |m| &text[..m.end()])
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn mock_search(server: &MockServer, topic: &str, titles: &[&str]) {
        let hits: Vec<_> = titles
            .iter()
            .map(|t| serde_json::json!({ "title": t }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("srsearch", topic))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "query": { "search": hits } })),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_clip_sentences() {
        let text = "Rust is a language. It is fast! Is it safe? Yes.";
        assert_eq!(clip_sentences(text, 2), "Rust is a language. It is fast!");
        assert_eq!(clip_sentences(text, 10), text);
        assert_eq!(clip_sentences("No terminal punctuation", 2), "No terminal punctuation");
        assert_eq!(clip_sentences(text, 0), "");
    }

    #[test]
    fn test_clip_keeps_decimals_together() {
        assert_eq!(
            clip_sentences("Pi is about 3.14 in value. Second sentence.", 1),
            "Pi is about 3.14 in value."
        );
    }

    #[tokio::test]
    async fn test_summary_is_clipped() {
        let server = MockServer::start().await;
        mock_search(&server, "isaac newton", &["Isaac Newton"]).await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Isaac_Newton"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "standard",
                "extract": "Sir Isaac Newton was a mathematician. He was a physicist. He was an astronomer."
            })))
            .mount(&server)
            .await;

        let wiki = Wikipedia::with_base_url(&server.uri());
        let summary = wiki.summary("isaac newton", 2).await.unwrap();

        assert_eq!(
            summary,
            "Sir Isaac Newton was a mathematician. He was a physicist."
        );
    }

    #[tokio::test]
    async fn test_disambiguation_is_ambiguous() {
        let server = MockServer::start().await;
        mock_search(&server, "mercury", &["Mercury"]).await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Mercury"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "disambiguation",
                "extract": "Mercury may refer to:"
            })))
            .mount(&server)
            .await;

        let wiki = Wikipedia::with_base_url(&server.uri());
        assert_eq!(wiki.summary("mercury", 2).await, Err(LookupError::Ambiguous));
    }

    #[tokio::test]
    async fn test_no_search_hits_is_not_found() {
        let server = MockServer::start().await;
        mock_search(&server, "qwzxv", &[]).await;

        let wiki = Wikipedia::with_base_url(&server.uri());
        assert_eq!(wiki.summary("qwzxv", 2).await, Err(LookupError::NotFound));
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found() {
        let server = MockServer::start().await;
        mock_search(&server, "ghost", &["Ghost Page"]).await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Ghost_Page"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let wiki = Wikipedia::with_base_url(&server.uri());
        assert_eq!(wiki.summary("ghost", 2).await, Err(LookupError::NotFound));
    }

    #[tokio::test]
    async fn test_server_error_is_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let wiki = Wikipedia::with_base_url(&server.uri());
        assert!(matches!(
            wiki.summary("anything", 2).await,
            Err(LookupError::Backend(_))
        ));
    }
}
