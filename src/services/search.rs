//! Web search in the browser

use async_trait::async_trait;

use super::WebSearch;
use super::browser::{UrlOpener, fill_template};
use crate::Result;

/// Opens a search results page for the query
pub struct BrowserSearch {
    template: String,
    opener: Box<dyn UrlOpener>,
}

impl BrowserSearch {
    /// Create a search from a URL template with a `{query}` placeholder
    #[must_use]
    pub fn new(template: &str, opener: Box<dyn UrlOpener>) -> Self {
        Self {
            template: template.to_string(),
            opener,
        }
    }
}

#[async_trait(?Send)]
impl WebSearch for BrowserSearch {
    async fn search(&self, query: &str) -> Result<()> {
        let url = fill_template(&self.template, query);
        tracing::info!(query, url = %url, "searching the web");
        self.opener.open(&url)
    }
}
