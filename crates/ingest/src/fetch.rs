use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::LazyLock;
use std::time::Duration;

use crate::{DocumentSource, HTML_NOTICE, LoadError, LoadedDocument, html};

static HTTP_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").expect("url pattern is valid"));

/// Downloads plain-text or HTML documents over HTTP(S)
pub struct UrlFetcher {
    client: Client,
}

impl UrlFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        });
        Self { client }
    }

    pub fn is_http_url(url: &str) -> bool {
        HTTP_URL.is_match(url)
    }

    pub async fn fetch(&self, url: &str) -> Result<LoadedDocument, LoadError> {
        if !Self::is_http_url(url) {
            return Err(LoadError::InvalidUrl);
        }

        tracing::info!(url, "Fetching document");
        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(url, error = %e, "Fetch failed");
            LoadError::FetchFailed { detail: e.to_string() }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "Fetch returned an error status");
            return Err(LoadError::FetchFailed {
                detail: format!(
                    "Failed to fetch URL: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )
                .trim_end()
                .to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let is_html = content_type.contains("text/html");
        if !is_html && !content_type.contains("text/plain") {
            let shown = if content_type.is_empty() { "unknown" } else { content_type.as_str() };
            return Err(LoadError::FetchFailed {
                detail: format!("Unsupported content type: {}", shown),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| LoadError::FetchFailed { detail: e.to_string() })?;

        let source = DocumentSource::Url { url: url.to_string() };
        if is_html {
            let text = html::html_to_text(&body);
            tracing::info!(url, chars = text.chars().count(), "Extracted text from HTML");
            Ok(LoadedDocument {
                text,
                source,
                notice: Some(HTML_NOTICE.to_string()),
            })
        } else {
            Ok(LoadedDocument { text: body, source, notice: None })
        }
    }
}
