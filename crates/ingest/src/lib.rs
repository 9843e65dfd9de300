pub mod fetch;
pub mod html;
pub mod reader;

pub use fetch::UrlFetcher;
pub use html::html_to_text;
pub use reader::{DEFAULT_MAX_FILE_BYTES, DocumentKind, FileReader};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Shown alongside text pulled out of a fetched HTML page
pub const HTML_NOTICE: &str =
    "Note: HTML content fetched. Text extraction may be imperfect. For best results, copy/paste directly.";

/// Where the loaded text came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentSource {
    File { name: String },
    Url { url: String },
    Pasted,
}

/// Extracted document text plus an optional message for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub text: String,
    pub source: DocumentSource,
    pub notice: Option<String>,
}

impl LoadedDocument {
    pub fn pasted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: DocumentSource::Pasted,
            notice: None,
        }
    }
}

/// Load failures. The `Display` text is what the user sees.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Error: {name} is too large (Max {}MB).", format_megabytes(*.limit_mb))]
    TooLarge { name: String, limit_mb: f64 },

    #[error("Error: {name} - Unsupported file type.")]
    UnsupportedType { name: String },

    #[error("Error: {name} - Failed to process. ({detail})")]
    ProcessingFailed { name: String, detail: String },

    #[error("Invalid URL. Please include http:// or https://")]
    InvalidUrl,

    #[error("Failed to load from URL: {detail}. Often due to CORS. Copy/paste recommended.")]
    FetchFailed { detail: String },
}

fn format_megabytes(mb: f64) -> String {
    if mb.fract() == 0.0 {
        format!("{}", mb as u64)
    } else {
        format!("{:.1}", mb)
    }
}

/// Entry point for every way a document can arrive: local file, URL or paste.
pub struct DocumentLoader {
    reader: FileReader,
    fetcher: UrlFetcher,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES, Duration::from_secs(30))
    }
}

impl DocumentLoader {
    pub fn new(max_file_bytes: u64, fetch_timeout: Duration) -> Self {
        Self {
            reader: FileReader::new(max_file_bytes),
            fetcher: UrlFetcher::new(fetch_timeout),
        }
    }

    pub async fn load_file(&self, path: &Path) -> Result<LoadedDocument, LoadError> {
        self.reader.read_file(path).await
    }

    pub async fn load_bytes(&self, name: &str, mime: Option<&str>, bytes: Vec<u8>) -> Result<LoadedDocument, LoadError> {
        self.reader.read_bytes(name, mime, bytes).await
    }

    pub async fn load_url(&self, url: &str) -> Result<LoadedDocument, LoadError> {
        self.fetcher.fetch(url).await
    }

    pub fn reader(&self) -> &FileReader {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let too_large = LoadError::TooLarge { name: "a.pdf".into(), limit_mb: 5.0 };
        assert_eq!(too_large.to_string(), "Error: a.pdf is too large (Max 5MB).");

        let fractional = LoadError::TooLarge { name: "a.pdf".into(), limit_mb: 2.5 };
        assert_eq!(fractional.to_string(), "Error: a.pdf is too large (Max 2.5MB).");

        let failed = LoadError::ProcessingFailed { name: "a.docx".into(), detail: "bad zip".into() };
        assert_eq!(failed.to_string(), "Error: a.docx - Failed to process. (bad zip)");

        let fetch = LoadError::FetchFailed { detail: "Failed to fetch URL: 404 Not Found".into() };
        assert_eq!(
            fetch.to_string(),
            "Failed to load from URL: Failed to fetch URL: 404 Not Found. Often due to CORS. Copy/paste recommended."
        );
    }

    #[test]
    fn test_pasted_document() {
        let doc = LoadedDocument::pasted("hello");
        assert_eq!(doc.source, DocumentSource::Pasted);
        assert!(doc.notice.is_none());
    }

    #[test]
    fn test_default_loader_uses_standard_limit() {
        let loader = DocumentLoader::default();
        assert_eq!(loader.reader.max_bytes(), DEFAULT_MAX_FILE_BYTES);
    }

    #[tokio::test]
    async fn test_loader_respects_configured_limit() {
        let loader = DocumentLoader::new(4, Duration::from_secs(1));
        let err = loader.load_bytes("tiny.txt", None, b"12345".to_vec()).await.unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { .. }));

        let ok = loader.load_bytes("tiny.txt", None, b"1234".to_vec()).await.unwrap();
        assert_eq!(ok.text, "1234");
    }
}
