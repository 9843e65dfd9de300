use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;

use crate::{DocumentSource, LoadError, LoadedDocument};

pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

const WORD_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

static WORD_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|</w:p>|<w:tab/>|<w:br/>").expect("word token pattern is valid")
});

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Word,
}

impl DocumentKind {
    /// Detect from a MIME type, refined by the file extension when the MIME is absent or generic.
    pub fn from_mime_and_extension(mime: Option<&str>, extension: Option<&str>) -> Option<Self> {
        let mime = mime.map(|m| m.split(';').next().unwrap_or(m).trim().to_lowercase());
        match mime.as_deref() {
            Some("text/plain") => return Some(Self::PlainText),
            Some("application/pdf") => return Some(Self::Pdf),
            Some(WORD_MIME) => return Some(Self::Word),
            _ => {}
        }

        match extension.map(|e| e.to_lowercase()).as_deref() {
            Some("txt" | "text" | "md") => Some(Self::PlainText),
            Some("pdf") => Some(Self::Pdf),
            Some("docx") => Some(Self::Word),
            _ => None,
        }
    }
}

pub struct FileReader {
    max_bytes: u64,
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl FileReader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Read a local file, checking the size cap before touching its contents
    pub async fn read_file(&self, path: &Path) -> Result<LoadedDocument, LoadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let metadata = fs::metadata(path).await.map_err(|e| LoadError::ProcessingFailed {
            name: name.clone(),
            detail: e.to_string(),
        })?;
        if !metadata.is_file() {
            return Err(LoadError::ProcessingFailed {
                name,
                detail: "not a regular file".to_string(),
            });
        }
        self.check_size(&name, metadata.len())?;

        let bytes = fs::read(path).await.map_err(|e| LoadError::ProcessingFailed {
            name: name.clone(),
            detail: e.to_string(),
        })?;

        self.read_bytes(&name, None, bytes).await
    }

    /// Extract text from in-memory file contents (e.g. an upload)
    pub async fn read_bytes(&self, name: &str, mime: Option<&str>, bytes: Vec<u8>) -> Result<LoadedDocument, LoadError> {
        self.check_size(name, bytes.len() as u64)?;

        let extension = Path::new(name).extension().and_then(|e| e.to_str());
        let kind = DocumentKind::from_mime_and_extension(mime, extension).ok_or_else(|| {
            tracing::warn!(file = name, mime = ?mime, "Rejected unsupported file type");
            LoadError::UnsupportedType { name: name.to_string() }
        })?;

        let text = match kind {
            DocumentKind::PlainText => decode_plain_text(&bytes),
            DocumentKind::Pdf | DocumentKind::Word => {
                let owned_name = name.to_string();
                tokio::task::spawn_blocking(move || match kind {
                    DocumentKind::Pdf => extract_pdf(&bytes),
                    _ => extract_docx(&bytes),
                })
                .await
                .map_err(|e| LoadError::ProcessingFailed {
                    name: owned_name.clone(),
                    detail: e.to_string(),
                })?
                .map_err(|detail| LoadError::ProcessingFailed { name: owned_name, detail })?
            }
        };

        tracing::info!(file = name, kind = ?kind, chars = text.chars().count(), "Loaded document");
        Ok(LoadedDocument {
            text,
            source: DocumentSource::File { name: name.to_string() },
            notice: Some(format!("Successfully loaded: {}.", name)),
        })
    }

    fn check_size(&self, name: &str, len: u64) -> Result<(), LoadError> {
        if len > self.max_bytes {
            tracing::warn!(file = name, bytes = len, max = self.max_bytes, "Rejected oversized file");
            return Err(LoadError::TooLarge {
                name: name.to_string(),
                limit_mb: self.max_bytes as f64 / (1024.0 * 1024.0),
            });
        }
        Ok(())
    }
}

fn decode_plain_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

fn extract_pdf(bytes: &[u8]) -> Result<String, String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map(|text| text.trim().to_string())
        .map_err(|e| e.to_string())
}

/// Raw text of a .docx: runs joined, one blank line between paragraphs.
fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| e.to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;

    let mut text = String::new();
    for caps in WORD_TOKENS.captures_iter(&xml) {
        match caps.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None => match &caps[0] {
                "</w:p>" => text.push_str("\n\n"),
                "<w:tab/>" => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    Ok(text.trim().to_string())
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_default_reader_uses_standard_limit() {
        assert_eq!(FileReader::default().max_bytes(), DEFAULT_MAX_FILE_BYTES);
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(DocumentKind::from_mime_and_extension(Some("text/plain; charset=utf-8"), None), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_mime_and_extension(Some(WORD_MIME), Some("bin")), Some(DocumentKind::Word));
        assert_eq!(DocumentKind::from_mime_and_extension(None, Some("PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_mime_and_extension(Some("application/octet-stream"), Some("docx")), Some(DocumentKind::Word));
        assert_eq!(DocumentKind::from_mime_and_extension(Some("image/png"), Some("png")), None);
        assert_eq!(DocumentKind::from_mime_and_extension(None, None), None);
    }

    #[tokio::test]
    async fn test_exactly_max_size_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "big.txt", &vec![b'a'; DEFAULT_MAX_FILE_BYTES as usize]);

        let doc = FileReader::default().read_file(&path).await.unwrap();
        assert_eq!(doc.text.len(), DEFAULT_MAX_FILE_BYTES as usize);
        assert_eq!(doc.notice.as_deref(), Some("Successfully loaded: big.txt."));
    }

    #[tokio::test]
    async fn test_one_byte_over_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "too-big.txt", &vec![b'a'; DEFAULT_MAX_FILE_BYTES as usize + 1]);

        let err = FileReader::default().read_file(&path).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: too-big.txt is too large (Max 5MB).");
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let err = FileReader::default()
            .read_bytes("chart.png", Some("image/png"), vec![0x89, b'P', b'N', b'G'])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error: chart.png - Unsupported file type.");
    }

    #[tokio::test]
    async fn test_plain_text_strips_bom() {
        let doc = FileReader::default()
            .read_bytes("notes.txt", None, "\u{feff}Revenue was $5,000,000.".as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(doc.text, "Revenue was $5,000,000.");
        assert_eq!(doc.source, DocumentSource::File { name: "notes.txt".into() });
    }

    #[tokio::test]
    async fn test_docx_text() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body>
            <w:p><w:r><w:t>Revenue &amp; profit</w:t></w:r><w:r><w:t xml:space="preserve"> grew.</w:t></w:r></w:p>
            <w:p><w:r><w:t>CEO:</w:t><w:tab/><w:t>Jane Doe</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let doc = FileReader::default()
            .read_bytes("report.docx", None, docx_bytes(xml))
            .await
            .unwrap();
        assert_eq!(doc.text, "Revenue & profit grew.\n\nCEO:\tJane Doe");
    }

    #[tokio::test]
    async fn test_corrupt_pdf_reports_processing_failure() {
        let err = FileReader::default()
            .read_bytes("broken.pdf", Some("application/pdf"), b"not a pdf".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::ProcessingFailed { .. }));
        assert!(err.to_string().starts_with("Error: broken.pdf - Failed to process. ("));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = FileReader::default()
            .read_file(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error: here.txt - Failed to process."));
    }
}
