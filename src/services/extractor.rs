//! Plain-text extraction for the supported document formats.

use std::path::Path;

use crate::error::ExtractionError;
use crate::models::{Document, DocumentFormat};

/// Extracts plain text from a loaded document.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<String, ExtractionError>;
}

/// Markdown is already text; extraction only decodes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownExtractor;

impl TextExtractor for MarkdownExtractor {
    fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        let text = std::str::from_utf8(&document.bytes).map_err(|_| {
            ExtractionError::InvalidEncoding {
                path: document.path.clone(),
            }
        })?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
    }
}

/// Page-by-page PDF text extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Text of every page in page order. Pages without extractable text
    /// yield an empty string.
    pub fn page_texts(&self, path: &Path, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let pdf_err = |message: String| ExtractionError::Pdf {
            path: path.to_path_buf(),
            message,
        };

        let pdf = lopdf::Document::load_mem(bytes).map_err(|e| pdf_err(e.to_string()))?;
        if pdf.is_encrypted() {
            return Err(pdf_err("document is encrypted".to_string()));
        }

        let pages = pdf.get_pages();
        let texts = pages
            .keys()
            .map(|&page_number| match pdf.extract_text(&[page_number]) {
                // lopdf terminates every text object with a newline.
                Ok(mut text) => {
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    text
                }
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        page = page_number,
                        error = %e,
                        "page has no extractable text"
                    );
                    String::new()
                }
            })
            .collect();

        Ok(texts)
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        let pages = self.page_texts(&document.path, &document.bytes)?;
        Ok(join_pages(pages))
    }
}

/// Concatenate page texts in order, adding no separator.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages.into_iter().collect()
}

/// Extractor for a document format.
pub fn extractor_for(format: DocumentFormat) -> &'static dyn TextExtractor {
    match format {
        DocumentFormat::Markdown => &MarkdownExtractor,
        DocumentFormat::Pdf => &PdfExtractor,
    }
}

/// Extract the plain text of `document` according to its format.
pub fn extract_text(document: &Document) -> Result<String, ExtractionError> {
    extractor_for(document.format).extract(document)
}
