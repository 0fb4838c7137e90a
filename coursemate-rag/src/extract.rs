//! Text extraction from raw document bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Plain text and page count pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

impl ExtractedText {
    /// Whether the extracted text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Turns raw document bytes into plain text plus a page count.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from `bytes`.
    ///
    /// Failures surface as [`RagError::Extraction`].
    async fn extract(&self, bytes: &[u8]) -> Result<ExtractedText>;
}

/// Extracts UTF-8 text, treating form feeds (`\x0c`) as page breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| RagError::Extraction(format!("document is not valid UTF-8: {e}")))?;
        let page_count = text.split('\x0c').count();
        Ok(ExtractedText { text: text.replace('\x0c', "\n"), page_count })
    }
}

/// Extracts text from PDF files with `pdf-extract`.
///
/// Parsing runs on the blocking thread pool; a panic inside the parser is
/// reported as an extraction error instead of tearing down the caller.
///
/// This type is only available when the `pdf` feature is enabled.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[cfg(feature = "pdf")]
#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        let owned = bytes.to_vec();
        let pages =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&owned))
                .await
                .map_err(|e| RagError::Extraction(format!("PDF parser crashed: {e}")))?
                .map_err(|e| RagError::Extraction(format!("failed to parse PDF: {e}")))?;

        let page_count = pages.len();
        Ok(ExtractedText { text: pages.join("\n\n"), page_count })
    }
}

/// Picks an extractor from the first bytes of the payload.
///
/// `%PDF` payloads go to [`PdfTextExtractor`]; anything else is read as
/// plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingExtractor;

#[async_trait]
impl TextExtractor for SniffingExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        if bytes.starts_with(b"%PDF") {
            #[cfg(feature = "pdf")]
            return PdfTextExtractor.extract(bytes).await;
            #[cfg(not(feature = "pdf"))]
            return Err(RagError::Extraction(
                "PDF support is disabled (enable the `pdf` feature)".to_string(),
            ));
        }
        PlainTextExtractor.extract(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn form_feeds_split_pages() {
        let extracted = PlainTextExtractor.extract(b"page one\x0cpage two\x0cpage three").await;
        let extracted = extracted.unwrap();
        assert_eq!(extracted.page_count, 3);
        assert!(!extracted.text.contains('\x0c'));
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_extraction_error() {
        let err = PlainTextExtractor.extract(&[0xff, 0xfe, 0xfd]).await.unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }

    #[tokio::test]
    async fn whitespace_only_text_is_blank() {
        let extracted = SniffingExtractor.extract(b"  \n\t ").await.unwrap();
        assert!(extracted.is_blank());
    }

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn garbage_pdf_is_an_extraction_error() {
        let err = SniffingExtractor.extract(b"%PDF-1.4 not really a pdf").await.unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }
}
