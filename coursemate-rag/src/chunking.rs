//! Page-aware text chunking.
//!
//! Extracted document text loses its true page boundaries, so pages are
//! approximated by apportioning characters evenly across the page count
//! reported by the extractor. Each page segment is then cut into
//! overlapping fixed-size windows by [`FixedSizeChunker`], and windows too
//! short to carry meaning are discarded by [`PageChunker`].
//!
//! All lengths and offsets are measured in characters, never bytes, so a
//! window never splits a multi-byte code point.

use crate::config::RagConfig;
use crate::document::ChunkCandidate;
use crate::error::{RagError, Result};

/// Chunk size used when chunking a single page.
pub const PAGE_CHUNK_SIZE: usize = 800;
/// Overlap used when chunking a single page.
pub const PAGE_CHUNK_OVERLAP: usize = 100;
/// Chunk size for whole-document chunking.
pub const DOCUMENT_CHUNK_SIZE: usize = 1000;
/// Overlap for whole-document chunking.
pub const DOCUMENT_CHUNK_OVERLAP: usize = 200;
/// Trimmed chunks shorter than this many characters are dropped.
pub const MIN_CHUNK_CHARS: usize = 50;

/// Splits text into fixed-size character windows with configurable overlap.
///
/// Window `n` starts at `n * (chunk_size - chunk_overlap)`. The final
/// window may be shorter than `chunk_size`.
///
/// # Example
///
/// ```rust
/// use coursemate_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(4, 1).unwrap();
/// assert_eq!(chunker.split("abcdefg"), vec!["abcd", "defg", "g"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`; either would stop the window from
    /// advancing.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping windows. Empty text yields no windows.
    pub fn split(&self, text: &str) -> Vec<String> {
        let offsets = char_offsets(text);
        let len = offsets.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::with_capacity(len.div_ceil(step));
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            chunks.push(text[offsets[start]..offsets[end]].to_string());
            start += step;
        }
        chunks
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self { chunk_size: DOCUMENT_CHUNK_SIZE, chunk_overlap: DOCUMENT_CHUNK_OVERLAP }
    }
}

/// Split `text` into windows of `chunk_size` characters, each repeating the
/// last `overlap` characters of the previous one.
///
/// # Errors
///
/// Returns [`RagError::Config`] when `chunk_size == 0` or
/// `overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(FixedSizeChunker::new(chunk_size, overlap)?.split(text))
}

/// Apportion `text` to pages by character ratio.
///
/// Page `i` (0-based) covers characters `i*L/P .. (i+1)*L/P` (floored),
/// where `L` is the character length and `P` the page count. A page count
/// of zero is treated as one page. Returns `(page_number, segment)` pairs
/// with 1-based page numbers.
pub fn split_pages(text: &str, total_pages: usize) -> Vec<(usize, &str)> {
    let pages = total_pages.max(1);
    let offsets = char_offsets(text);
    let len = offsets.len() - 1;

    (0..pages)
        .map(|i| {
            let start = i * len / pages;
            let end = (i + 1) * len / pages;
            (i + 1, &text[offsets[start]..offsets[end]])
        })
        .collect()
}

/// Chunks extracted document text page by page.
///
/// Whitespace-only pages are skipped, every window is trimmed, and windows
/// shorter than `min_chunk_chars` after trimming are dropped.
#[derive(Debug, Clone, Copy)]
pub struct PageChunker {
    chunker: FixedSizeChunker,
    min_chunk_chars: usize,
}

impl PageChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_chars: usize) -> Result<Self> {
        Ok(Self { chunker: FixedSizeChunker::new(chunk_size, chunk_overlap)?, min_chunk_chars })
    }

    /// Build a chunker from the page settings in `config`.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.page_chunk_size, config.page_chunk_overlap, config.min_chunk_chars)
    }

    /// Produce the ordered chunk candidates for a whole document.
    pub fn chunk_pages(&self, text: &str, total_pages: usize) -> Vec<ChunkCandidate> {
        let mut candidates = Vec::new();
        for (page_number, page_text) in split_pages(text, total_pages) {
            if page_text.trim().is_empty() {
                continue;
            }
            for window in self.chunker.split(page_text) {
                let trimmed = window.trim();
                if trimmed.chars().count() < self.min_chunk_chars {
                    continue;
                }
                candidates.push(ChunkCandidate { text: trimmed.to_string(), page_number });
            }
        }
        candidates
    }
}

impl Default for PageChunker {
    fn default() -> Self {
        Self {
            chunker: FixedSizeChunker {
                chunk_size: PAGE_CHUNK_SIZE,
                chunk_overlap: PAGE_CHUNK_OVERLAP,
            },
            min_chunk_chars: MIN_CHUNK_CHARS,
        }
    }
}

/// Byte offset of every character plus a trailing `text.len()`.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}
