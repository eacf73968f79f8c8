//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and its implementations:
//!
//! - [`WordChunker`]: fixed windows of whitespace-delimited words, no overlap
//! - [`RecursiveChunker`]: character windows that prefer paragraph, line,
//!   sentence, then word boundaries, with overlap
//! - [`Cleaned`]: wraps another chunker and runs [`clean_text`] on every chunk

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RagError, Result};

/// A strategy for splitting document text into retrieval units.
///
/// Returned chunks are in document order. Empty text yields an empty `Vec`.
pub trait Chunker: Send + Sync {
    /// Split text into chunks.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text into windows of at most `chunk_size` whitespace-delimited words.
///
/// Words are rejoined with single spaces, so the chunks of a text, joined with
/// spaces, equal the text's whitespace-normalized word sequence.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunker, WordChunker};
///
/// let chunker = WordChunker::new(2).unwrap();
/// assert_eq!(chunker.chunk("w1 w2 w3 w4 w5"), vec!["w1 w2", "w3 w4", "w5"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WordChunker {
    chunk_size: usize,
}

impl WordChunker {
    /// Create a `WordChunker` producing windows of `chunk_size` words.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ChunkingError("chunk_size must be a positive word count".into()));
        }
        Ok(Self { chunk_size })
    }

    /// The configured window size in words.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Chunker for WordChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words.chunks(self.chunk_size).map(|window| window.join(" ")).collect()
    }
}

/// Chunk `text` into windows of `chunk_size` words.
///
/// # Errors
///
/// Returns [`RagError::ChunkingError`] if `chunk_size` is zero.
pub fn chunk_words(text: &str, chunk_size: usize) -> Result<Vec<String>> {
    Ok(WordChunker::new(chunk_size)?.chunk(text))
}

/// Separators tried in order, coarsest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Splits text hierarchically into character windows.
///
/// Text is split on the coarsest separator present; pieces that still exceed
/// `chunk_size` are split again with the next separator, and words longer than
/// `chunk_size` are cut at character boundaries. Adjacent pieces are merged up
/// to `chunk_size` characters, carrying up to `chunk_overlap` characters of the
/// previous chunk into the next. Chunks are trimmed and never empty.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of characters shared between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ChunkingError("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ChunkingError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        split_recursive(text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let Some(position) = separators.iter().position(|sep| text.contains(sep)) else {
        return split_by_chars(text, chunk_size, chunk_overlap);
    };
    let remaining = &separators[position + 1..];

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separators[position]) {
        if char_len(piece) <= chunk_size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));
            fitting.clear();
        }
        chunks.extend(split_recursive(piece, chunk_size, chunk_overlap, remaining));
    }

    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Merge pieces no longer than `chunk_size` into windows of at most
/// `chunk_size` characters, keeping a tail of at most `chunk_overlap`.
fn merge_pieces(pieces: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        let len = char_len(piece);
        if total + len > chunk_size && !window.is_empty() {
            chunks.push(window.iter().map(|(p, _)| *p).collect::<String>());
            while total > chunk_overlap || (total > 0 && total + len > chunk_size) {
                let Some((_, front)) = window.pop_front() else { break };
                total -= front;
            }
        }
        window.push_back((piece, len));
        total += len;
    }

    if !window.is_empty() {
        chunks.push(window.iter().map(|(p, _)| *p).collect::<String>());
    }

    chunks
}

/// Character-window splitting with overlap, for text without usable separators.
fn split_by_chars(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

static MARKER_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<pad>|<EOS>").expect("marker pattern is a valid regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

/// Remove `<pad>` and `<EOS>` markers and collapse whitespace runs.
///
/// Idempotent: cleaning already-clean text returns it unchanged.
///
/// ```rust
/// assert_eq!(docqa_rag::clean_text("Text <pad> with <EOS> tokens."), "Text with tokens.");
/// ```
pub fn clean_text(text: &str) -> String {
    let without_markers = MARKER_TOKENS.replace_all(text, " ");
    WHITESPACE_RUN.replace_all(&without_markers, " ").trim().to_string()
}

/// Runs [`clean_text`] over the output of another chunker, dropping chunks
/// that clean to nothing.
#[derive(Debug, Clone, Copy)]
pub struct Cleaned<C>(pub C);

impl<C: Chunker> Chunker for Cleaned<C> {
    fn chunk(&self, text: &str) -> Vec<String> {
        self.0.chunk(text).iter().map(|c| clean_text(c)).filter(|c| !c.is_empty()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_chunks_example() {
        let chunks = chunk_words("w1 w2 w3 w4 w5", 2).unwrap();
        assert_eq!(chunks, vec!["w1 w2", "w3 w4", "w5"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_words("", 3).unwrap().is_empty());
        assert!(chunk_words("   \n\t ", 3).unwrap().is_empty());
    }

    #[test]
    fn size_one_yields_one_chunk_per_word() {
        assert_eq!(chunk_words("a b  c", 1).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn zero_chunk_size_fails_fast() {
        assert!(matches!(chunk_words("a b", 0), Err(RagError::ChunkingError(_))));
    }

    #[test]
    fn recursive_rejects_bad_overlap() {
        assert!(RecursiveChunker::new(10, 10).is_err());
        assert!(RecursiveChunker::new(0, 0).is_err());
    }

    #[test]
    fn recursive_keeps_short_text_whole() {
        let chunker = RecursiveChunker::new(500, 50).unwrap();
        assert_eq!(chunker.chunk("  short text  "), vec!["short text"]);
    }

    #[test]
    fn recursive_prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(20, 0).unwrap();
        let chunks = chunker.chunk("first paragraph\n\nsecond paragraph");
        assert_eq!(chunks, vec!["first paragraph", "second paragraph"]);
    }

    #[test]
    fn recursive_cuts_long_words_on_char_boundaries() {
        let chunker = RecursiveChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk("ééééééééé");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("éééé"));
    }

    #[test]
    fn recursive_overlap_carries_tail() {
        let chunker = RecursiveChunker::new(11, 5).unwrap();
        let chunks = chunker.chunk("aa bb cc dd ee ff");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 11));
        // consecutive chunks share at least one word
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(pair[1].contains(last_word), "{pair:?}");
        }
    }

    #[test]
    fn clean_text_examples() {
        assert_eq!(clean_text("This is a normal text."), "This is a normal text.");
        assert_eq!(clean_text("Text with <pad> token."), "Text with token.");
        assert_eq!(clean_text("Text with <EOS> token."), "Text with token.");
        assert_eq!(clean_text("Text <pad> with <EOS> tokens."), "Text with tokens.");
        assert_eq!(
            clean_text("Text   with    excessive   whitespace."),
            "Text with excessive whitespace."
        );
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("<pad><EOS>"), "");
    }

    #[test]
    fn clean_text_is_idempotent() {
        let once = clean_text(" a <pad>\n\n b<EOS>c ");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn cleaned_drops_marker_only_chunks() {
        let chunker = Cleaned(WordChunker::new(1).unwrap());
        assert_eq!(chunker.chunk("alpha <pad> beta"), vec!["alpha", "beta"]);
    }
}
