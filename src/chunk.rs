//! Boundary-preferring text chunker with fixed overlap.
//!
//! Splits a document's extracted text into [`Chunk`]s of at most
//! `chunk_size` characters. Consecutive chunks share exactly
//! `chunk_overlap` characters: the tail of one chunk is repeated verbatim at
//! the head of the next.
//!
//! # Algorithm
//!
//! 1. If the remaining text fits in `chunk_size`, emit it and stop.
//! 2. Otherwise look for a cut point in the second half of the window,
//!    preferring (in order) a paragraph break, a line break, a sentence end,
//!    and finally any space. The separator stays with the earlier chunk.
//! 3. With no boundary in range, cut hard at `chunk_size`.
//! 4. The next chunk starts `chunk_overlap` characters before the cut.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text is never
//! split inside a code point.
//!
//! # Example
//!
//! ```rust
//! use pdf_query::chunk::split_text;
//!
//! let pieces = split_text("Hello world.", 1000, 100);
//! assert_eq!(pieces, vec!["Hello world.".to_string()]);
//! ```

use crate::config::ChunkingConfig;
use crate::models::{Chunk, ExtractedDocument};

/// Separators tried from most to least preferred. Each tier is searched over
/// the whole window before falling back to the next.
const SEPARATOR_TIERS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

/// String inserted between consecutive pages before splitting.
pub const PAGE_JOINER: &str = "\n";

/// Split `text` into overlapping pieces.
///
/// Returns an empty vector when `text` is empty or whitespace only.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    split_spans(&chars, chunk_size, chunk_overlap)
        .into_iter()
        .map(|(start, end)| chars[start..end].iter().collect())
        .collect()
}

/// Chunk one extracted document, tagging every chunk with its filename and
/// the page it starts on.
pub fn chunk_document(doc: &ExtractedDocument, config: &ChunkingConfig) -> Vec<Chunk> {
    let joiner_len = PAGE_JOINER.chars().count();
    let mut page_starts = Vec::with_capacity(doc.pages.len());
    let mut text = String::new();
    let mut offset = 0usize;
    for (i, page) in doc.pages.iter().enumerate() {
        if i > 0 {
            text.push_str(PAGE_JOINER);
            offset += joiner_len;
        }
        page_starts.push(offset);
        text.push_str(page);
        offset += page.chars().count();
    }

    let chars: Vec<char> = text.chars().collect();
    split_spans(&chars, config.chunk_size, config.chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (start, end))| Chunk {
            source: doc.filename.clone(),
            chunk_index,
            page: page_for_offset(&page_starts, start),
            text: chars[start..end].iter().collect(),
        })
        .collect()
}

fn page_for_offset(page_starts: &[usize], offset: usize) -> Option<u32> {
    if page_starts.is_empty() {
        return None;
    }
    let idx = page_starts.partition_point(|&s| s <= offset).max(1) - 1;
    Some(idx as u32 + 1)
}

/// Compute `(start, end)` char ranges for each chunk.
fn split_spans(chars: &[char], chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, usize)> {
    if chunk_size == 0 || chars.iter().all(|c| c.is_whitespace()) {
        return Vec::new();
    }
    let overlap = chunk_overlap.min(chunk_size - 1);

    let mut spans = Vec::new();
    let mut start = 0usize;
    loop {
        if chars.len() - start <= chunk_size {
            spans.push((start, chars.len()));
            break;
        }
        let hard_end = start + chunk_size;
        // Cuts below the floor would make chunks too short or stall progress.
        let floor = start + (chunk_size / 2).max(overlap + 1);
        let end = find_boundary(chars, start, floor, hard_end).unwrap_or(hard_end);
        spans.push((start, end));
        start = end - overlap;
    }
    spans
}

/// Last cut position in `[floor, hard_end]` that sits right after a
/// separator, trying each tier in order.
fn find_boundary(chars: &[char], start: usize, floor: usize, hard_end: usize) -> Option<usize> {
    for tier in SEPARATOR_TIERS {
        for pos in (floor..=hard_end).rev() {
            if tier.iter().any(|sep| ends_with_at(chars, start, pos, sep)) {
                return Some(pos);
            }
        }
    }
    None
}

fn ends_with_at(chars: &[char], start: usize, pos: usize, sep: &str) -> bool {
    let sep_len = sep.chars().count();
    if pos < start + sep_len {
        return false;
    }
    chars[pos - sep_len..pos].iter().copied().eq(sep.chars())
}
