//! Sentence/paragraph-aware text chunker.
//!
//! Splits advisory body text into retrieval chunks that respect a
//! configurable `max_words` budget. Paragraph boundaries (blank lines)
//! are never crossed; within a paragraph, whole sentences are greedily
//! packed until the next sentence would exceed the budget.
//!
//! A single sentence longer than the budget becomes its own oversized
//! chunk: sentences are never fragmented.

use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

/// Split text into chunks of at most `max_words` words (oversized single
/// sentences excepted). Chunks come back in document order, joined with
/// single spaces and trimmed; empty chunks are filtered out.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    let mut chunks = Vec::new();

    for paragraph in PARAGRAPH_RE.split(text.trim()) {
        let mut current: Vec<&str> = Vec::new();
        let mut current_words = 0usize;

        for sentence in split_sentences(paragraph.trim()) {
            let sentence_words = sentence.split_whitespace().count();

            if current.is_empty() || current_words + sentence_words <= max_words {
                current.push(sentence);
                current_words += sentence_words;
            } else {
                chunks.push(current.join(" ").trim().to_string());
                current = vec![sentence];
                current_words = sentence_words;
            }
        }

        // Flush whatever the paragraph left behind.
        if !current.is_empty() {
            chunks.push(current.join(" ").trim().to_string());
        }
    }

    chunks.retain(|c| !c.is_empty());
    chunks
}

/// Split a paragraph into sentence candidates at whitespace that follows
/// a `.`, `!`, or `?`. The terminator stays with its sentence.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut last_char: Option<char> = None;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch.is_whitespace() && matches!(last_char, Some('.') | Some('!') | Some('?')) {
            let sentence = paragraph[start..idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            // Skip the rest of the whitespace run.
            start = idx + ch.len_utf8();
            while let Some(&(next_idx, next_ch)) = chars.peek() {
                if next_ch.is_whitespace() {
                    chars.next();
                    start = next_idx + next_ch.len_utf8();
                } else {
                    start = next_idx;
                    break;
                }
            }
            last_char = None;
        } else {
            last_char = Some(ch);
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
