//! Paragraph chunking with a sliding word-overlap window.
//!
//! Scraped prose is split on blank-line boundaries and re-aggregated into
//! word-bounded chunks. Consecutive chunks share up to `overlap` trailing
//! words so retrieval keeps context across chunk boundaries.

use corpusync_shared::{Result, SyncError};

/// Split text into paragraphs on blank-line boundaries, trimmed, empties
/// dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Greedily accumulate paragraph words into chunks of at most `chunk_size`
/// words, optionally seeding the first chunk with a `[TITLE]` marker line.
///
/// A paragraph longer than `chunk_size` on its own is hard-split into fixed
/// windows of `chunk_size` words advancing by `chunk_size - overlap`, each
/// emitted as its own chunk. When a buffer flushes, its last `overlap` words
/// seed the next buffer.
pub fn chunk_paragraphs(
    paragraphs: &[&str],
    title: Option<&str>,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(SyncError::Chunking(format!(
            "invalid window: chunk_size={chunk_size}, overlap={overlap}"
        )));
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    if let Some(title) = title {
        current.push(format!("[TITLE] {title}"));
    }

    for para in paragraphs {
        let words: Vec<&str> = para.split_whitespace().collect();

        if words.len() > chunk_size {
            if !current.is_empty() {
                chunks.push(current.join(" "));
                current = tail(current, overlap);
            }

            let step = chunk_size - overlap;
            let mut start = 0;
            while start < words.len() {
                let end = (start + chunk_size).min(words.len());
                chunks.push(words[start..end].join(" "));
                start += step;
            }
            continue;
        }

        if current.len() + words.len() > chunk_size {
            chunks.push(current.join(" "));
            current = if overlap > 0 {
                tail(current, overlap)
            } else {
                Vec::new()
            };
        }

        current.extend(words.iter().map(|w| w.to_string()));
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    Ok(chunks)
}

/// Last `n` elements of the buffer, or the whole buffer if shorter.
fn tail(buffer: Vec<String>, n: usize) -> Vec<String> {
    if buffer.len() > n {
        buffer[buffer.len() - n..].to_vec()
    } else {
        buffer
    }
}
