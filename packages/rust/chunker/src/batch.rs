//! Record-batch chunking: consecutive groups of formatted blocks become one
//! named chunk file each.

use corpusync_shared::{Chunk, Result, SyncError};

/// Slice an ordered sequence of formatted blocks into consecutive groups of
/// `batch_size` (the last group may be smaller), concatenate each group, and
/// name the chunks `{basename}_part{K}.md`, 1-indexed.
///
/// `N` blocks yield `ceil(N / batch_size)` chunks; concatenating the chunk
/// contents in order reproduces the original block order exactly.
pub fn batch_chunks(blocks: &[String], basename: &str, batch_size: usize) -> Result<Vec<Chunk>> {
    if batch_size == 0 {
        return Err(SyncError::Chunking(format!(
            "batch_size must be positive for source {basename}"
        )));
    }

    let chunks = blocks
        .chunks(batch_size)
        .enumerate()
        .map(|(index, group)| {
            Chunk::new(
                format!("{basename}_part{}.md", index + 1),
                group.concat(),
            )
        })
        .collect();

    Ok(chunks)
}
