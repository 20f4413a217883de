//! Text chunking strategies for Corpusync.
//!
//! Two interchangeable strategies turn ordered text units into size-bounded,
//! deterministically named chunks:
//! - [`batch_chunks`] — consecutive record batches, `{basename}_part{K}.md`
//! - [`chunk_paragraphs`] — word-window chunks with trailing-word overlap
//!
//! plus [`group_events_by_period`] for calendar sources, whose chunks are
//! replaced per filename rather than per prefix.

pub mod batch;
pub mod calendar;
pub mod paragraph;

pub use batch::batch_chunks;
pub use calendar::group_events_by_period;
pub use paragraph::{chunk_paragraphs, split_paragraphs};
