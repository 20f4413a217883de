//! Record normalization for Corpusync.
//!
//! Turns arbitrary nested upstream records into flat key/value tables,
//! selects semantic fields by keyword rules, parses and sorts record dates,
//! and renders records as formatted text blocks ready for chunking.

pub mod dates;
pub mod fields;
pub mod flatten;
pub mod format;

pub use dates::{UNDATED, parse_date, sort_by_date};
pub use fields::{FIELD_RULES, FieldRule, NormalizedFields};
pub use flatten::{FlatRecord, collapse_whitespace, flatten, looks_like_markup, strip_markup};
pub use format::{BLOCK_SEPARATOR, extract_items, format_record};
