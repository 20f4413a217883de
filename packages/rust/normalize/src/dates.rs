//! Date parsing and descending date sort for fetched records.

use std::cmp::Reverse;

use chrono::NaiveDate;
use serde_json::Value;

use crate::fields::NormalizedFields;
use crate::flatten::flatten;

/// Formats accepted for record dates, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y%m%d"];

/// Sentinel for unparsable dates. Sorts after every real date in descending
/// order, so undated records sink to the bottom.
pub const UNDATED: NaiveDate = NaiveDate::MIN;

/// Parse a record date. `/` is normalized to `-`, anything after the first
/// space (time of day) is dropped, and the formats `Y-M-D`, `Y.M.D`, `YMD`
/// are tried in order. Unparsable input yields [`UNDATED`].
pub fn parse_date(text: &str) -> NaiveDate {
    let normalized = text.replace('/', "-");
    let date_part = normalized
        .split_whitespace()
        .next()
        .unwrap_or_default();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .unwrap_or(UNDATED)
}

/// Sort records by their selected date field, newest first. The sort is
/// stable: records sharing a parsed date keep their original relative order.
pub fn sort_by_date(records: &mut [Value]) {
    records.sort_by_cached_key(|record| {
        let flat = flatten(record);
        let fields = NormalizedFields::select(&flat);
        Reverse(parse_date(fields.date.as_deref().unwrap_or_default()))
    });
}
