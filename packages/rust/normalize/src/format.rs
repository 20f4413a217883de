//! Record-to-text rendering and record-list extraction.

use serde_json::Value;

use crate::fields::NormalizedFields;
use crate::flatten::flatten;

/// Placeholder rendered when a record has no description.
const NO_DESCRIPTION: &str = "(no description)";

/// Separator terminating every formatted block.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Render one raw record as a formatted text block: selected fields first,
/// then every remaining key/value pair as a detail line, ending in the block
/// separator.
pub fn format_record(record: &Value) -> String {
    let flat = flatten(record);
    let fields = NormalizedFields::select(&flat);

    let mut lines: Vec<String> = vec!["### Record".into()];
    if let Some(title) = &fields.title {
        lines.push(format!("**Title:** {title}"));
    }
    if let Some(date) = &fields.date {
        lines.push(format!("**Date:** {date}"));
    }
    match &fields.description {
        Some(desc) => lines.push(format!("**Description:** {desc}")),
        None => lines.push(format!("**Description:** {NO_DESCRIPTION}")),
    }
    if let Some(link) = &fields.link {
        lines.push(format!("**Link:** {link}"));
    }

    lines.push("\n**Details:**".into());
    for (key, value) in flat.iter() {
        if fields.claims(value) {
            continue;
        }
        lines.push(format!("- {key}: {value}"));
    }

    lines.join("\n") + BLOCK_SEPARATOR
}

/// Locate the record list inside an arbitrary response tree: the largest
/// sequence found anywhere in the structure. Endpoints wrap their item list
/// in varying envelope shapes; the biggest list is the payload.
pub fn extract_items(data: &Value) -> Option<Vec<Value>> {
    match data {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => map
            .values()
            .filter_map(extract_items)
            .max_by_key(|candidate| candidate.len()),
        _ => None,
    }
}
