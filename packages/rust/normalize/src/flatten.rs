//! Flattening of arbitrary nested records into an ordered key-path table.
//!
//! Upstream payloads arrive as untyped JSON-like trees with shapes that vary
//! per endpoint and per record. `flatten` walks the tree once and produces a
//! flat `key_path -> cleaned text` table; everything downstream (field
//! selection, sorting, block rendering) works off that table and never sees
//! the raw shape.

use scraper::{Html, Node};
use serde_json::Value;

// ---------------------------------------------------------------------------
// FlatRecord
// ---------------------------------------------------------------------------

/// A flattened record: dotted/indexed key paths mapped to cleaned scalar
/// text, in document order. Keys are unique because each comes from a unique
/// path through the input tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRecord(Vec<(String, String)>);

impl FlatRecord {
    /// Iterate entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up a value by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flatten a raw record tree into a [`FlatRecord`].
///
/// Map keys contribute `key_` and sequence indices contribute `index_` to
/// the path prefix; the trailing separator is removed from the final key.
/// Null and empty leaves are dropped, markup-bearing values are stripped to
/// collapsed-whitespace plain text. Malformed leaves are omitted silently —
/// this function never fails.
pub fn flatten(raw: &Value) -> FlatRecord {
    let mut out = Vec::new();
    walk(raw, String::new(), &mut out);
    FlatRecord(out)
}

fn walk(value: &Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, format!("{prefix}{key}_"), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, format!("{prefix}{index}_"), out);
            }
        }
        Value::Null => {}
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if text.is_empty() {
                return;
            }

            let cleaned = if looks_like_markup(&text) {
                strip_markup(&text)
            } else {
                collapse_whitespace(&text)
            };
            if cleaned.is_empty() {
                return;
            }

            let key = prefix.trim_end_matches('_').to_string();
            out.push((key, cleaned));
        }
    }
}

// ---------------------------------------------------------------------------
// Markup handling
// ---------------------------------------------------------------------------

/// Markers that flag a value as carrying HTML rather than plain text.
const MARKUP_MARKERS: &[&str] = &["<p", "<br", "<div", "<span", "<table", "&lt;", "&gt;", "&amp;"];

/// Heuristic check for tag-like or entity-containing values.
pub fn looks_like_markup(s: &str) -> bool {
    let lower = s.to_lowercase();
    MARKUP_MARKERS.iter().any(|m| lower.contains(m))
}

/// Strip tags and entities from a markup-bearing value, collapsing all
/// whitespace runs to single spaces. Script and style bodies are dropped.
pub fn strip_markup(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);

    let mut text = String::new();
    for node in fragment.tree.nodes() {
        if let Node::Text(chunk) = node.value() {
            let skipped = node.ancestors().any(|a| {
                matches!(a.value(), Node::Element(el)
                    if el.name() == "script" || el.name() == "style")
            });
            if !skipped {
                text.push_str(chunk);
                text.push(' ');
            }
        }
    }

    collapse_whitespace(&text)
}

/// Collapse all whitespace runs to single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_maps_and_sequences() {
        let raw = json!({
            "response": {
                "items": [
                    {"title": "First", "views": 10},
                    {"title": "Second"}
                ]
            }
        });

        let flat = flatten(&raw);
        assert_eq!(flat.get("response_items_0_title"), Some("First"));
        assert_eq!(flat.get("response_items_0_views"), Some("10"));
        assert_eq!(flat.get("response_items_1_title"), Some("Second"));
    }

    #[test]
    fn keys_are_unique_and_nonempty() {
        let raw = json!({
            "a": {"b": 1, "c": [true, false]},
            "d": "x"
        });
        let flat = flatten(&raw);

        let keys: Vec<&str> = flat.iter().map(|(k, _)| k).collect();
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(keys.len(), deduped.len());
        assert!(keys.iter().all(|k| !k.is_empty()));
    }

    #[test]
    fn drops_null_and_empty_leaves() {
        let raw = json!({"a": null, "b": "", "c": "kept"});
        let flat = flatten(&raw);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat.get("c"), Some("kept"));
    }

    #[test]
    fn preserves_document_order() {
        let raw = json!({"zeta": "1", "alpha": "2", "mid": "3"});
        let flat = flatten(&raw);
        let keys: Vec<&str> = flat.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn strips_markup_from_values() {
        let raw = json!({
            "desc": "<p>Opening <b>hours</b>:<br>9 to 6</p>",
            "note": "fish &amp; chips"
        });
        let flat = flatten(&raw);

        let desc = flat.get("desc").unwrap();
        assert!(!desc.contains('<'));
        assert!(!desc.contains('>'));
        assert_eq!(desc, "Opening hours : 9 to 6");

        assert_eq!(flat.get("note"), Some("fish & chips"));
    }

    #[test]
    fn strip_markup_drops_script_bodies() {
        let text = strip_markup("<div>visible<script>var hidden = 1;</script></div>");
        assert_eq!(text, "visible");
    }

    #[test]
    fn collapses_whitespace_in_plain_values() {
        let raw = json!({"a": "  spaced\n\tout   text "});
        let flat = flatten(&raw);
        assert_eq!(flat.get("a"), Some("spaced out text"));
    }

    #[test]
    fn coerces_scalars_to_text() {
        let raw = json!({"n": 42, "f": 3.5, "b": true});
        let flat = flatten(&raw);
        assert_eq!(flat.get("n"), Some("42"));
        assert_eq!(flat.get("f"), Some("3.5"));
        assert_eq!(flat.get("b"), Some("true"));
    }
}
