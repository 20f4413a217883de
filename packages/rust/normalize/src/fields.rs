//! Heuristic field selection over a flattened record.
//!
//! Selection rules are an explicit ordered table of (field, keyword set)
//! pairs evaluated against the flat key/value table in key order — data, not
//! branching code, so sources with new key spellings extend the table rather
//! than the logic.

use crate::flatten::FlatRecord;

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// One selection rule: the first key whose lower-cased form contains any of
/// the keywords wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub keywords: &'static [&'static str],
}

/// Rules for the single-valued fields, in evaluation order.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: "title",
        keywords: &["title", "name", "headline", "program"],
    },
    FieldRule {
        field: "date",
        keywords: &["regdate", "date", "created", "updated", "start"],
    },
    FieldRule {
        field: "link",
        keywords: &["url", "link", "href"],
    },
];

/// Keywords flagging a key as description-like.
const DESCRIPTION_KEYWORDS: &[&str] = &["description", "desc", "content", "body", "summary", "info"];

/// Keys containing these look like metadata, not prose — excluded from the
/// longest-value description fallback.
const METADATA_KEYWORDS: &[&str] = &["title", "name", "date", "id", "code", "url", "link"];

/// Minimum length for a value to qualify as a fallback description.
const MIN_FALLBACK_DESCRIPTION_CHARS: usize = 30;

// ---------------------------------------------------------------------------
// NormalizedFields
// ---------------------------------------------------------------------------

/// Semantic fields selected from a flat record, plus access to the remaining
/// pairs as detail lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFields {
    pub title: Option<String>,
    pub date: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl NormalizedFields {
    /// Select fields from a flattened record.
    pub fn select(flat: &FlatRecord) -> Self {
        let mut fields = Self::default();
        for rule in FIELD_RULES {
            let value = pick_first(flat, rule.keywords).map(str::to_string);
            match rule.field {
                "title" => fields.title = value,
                "date" => fields.date = value,
                "link" => fields.link = value,
                _ => unreachable!("unknown field rule"),
            }
        }
        fields.description = pick_description(flat);
        fields
    }

    /// Whether `value` equals one of the already-selected field values (so it
    /// should not be repeated as a detail line).
    pub fn claims(&self, value: &str) -> bool {
        [&self.title, &self.date, &self.link, &self.description]
            .iter()
            .any(|f| f.as_deref() == Some(value))
    }
}

/// First value (in key order) whose key contains any keyword, case-insensitive.
fn pick_first<'a>(flat: &'a FlatRecord, keywords: &[&str]) -> Option<&'a str> {
    flat.iter()
        .find(|(key, _)| {
            let lower = key.to_lowercase();
            keywords.iter().any(|kw| lower.contains(kw))
        })
        .map(|(_, value)| value)
}

/// Description: longest value under a description-like key; if none, the
/// longest value of at least [`MIN_FALLBACK_DESCRIPTION_CHARS`] whose key
/// does not itself look like metadata.
fn pick_description(flat: &FlatRecord) -> Option<String> {
    let key_based = flat
        .iter()
        .filter(|(key, _)| {
            let lower = key.to_lowercase();
            DESCRIPTION_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .map(|(_, value)| value)
        .max_by_key(|value| value.chars().count());
    if let Some(best) = key_based {
        return Some(best.to_string());
    }

    flat.iter()
        .filter(|(key, value)| {
            let lower = key.to_lowercase();
            !METADATA_KEYWORDS.iter().any(|kw| lower.contains(kw))
                && value.chars().count() >= MIN_FALLBACK_DESCRIPTION_CHARS
        })
        .map(|(_, value)| value)
        .max_by_key(|value| value.chars().count())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    #[test]
    fn selects_first_matching_key_in_order() {
        let flat = flatten(&json!({
            "item_headline": "Headline wins",
            "item_title": "Title loses",
            "regDate": "2024-03-05",
            "detailUrl": "https://example.org/1"
        }));
        let fields = NormalizedFields::select(&flat);

        assert_eq!(fields.title.as_deref(), Some("Headline wins"));
        assert_eq!(fields.date.as_deref(), Some("2024-03-05"));
        assert_eq!(fields.link.as_deref(), Some("https://example.org/1"));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let flat = flatten(&json!({"EventName": "Rose Festival"}));
        let fields = NormalizedFields::select(&flat);
        assert_eq!(fields.title.as_deref(), Some("Rose Festival"));
    }

    #[test]
    fn description_prefers_longest_keyword_match() {
        let flat = flatten(&json!({
            "summary": "short",
            "description": "a considerably longer description of the record"
        }));
        let fields = NormalizedFields::select(&flat);
        assert_eq!(
            fields.description.as_deref(),
            Some("a considerably longer description of the record")
        );
    }

    #[test]
    fn description_falls_back_to_longest_prose_value() {
        let flat = flatten(&json!({
            "title": "A title",
            "itemCode": "this is a code value that is definitely long enough",
            "remarks": "an unlabeled prose field long enough to qualify as the description"
        }));
        let fields = NormalizedFields::select(&flat);
        // itemCode is excluded (metadata-like key) despite its length.
        assert_eq!(
            fields.description.as_deref(),
            Some("an unlabeled prose field long enough to qualify as the description")
        );
    }

    #[test]
    fn description_fallback_requires_minimum_length() {
        let flat = flatten(&json!({"remarks": "too short"}));
        let fields = NormalizedFields::select(&flat);
        assert_eq!(fields.description, None);
    }

    #[test]
    fn claims_detects_selected_values() {
        let flat = flatten(&json!({"title": "T", "extra": "E"}));
        let fields = NormalizedFields::select(&flat);
        assert!(fields.claims("T"));
        assert!(!fields.claims("E"));
    }
}
