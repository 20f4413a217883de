//! XML-to-JSON value conversion for open-data endpoints.
//!
//! Some endpoints answer in XML instead of JSON; converting the tree into a
//! `serde_json::Value` lets the rest of the pipeline treat both the same.
//! Repeated sibling elements become arrays, text-only elements become
//! strings, attributes are dropped.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::{Map, Value};

use corpusync_shared::{Result, SyncError};

/// Parse an XML document into a JSON value rooted at the document element,
/// i.e. `<response>…</response>` becomes `{"response": …}`.
pub fn xml_to_value(text: &str) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    // Open elements, innermost last: (name, object children, text content).
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push((name, Map::new(), String::new()));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some((_, children, _)) => insert_child(children, name, Value::Null),
                    None => root = root.or_else(|| Some(wrap(name, Value::Null))),
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    let decoded = e
                        .unescape()
                        .map_err(|e| SyncError::parse(format!("malformed XML text: {e}")))?;
                    text.push_str(&decoded);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(_)) => {
                let (name, children, text) = stack
                    .pop()
                    .ok_or_else(|| SyncError::parse("unbalanced XML end tag"))?;

                let value = if !children.is_empty() {
                    Value::Object(children)
                } else if text.is_empty() {
                    Value::Null
                } else {
                    Value::String(text)
                };

                match stack.last_mut() {
                    Some((_, parent, _)) => insert_child(parent, name, value),
                    None => root = root.or_else(|| Some(wrap(name, value))),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(SyncError::parse(format!("malformed XML: {e}"))),
        }
    }

    root.ok_or_else(|| SyncError::parse("empty XML document"))
}

fn wrap(name: String, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(name, value);
    Value::Object(map)
}

/// Insert `value` under `name`, promoting repeated siblings to an array.
fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_elements_become_objects() {
        let value = xml_to_value(
            "<response><header><resultCode>00</resultCode></header>\
             <body><total>2</total></body></response>",
        )
        .unwrap();

        assert_eq!(
            value,
            json!({
                "response": {
                    "header": {"resultCode": "00"},
                    "body": {"total": "2"}
                }
            })
        );
    }

    #[test]
    fn repeated_siblings_become_arrays() {
        let value = xml_to_value(
            "<items><item><title>a</title></item><item><title>b</title></item>\
             <item><title>c</title></item></items>",
        )
        .unwrap();

        let items = &value["items"]["item"];
        assert!(items.is_array());
        assert_eq!(items.as_array().unwrap().len(), 3);
        assert_eq!(items[1]["title"], "b");
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let value =
            xml_to_value("<doc><a>Tom &amp; Jerry</a><b><![CDATA[<raw> text]]></b></doc>")
                .unwrap();
        assert_eq!(value["doc"]["a"], "Tom & Jerry");
        assert_eq!(value["doc"]["b"], "<raw> text");
    }

    #[test]
    fn empty_element_is_null() {
        let value = xml_to_value("<doc><a/><b></b></doc>").unwrap();
        assert_eq!(value["doc"]["a"], Value::Null);
        assert_eq!(value["doc"]["b"], Value::Null);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = xml_to_value("<doc><open></doc>").unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(xml_to_value("").is_err());
    }
}
