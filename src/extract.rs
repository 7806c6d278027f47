//! Recovery of JSON payloads from free-form model replies.
//!
//! Search-grounded replies often wrap the requested array in prose or a
//! markdown fence. The span heuristic here is intentionally naive: it takes
//! everything from the first `[` to the last `]` and does not scan for the
//! first syntactically complete array.

use serde::de::DeserializeOwned;
use tracing::warn;

const EXCERPT_CHARS: usize = 200;

/// Byte range from the first `[` through the last `]`, if the latter
/// follows the former.
pub fn array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a JSON array out of `text`, degrading to an empty vector.
///
/// The bracket span is tried first, then the whole text. Any remaining
/// parse failure yields `vec![]`.
pub fn extract_json_array<T: DeserializeOwned>(text: &str) -> Vec<T> {
    let from_span = array_span(text).map(|span| serde_json::from_str::<Vec<T>>(span));
    let parsed = match from_span {
        Some(Ok(items)) => Ok(items),
        _ => serde_json::from_str::<Vec<T>>(text),
    };
    match parsed {
        Ok(items) => items,
        Err(e) => {
            warn!(
                "Failed to parse JSON array from model response: {} (excerpt: {:?})",
                e,
                excerpt(text)
            );
            Vec::new()
        }
    }
}

/// Leading characters of a reply, for diagnostics.
pub fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().nth(EXCERPT_CHARS).is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn recovers_array_embedded_in_prose() {
        let text = r#"Here are results: [{"a":1}] thanks"#;
        assert_eq!(array_span(text), Some(r#"[{"a":1}]"#));
        let items: Vec<Value> = extract_json_array(text);
        assert_eq!(items, vec![json!({"a": 1})]);
    }

    #[test]
    fn recovers_array_from_markdown_fence() {
        let text = "```json\n[{\"id\":\"1\"},{\"id\":\"2\"}]\n```";
        let items: Vec<Value> = extract_json_array(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["id"], "2");
    }

    #[test]
    fn no_brackets_falls_back_to_whole_text() {
        let items: Vec<Value> = extract_json_array("no json here");
        assert!(items.is_empty());
        assert_eq!(array_span("no json here"), None);
    }

    #[test]
    fn reversed_brackets_are_not_a_span() {
        assert_eq!(array_span("] then ["), None);
        let items: Vec<Value> = extract_json_array("] then [");
        assert!(items.is_empty());
    }

    #[test]
    fn two_bracket_pairs_take_first_open_and_last_close() {
        let text = r#"Format like [x]. Results: [{"a":1}]"#;
        assert_eq!(array_span(text), Some(r#"[x]. Results: [{"a":1}]"#));
        // over-capture makes the span invalid; the call degrades to empty
        let items: Vec<Value> = extract_json_array(text);
        assert!(items.is_empty());
    }

    #[test]
    fn adjacent_valid_arrays_still_over_capture() {
        let text = "[1] and [2]";
        let items: Vec<Value> = extract_json_array(text);
        assert!(items.is_empty());
    }

    #[test]
    fn whole_text_object_is_not_an_array() {
        let items: Vec<Value> = extract_json_array(r#"{"a":1}"#);
        assert!(items.is_empty());
    }

    #[test]
    fn typed_elements_are_all_or_nothing() {
        #[derive(serde::Deserialize, Debug)]
        struct Item {
            #[allow(dead_code)]
            n: u32,
        }
        let ok: Vec<Item> = extract_json_array(r#"[{"n":1},{"n":2}]"#);
        assert_eq!(ok.len(), 2);
        let bad: Vec<Item> = extract_json_array(r#"[{"n":1},{"n":"two"}]"#);
        assert!(bad.is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = r#"ok [{"a":1},{"b":[2,3]}] done"#;
        let first: Vec<Value> = extract_json_array(text);
        let second: Vec<Value> = extract_json_array(text);
        assert_eq!(first, second);
    }

    #[test]
    fn excerpt_truncates_long_replies() {
        let long = "x".repeat(500);
        let short = excerpt(&long);
        assert_eq!(short.chars().count(), EXCERPT_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(excerpt("short"), "short");
    }
}
