//! Response shape normalization
//!
//! The backend is inconsistent about how it wraps a page of results. This
//! module decodes a page body into one of a fixed set of shapes and turns
//! it into a flat item list plus a "more pages likely" flag.
//!
//! Accepted shapes:
//! - `{"items": [...], "has_more": bool, "total": n}` (also `data` / `results`)
//! - a bare array
//!
//! Anything else decodes as [`ResponseShape::Unrecognized`] and yields no
//! items, which stops pagination.

use serde_json::Value;

/// Keys tried, in order, for the item list of an envelope object
pub const ITEM_KEYS: &[&str] = &["items", "data", "results"];

/// Decoded shape of one page body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape<'a> {
    /// Object wrapper; `has_more` is the raw flag if the server sent one
    Envelope {
        items: &'a [Value],
        has_more: Option<&'a Value>,
    },
    /// Bare array of items
    List(&'a [Value]),
    /// Scalar, null, or anything we do not understand
    Unrecognized,
}

/// One normalized page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub has_more: bool,
}

/// Find the item list inside an envelope object.
///
/// The first key holding a non-empty array wins; if every candidate array
/// is empty (or absent) the result is empty.
fn envelope_items(map: &serde_json::Map<String, Value>) -> &[Value] {
    let arrays: Vec<&[Value]> = ITEM_KEYS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_array).map(Vec::as_slice))
        .collect();

    arrays
        .iter()
        .copied()
        .find(|arr| !arr.is_empty())
        .or_else(|| arrays.first().copied())
        .unwrap_or(&[])
}

/// Classify a page body
pub fn classify(body: &Value) -> ResponseShape<'_> {
    match body {
        Value::Object(map) => ResponseShape::Envelope {
            items: envelope_items(map),
            has_more: map.get("has_more"),
        },
        Value::Array(arr) => ResponseShape::List(arr),
        _ => ResponseShape::Unrecognized,
    }
}

/// JSON truthiness, used for loosely-typed server flags
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Normalize a page body into items and a `has_more` flag.
///
/// When the server does not say whether more pages exist, a page of exactly
/// `page_limit` items is assumed to have a successor.
pub fn normalize(body: &Value, page_limit: usize) -> Page {
    match classify(body) {
        ResponseShape::Envelope { items, has_more } => Page {
            has_more: has_more
                .map(is_truthy)
                .unwrap_or(items.len() == page_limit),
            items: items.to_vec(),
        },
        ResponseShape::List(items) => Page {
            items: items.to_vec(),
            has_more: items.len() == page_limit,
        },
        ResponseShape::Unrecognized => Page::default(),
    }
}

/// Normalize a non-paginated discovery response (orgs, workspaces,
/// connections) into a list.
///
/// Unlike [`normalize`], a non-empty object without an `items` list is
/// treated as a single record.
pub fn collection_items(body: &Value) -> Vec<Value> {
    match body {
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ if map.is_empty() => Vec::new(),
            _ => vec![body.clone()],
        },
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_with_items() {
        let body = json!({"items": ["+911", "+912"], "total": 2});
        let page = normalize(&body, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more, "full page with no flag is assumed to continue");

        let page = normalize(&body, 100);
        assert!(!page.has_more);
    }

    #[test]
    fn test_envelope_alias_keys() {
        let body = json!({"data": [{"number": "+911"}]});
        assert_eq!(normalize(&body, 10).items, vec![json!({"number": "+911"})]);

        let body = json!({"results": ["a", "b", "c"]});
        assert_eq!(normalize(&body, 10).items.len(), 3);
    }

    #[test]
    fn test_empty_items_falls_through_to_data() {
        let body = json!({"items": [], "data": ["+911"]});
        assert_eq!(normalize(&body, 10).items, vec![json!("+911")]);
    }

    #[test]
    fn test_non_array_item_key_is_ignored() {
        let body = json!({"items": {"id": "x"}, "results": ["+911"]});
        assert_eq!(normalize(&body, 10).items, vec![json!("+911")]);
    }

    #[test]
    fn test_object_without_item_keys_is_empty() {
        let body = json!({"phone_number": "+911"});
        let page = normalize(&body, 10);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_explicit_has_more_overrides_length() {
        let body = json!({"items": ["a", "b"], "has_more": false});
        assert!(!normalize(&body, 2).has_more);

        let body = json!({"items": ["a"], "has_more": true});
        assert!(normalize(&body, 2).has_more);

        let body = json!({"items": ["a", "b"], "has_more": null});
        assert!(!normalize(&body, 2).has_more);
    }

    #[test]
    fn test_bare_list() {
        let body = json!(["a", "b", "c"]);
        let page = normalize(&body, 3);
        assert_eq!(page.items.len(), 3);
        assert!(page.has_more);
        assert!(!normalize(&body, 4).has_more);
    }

    #[test]
    fn test_unrecognized_shapes_degrade_to_empty() {
        for body in [json!(null), json!("text"), json!(42), json!(true)] {
            assert_eq!(normalize(&body, 10), Page::default());
            assert_eq!(classify(&body), ResponseShape::Unrecognized);
        }
    }

    #[test]
    fn test_normalize_is_idempotent_on_lists() {
        let body = json!({"items": [{"number": "+911"}, "+912", 7], "has_more": true});
        let first = normalize(&body, 100);
        let second = normalize(&Value::Array(first.items.clone()), 100);
        assert_eq!(second.items, first.items);
    }

    #[test]
    fn test_collection_items() {
        assert_eq!(collection_items(&json!({"items": [1, 2]})), vec![json!(1), json!(2)]);
        assert_eq!(
            collection_items(&json!({"id": "ws-1"})),
            vec![json!({"id": "ws-1"})]
        );
        assert!(collection_items(&json!({})).is_empty());
        assert_eq!(collection_items(&json!(["a"])), vec![json!("a")]);
        assert!(collection_items(&json!("nope")).is_empty());
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
    }
}
