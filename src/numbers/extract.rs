//! Single-value extraction from loosely-typed items
//!
//! Items arrive either as objects with one of several field names for the
//! value we want, or as bare strings/scalars. Candidate field names are
//! checked in declared order; the first present, non-empty value wins.

use serde_json::Value;

use super::normalize::is_truthy;

/// Candidate fields holding a phone number, in priority order
pub const PHONE_NUMBER_FIELDS: &[&str] = &["phone_number", "number", "phone", "endpoint", "id"];

/// Candidate fields for items returned by the `/endpoints` fallback
pub const ENDPOINT_FIELDS: &[&str] = &["phone_number", "number", "phone", "endpoint", "id"];

/// Candidate fields holding a connection identifier
pub const CONNECTION_ID_FIELDS: &[&str] = &["id", "connection_id", "connectionId"];

/// Convert a JSON value to its plain string form
///
/// Strings are returned without quotes; compound values use compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// First candidate field of `item` holding a non-empty value
pub fn first_field<'a>(item: &'a Value, candidate_fields: &[&str]) -> Option<&'a Value> {
    let map = item.as_object()?;
    candidate_fields
        .iter()
        .filter_map(|field| map.get(*field))
        .find(|value| is_truthy(value))
}

/// Extract the logical value of `item`.
///
/// - object: first non-empty candidate field, else the whole object rendered as JSON
/// - string: returned unchanged, candidate fields ignored
/// - anything else: its string form
pub fn extract_value(item: &Value, candidate_fields: &[&str]) -> String {
    match item {
        Value::Object(_) => first_field(item, candidate_fields)
            .map(value_to_string)
            .unwrap_or_else(|| item.to_string()),
        Value::String(s) => s.clone(),
        // bare null renders as "null"
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declared_order_wins() {
        let item = json!({"number": "+9111", "id": "x"});
        assert_eq!(extract_value(&item, PHONE_NUMBER_FIELDS), "+9111");

        let item = json!({"id": "x", "phone": "+9122", "phone_number": "+9133"});
        assert_eq!(extract_value(&item, PHONE_NUMBER_FIELDS), "+9133");
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let item = json!({"phone_number": "", "number": null, "phone": "+9144"});
        assert_eq!(extract_value(&item, PHONE_NUMBER_FIELDS), "+9144");
    }

    #[test]
    fn test_numeric_field_is_stringified() {
        let item = json!({"id": 919876543210_u64});
        assert_eq!(extract_value(&item, PHONE_NUMBER_FIELDS), "919876543210");
    }

    #[test]
    fn test_object_without_candidates_is_rendered() {
        let item = json!({"label": "main"});
        assert_eq!(
            extract_value(&item, PHONE_NUMBER_FIELDS),
            r#"{"label":"main"}"#
        );
    }

    #[test]
    fn test_strings_pass_through() {
        let item = json!("+91 555 0100");
        assert_eq!(extract_value(&item, PHONE_NUMBER_FIELDS), "+91 555 0100");
        assert_eq!(extract_value(&item, &[]), "+91 555 0100");
    }

    #[test]
    fn test_other_scalars() {
        assert_eq!(extract_value(&json!(919000000000_u64), PHONE_NUMBER_FIELDS), "919000000000");
        assert_eq!(extract_value(&json!(true), PHONE_NUMBER_FIELDS), "true");
    }

    #[test]
    fn test_bare_null_item_is_kept() {
        assert_eq!(extract_value(&json!(null), PHONE_NUMBER_FIELDS), "null");
        assert_eq!(extract_value(&json!(null), &[]), "null");
    }

    #[test]
    fn test_connection_fields() {
        let item = json!({"connectionId": "c-9", "name": "main"});
        assert_eq!(extract_value(&item, CONNECTION_ID_FIELDS), "c-9");
        assert!(first_field(&json!({"name": "x"}), CONNECTION_ID_FIELDS).is_none());
    }
}
