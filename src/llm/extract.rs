use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

/// The span from the first `{` to the last `}` inclusive, or the trimmed text
/// when there is no such pair. Prose and code fences around the object fall away.
pub fn extract_json_payload(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => raw.trim(),
    }
}

pub fn parse_model_json(raw: &str) -> GatewayResult<Value> {
    let payload = extract_json_payload(raw);
    serde_json::from_str(payload).map_err(|e| GatewayError::MalformedModelOutput {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Check a parsed reply against the shape an operation expects.
pub fn parse_shape<T: DeserializeOwned>(value: Value, expected: &'static str) -> GatewayResult<T> {
    serde_json::from_value(value).map_err(|e| GatewayError::UnexpectedShape {
        expected,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn fenced_reply_yields_inner_object() {
        let raw = "Sure! ```json\n{\"tasks\":[]}\n```";
        assert_eq!(extract_json_payload(raw), "{\"tasks\":[]}");
        assert_eq!(parse_model_json(raw).unwrap(), json!({ "tasks": [] }));
    }

    #[test]
    fn nested_objects_keep_outer_braces() {
        let raw = "Here you go: {\"a\": {\"b\": 1}} Hope that helps!";
        assert_eq!(parse_model_json(raw).unwrap(), json!({ "a": { "b": 1 } }));
    }

    #[test]
    fn no_braces_falls_through_to_trimmed_text() {
        let raw = "  I could not produce tasks for this story.  ";
        assert_eq!(
            extract_json_payload(raw),
            "I could not produce tasks for this story."
        );
        match parse_model_json(raw).unwrap_err() {
            GatewayError::MalformedModelOutput { raw: kept, .. } => assert_eq!(kept, raw),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reversed_braces_fall_through() {
        assert_eq!(extract_json_payload(" } oops { "), "} oops {");
    }

    #[test]
    fn braces_without_valid_json_are_malformed() {
        let err = parse_model_json("{tasks: [unquoted]}").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedModelOutput { .. }));
    }

    #[test]
    fn bare_json_without_braces_still_parses() {
        assert_eq!(parse_model_json(" [1, 2] ").unwrap(), json!([1, 2]));
    }

    #[test]
    fn wrong_shape_is_reported_deterministically() {
        #[derive(Debug, Deserialize)]
        struct Tasks {
            #[allow(dead_code)]
            tasks: Vec<Value>,
        }

        let err = parse_shape::<Tasks>(json!({ "items": [] }), "task list").unwrap_err();
        match err {
            GatewayError::UnexpectedShape { expected, detail } => {
                assert_eq!(expected, "task list");
                assert!(detail.contains("tasks"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
