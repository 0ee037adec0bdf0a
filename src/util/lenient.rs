//! Forgiving `deserialize_with` helpers for model-produced JSON.
//!
//! The model is asked for a fixed shape but routinely returns numbers as strings,
//! lists where a string was requested, or `null` for fields it skipped.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::html::list_to_html;

pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_text(&Value::deserialize(d)?))
}

pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Null => None,
        other => Some(value_to_text(&other)),
    })
}

/// Like [`opt_text`], but a list becomes an HTML bullet list.
pub fn opt_html<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Null => None,
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(value_to_text).collect();
            Some(list_to_html(&items))
        }
        other => Some(value_to_text(&other)),
    })
}

/// Like [`text`], but a list becomes an HTML bullet list.
pub fn html<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(opt_html(d)?.unwrap_or_default())
}

pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(value_to_number(&Value::deserialize(d)?))
}

/// A single string is treated as a one-element list.
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        other => vec![value_to_text(&other)],
    })
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => value.to_string(),
    }
}

/// Numbers, or strings that start with one ("4", "2.5h", " 3 hours").
/// Only finite values are accepted.
pub fn value_to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn leading_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_number")]
        n: Option<f64>,
        #[serde(default, deserialize_with = "opt_html")]
        ac: Option<String>,
        #[serde(default, deserialize_with = "string_list")]
        list: Vec<String>,
        #[serde(default, deserialize_with = "text")]
        t: String,
    }

    fn probe(v: Value) -> Probe {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn numbers_from_strings() {
        assert_eq!(probe(json!({ "n": "4" })).n, Some(4.0));
        assert_eq!(probe(json!({ "n": "2.5h" })).n, Some(2.5));
        assert_eq!(probe(json!({ "n": " 3 hours" })).n, Some(3.0));
        assert_eq!(probe(json!({ "n": 6 })).n, Some(6.0));
        assert_eq!(probe(json!({ "n": "about four" })).n, None);
        assert_eq!(probe(json!({ "n": "NaN" })).n, None);
        assert_eq!(probe(json!({ "n": "inf" })).n, None);
        assert_eq!(probe(json!({ "n": null })).n, None);
        assert_eq!(probe(json!({})).n, None);
    }

    #[test]
    fn criteria_list_becomes_html() {
        let p = probe(json!({ "ac": ["One", "Two"] }));
        assert_eq!(p.ac.as_deref(), Some("<ul><li>One</li><li>Two</li></ul>"));
        assert_eq!(probe(json!({ "ac": "<p>x</p>" })).ac.as_deref(), Some("<p>x</p>"));
        assert_eq!(probe(json!({ "ac": "" })).ac.as_deref(), Some(""));
    }

    #[test]
    fn single_string_becomes_list() {
        assert_eq!(probe(json!({ "list": "Vendor API" })).list, vec!["Vendor API"]);
        assert_eq!(probe(json!({ "list": ["a", "", "b"] })).list, vec!["a", "b"]);
        assert!(probe(json!({ "list": null })).list.is_empty());
    }

    #[test]
    fn text_accepts_non_strings() {
        assert_eq!(probe(json!({ "t": 12 })).t, "12");
        assert_eq!(probe(json!({ "t": ["a", "b"] })).t, "a\nb");
        assert_eq!(probe(json!({ "t": null })).t, "");
    }
}
