//! Pulling the user's query out of loosely shaped request bodies and Lambda events

use serde_json::Value;

pub const DEFAULT_QUERY: &str = "Hello World";

/// Keys tried in order; the first non-empty value wins
const INPUT_KEYS: [&str; 6] = ["inputText", "input", "query", "message", "prompt", "payload"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub query: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

impl Invocation {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: None,
            user_id: None,
        }
    }

    /// String events are the query itself; objects go through key extraction
    pub fn from_event(event: &Value) -> Self {
        match event {
            Value::String(text) if !text.is_empty() => Self::new(text.clone()),
            Value::Object(_) => Self {
                query: extract_input(event),
                session_id: string_field(event, "session_id"),
                user_id: string_field(event, "user_id"),
            },
            _ => Self::new(DEFAULT_QUERY),
        }
    }

    /// JSON bodies are treated as events; anything else is plain query text
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            return Self::new(DEFAULT_QUERY);
        }
        match serde_json::from_str::<Value>(body) {
            Ok(event) => Self::from_event(&event),
            Err(_) => Self::new(body),
        }
    }
}

/// Empty strings, nulls and empty containers count as missing
fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn string_field(event: &Value, key: &str) -> Option<String> {
    event
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Query text from an event object, falling back to its `body` and then the default greeting
pub fn extract_input(event: &Value) -> String {
    INPUT_KEYS
        .iter()
        .find_map(|key| event.get(*key).and_then(non_empty_text))
        .or_else(|| event.get("body").and_then(non_empty_text))
        .unwrap_or_else(|| DEFAULT_QUERY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_priority() {
        let event = json!({"query": "second", "inputText": "first", "prompt": "third"});
        assert_eq!(extract_input(&event), "first");

        let event = json!({"inputText": "", "message": "from message"});
        assert_eq!(extract_input(&event), "from message");

        let event = json!({"body": "raw body"});
        assert_eq!(extract_input(&event), "raw body");

        assert_eq!(extract_input(&json!({})), DEFAULT_QUERY);
    }

    #[test]
    fn test_event_shapes() {
        let invocation = Invocation::from_event(&json!({
            "query": "sales by region",
            "session_id": "s1",
            "user_id": "u1"
        }));
        assert_eq!(invocation.query, "sales by region");
        assert_eq!(invocation.session_id.as_deref(), Some("s1"));
        assert_eq!(invocation.user_id.as_deref(), Some("u1"));

        assert_eq!(Invocation::from_event(&json!("top products")).query, "top products");
        assert_eq!(Invocation::from_event(&json!(42)).query, DEFAULT_QUERY);
    }

    #[test]
    fn test_body_parsing() {
        assert_eq!(Invocation::from_body(r#"{"prompt": "trend"}"#).query, "trend");
        assert_eq!(Invocation::from_body("show me revenue").query, "show me revenue");
        assert_eq!(Invocation::from_body("").query, DEFAULT_QUERY);
        assert_eq!(Invocation::from_body(r#"{"payload": {"q": 1}}"#).query, r#"{"q":1}"#);
    }
}
