//! Turning whatever the backend sent into one display string.
//!
//! The backend has answered with plain text, `{answer}`, `{text}` and
//! completion-style `{choices: [...]}` bodies. `BackendPayload` names those
//! shapes; `normalize` picks the first that matches and otherwise falls back
//! to the JSON text of the payload, so it never fails.

use serde_json::Value;

/// A backend response body, classified by which recognized field is present.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendPayload {
    /// The body was a bare string.
    Plain(String),
    /// `{"answer": ...}`
    Answer(String),
    /// `{"text": ...}`
    Text(String),
    /// First element of a non-empty `choices` list.
    Choice(Value),
    /// Anything else.
    Unrecognized(Value),
}

impl BackendPayload {
    pub fn classify(raw: Value) -> Self {
        if let Value::String(s) = raw {
            return BackendPayload::Plain(s);
        }
        if let Some(answer) = raw.get("answer").and_then(truthy_text) {
            return BackendPayload::Answer(answer);
        }
        if let Some(text) = raw.get("text").and_then(truthy_text) {
            return BackendPayload::Text(text);
        }
        if let Some(first) = raw
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .filter(|first| is_truthy(first))
        {
            return BackendPayload::Choice(first.clone());
        }
        BackendPayload::Unrecognized(raw)
    }

    pub fn into_text(self) -> String {
        match self {
            BackendPayload::Plain(s) | BackendPayload::Answer(s) | BackendPayload::Text(s) => s,
            BackendPayload::Choice(choice) => choice
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(truthy_text)
                .or_else(|| choice.get("text").and_then(truthy_text))
                .unwrap_or_else(|| to_json_text(&choice)),
            BackendPayload::Unrecognized(raw) => to_json_text(&raw),
        }
    }
}

/// Convert an arbitrary backend payload into a display string.
pub fn normalize(raw: Value) -> String {
    BackendPayload::classify(raw).into_text()
}

/// Values that count as present: non-empty strings, non-zero numbers,
/// `true`, and any array or object.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_text(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(to_json_text(other)),
    }
}

fn to_json_text(value: &Value) -> String {
    // Serializing a `Value` cannot fail; the fallback only satisfies the type.
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_is_verbatim() {
        assert_eq!(normalize(json!("hi")), "hi");
        assert_eq!(normalize(json!("")), "");
    }

    #[test]
    fn test_answer_field() {
        assert_eq!(normalize(json!({"answer": "x"})), "x");
        assert_eq!(normalize(json!({"answer": "x", "text": "y"})), "x");
    }

    #[test]
    fn test_text_field() {
        assert_eq!(normalize(json!({"text": "y"})), "y");
    }

    #[test]
    fn test_empty_answer_falls_through_to_text() {
        assert_eq!(normalize(json!({"answer": "", "text": "fallback"})), "fallback");
    }

    #[test]
    fn test_non_string_answer_is_rendered_as_json() {
        assert_eq!(normalize(json!({"answer": 42})), "42");
        assert_eq!(normalize(json!({"answer": ["a", "b"]})), r#"["a","b"]"#);
    }

    #[test]
    fn test_choices_message_content() {
        let raw = json!({"choices": [{"message": {"content": "y"}}]});
        assert_eq!(normalize(raw), "y");
    }

    #[test]
    fn test_choices_flat_text() {
        let raw = json!({"choices": [{"text": "completion"}, {"text": "ignored"}]});
        assert_eq!(normalize(raw), "completion");
    }

    #[test]
    fn test_choices_unknown_element_is_serialized() {
        let raw = json!({"choices": [{"delta": "z"}]});
        assert_eq!(normalize(raw), r#"{"delta":"z"}"#);
    }

    #[test]
    fn test_empty_choices_serializes_payload() {
        let raw = json!({"choices": []});
        assert_eq!(normalize(raw), r#"{"choices":[]}"#);
    }

    #[test]
    fn test_unrecognized_object_contains_keys() {
        let text = normalize(json!({"foo": 1}));
        assert!(text.contains("foo"));
    }

    #[test]
    fn test_null_and_scalars() {
        assert_eq!(normalize(Value::Null), "null");
        assert_eq!(normalize(json!(3.5)), "3.5");
        assert_eq!(normalize(json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_classify_tags() {
        assert_eq!(BackendPayload::classify(json!("a")), BackendPayload::Plain("a".into()));
        assert_eq!(
            BackendPayload::classify(json!({"answer": "a"})),
            BackendPayload::Answer("a".into())
        );
        assert_eq!(
            BackendPayload::classify(json!({"text": "a"})),
            BackendPayload::Text("a".into())
        );
        assert!(matches!(
            BackendPayload::classify(json!({"choices": [{"text": "a"}]})),
            BackendPayload::Choice(_)
        ));
        assert!(matches!(
            BackendPayload::classify(json!({"choices": [null]})),
            BackendPayload::Unrecognized(_)
        ));
    }
}
