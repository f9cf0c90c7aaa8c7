//! Content extraction from the response shapes served by OpenAI-compatible,
//! OpenWebUI and Ollama endpoints. Extractors are tried in order and the
//! first non-empty string wins.

use serde_json::Value;

pub type Extractor = fn(&Value) -> Option<&str>;

fn choice_delta(v: &Value) -> Option<&str> {
    v.pointer("/choices/0/delta/content")?.as_str()
}

fn choice_message(v: &Value) -> Option<&str> {
    v.pointer("/choices/0/message/content")?.as_str()
}

fn choice_text(v: &Value) -> Option<&str> {
    v.pointer("/choices/0/text")?.as_str()
}

fn top_content(v: &Value) -> Option<&str> {
    v.get("content")?.as_str()
}

fn ollama_response(v: &Value) -> Option<&str> {
    v.get("response")?.as_str()
}

fn ollama_message(v: &Value) -> Option<&str> {
    v.pointer("/message/content")?.as_str()
}

/// Order used for streamed fragments.
pub const STREAM_EXTRACTORS: &[Extractor] = &[
    choice_delta,
    choice_message,
    top_content,
    ollama_response,
    ollama_message,
];

/// Order used for a complete (non-streamed) body.
pub const BUFFERED_EXTRACTORS: &[Extractor] = &[
    choice_message,
    choice_text,
    top_content,
    ollama_response,
    ollama_message,
];

pub fn first_content<'a>(value: &'a Value, extractors: &[Extractor]) -> Option<&'a str> {
    extractors
        .iter()
        .filter_map(|extract| extract(value))
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_shapes() {
        let cases = [
            (json!({"choices": [{"delta": {"content": "a"}}]}), "a"),
            (json!({"choices": [{"message": {"content": "b"}}]}), "b"),
            (json!({"content": "c"}), "c"),
            (json!({"response": "d", "done": false}), "d"),
            (json!({"message": {"role": "assistant", "content": "e"}}), "e"),
        ];
        for (value, expected) in cases {
            assert_eq!(first_content(&value, STREAM_EXTRACTORS), Some(expected));
        }
    }

    #[test]
    fn test_empty_delta_falls_through() {
        let value = json!({"choices": [{"delta": {"content": ""}}], "response": "x"});
        assert_eq!(first_content(&value, STREAM_EXTRACTORS), Some("x"));
        let value = json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(first_content(&value, STREAM_EXTRACTORS), None);
    }

    #[test]
    fn test_buffered_prefers_message_then_text() {
        let value = json!({"choices": [{"text": "legacy"}]});
        assert_eq!(first_content(&value, BUFFERED_EXTRACTORS), Some("legacy"));
        let value = json!({"choices": [{"message": {"content": "hello"}, "text": "legacy"}]});
        assert_eq!(first_content(&value, BUFFERED_EXTRACTORS), Some("hello"));
        assert_eq!(first_content(&json!({"id": 1}), BUFFERED_EXTRACTORS), None);
    }
}
