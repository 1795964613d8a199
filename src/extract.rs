//! Request content extraction
//!
//! Pulls the text to classify out of a chat-style JSON request body. Any
//! failure yields `None`, which sends the router down the default-only path.

use serde_json::Value;
use tracing::debug;

/// Text of the request to classify, if one can be found
///
/// - `messages` array: content of the last `user` message
/// - `messages` object: its `content`
///
/// Content may be a string or an array of parts, in which case the `text`
/// parts are joined with newlines.
pub fn extract_request_content(body: &str) -> Option<String> {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            debug!(error = %e, "Request body is not JSON; skipping classification");
            return None;
        }
    };

    let content = match json.get("messages")? {
        Value::Array(messages) => messages
            .iter()
            .rev()
            .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
            .and_then(|m| m.get("content"))
            .and_then(content_text),
        Value::Object(message) => message.get("content").and_then(content_text),
        _ => None,
    }?;

    if content.trim().is_empty() {
        None
    } else {
        Some(content)
    }
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter(|p| p.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
        _ => None,
    }
}
