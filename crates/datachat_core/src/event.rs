//! Decoding of server-push payloads into [`StreamEvent`].
//!
//! Decoding happens once at the channel boundary; downstream code never
//! inspects the raw optional fields.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::answer::ContentKind;
use crate::error::StreamParseError;

/// Terminal marker sent as a bare event payload.
pub const DONE_SENTINEL: &str = "[DONE]";

lazy_static! {
    static ref FRAMING_PREFIX: Regex = Regex::new(r"^data:\s*").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of answer text. `text` may be empty.
    Fragment { text: String, kind: ContentKind },
    /// Server-reported application error.
    Error(String),
    /// End of answer.
    Done,
}

/// How a payload was decoded, kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRoute {
    Direct,
    Recovered,
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(default)]
    text: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

impl StreamEvent {
    /// Decode one event payload.
    ///
    /// A payload that is not valid JSON gets a second attempt after removing
    /// a leading `data:` framing prefix and surrounding whitespace.
    pub fn decode(raw: &str) -> Result<(StreamEvent, DecodeRoute), StreamParseError> {
        if raw == DONE_SENTINEL {
            return Ok((StreamEvent::Done, DecodeRoute::Direct));
        }

        let (payload, route) = match serde_json::from_str::<WirePayload>(raw) {
            Ok(payload) => (payload, DecodeRoute::Direct),
            Err(first) => {
                let cleaned = FRAMING_PREFIX.replace(raw, "");
                let cleaned = cleaned.trim();
                match serde_json::from_str::<WirePayload>(cleaned) {
                    Ok(payload) => (payload, DecodeRoute::Recovered),
                    Err(second) => {
                        return Err(StreamParseError {
                            raw: raw.to_string(),
                            reason: format!("{first}; after cleanup: {second}"),
                        })
                    }
                }
            }
        };

        Ok((payload.into_event(), route))
    }
}

impl WirePayload {
    fn into_event(self) -> StreamEvent {
        if let Some(message) = self.error.as_ref().and_then(value_text) {
            return StreamEvent::Error(message);
        }

        let kind = match self.kind.as_deref() {
            Some("thinking") => ContentKind::Thinking,
            _ => ContentKind::Plain,
        };
        let text = self.text.as_ref().and_then(value_text).unwrap_or_default();
        StreamEvent::Fragment { text, kind }
    }
}

/// Text of a scalar field; `None` for null, `false` and empty strings.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
