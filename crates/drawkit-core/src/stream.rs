//! Stream payloads.
//!
//! A live job feed carries two kinds of message:
//!
//! - named progress events, `{"event": "seed", "data": {...}}`
//! - validation failures, `{"detail": [{"loc": [...], "msg": ..., "type": ...}]}`
//!
//! [`StreamMessage`] covers both. The kind is picked by which field is present;
//! both kinds are accepted on WebSocket and SSE feeds alike.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JsonMap;
use crate::error::{ContractError, json_kind};
use crate::sse::SseFrame;

/// Event name used when a feed does not name its messages.
pub const DEFAULT_EVENT: &str = "message";

/// Known event names. Unknown names are kept verbatim in [`EventKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Entropy,
    Whitening,
    Seed,
    Draw,
    Tests,
    Final,
    Message,
    Other(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "entropy" => Self::Entropy,
            "whitening" => Self::Whitening,
            "seed" => Self::Seed,
            "draw" => Self::Draw,
            "tests" => Self::Tests,
            "final" => Self::Final,
            "message" => Self::Message,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Entropy => "entropy",
            Self::Whitening => "whitening",
            Self::Seed => "seed",
            Self::Draw => "draw",
            Self::Tests => "tests",
            Self::Final => "final",
            Self::Message => "message",
            Self::Other(name) => name,
        }
    }

    /// Pipeline stages reported while a draw is running.
    pub fn is_stage(&self) -> bool {
        matches!(
            self,
            Self::Entropy | Self::Whitening | Self::Seed | Self::Draw | Self::Tests
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named event from a live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub event: String,
    #[serde(default)]
    pub data: JsonMap,
}

impl StreamEvent {
    /// Build an event; a non-object payload is wrapped as `{"value": ...}`.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data: into_map(data),
        }
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.event)
    }

    /// `final` closes the feed.
    pub fn is_final(&self) -> bool {
        self.kind() == EventKind::Final
    }
}

/// One segment of an issue location: a field name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    Index(u64),
    Key(String),
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

/// A single validation problem reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "loc", alias = "location", default)]
    pub location: Vec<LocSegment>,
    #[serde(rename = "msg", alias = "message")]
    pub message: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            return f.write_str(&self.message);
        }
        let path: Vec<String> = self.location.iter().map(ToString::to_string).collect();
        write!(f, "{}: {}", path.join("."), self.message)
    }
}

/// Validation failure payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(rename = "detail", alias = "issues")]
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Read a `{"detail": ...}` / `{"issues": ...}` body.
    ///
    /// A plain-string `detail` becomes a single issue without a location.
    pub fn from_value(value: &Value) -> Option<Self> {
        let detail = value.get("detail").or_else(|| value.get("issues"))?;
        match detail {
            Value::String(msg) => Some(Self {
                issues: vec![ValidationIssue {
                    location: Vec::new(),
                    message: msg.clone(),
                    kind: "error".to_string(),
                }],
            }),
            Value::Array(_) => serde_json::from_value(detail.clone())
                .ok()
                .map(|issues| Self { issues }),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Anything that can arrive on a live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Event(StreamEvent),
    ValidationError(ValidationError),
}

impl StreamMessage {
    /// Decode a WebSocket text frame.
    pub fn from_json(text: &str) -> Result<Self, ContractError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Classify an already-parsed JSON message.
    ///
    /// Objects with an `event` field are events; objects with `detail` or
    /// `issues` are validation errors; any other object is an unnamed
    /// `message` event carrying the whole object.
    pub fn from_value(value: Value) -> Result<Self, ContractError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => return Err(ContractError::NotAnObject(json_kind(&other))),
        };

        if let Some(Value::String(name)) = obj.get("event") {
            let name = name.clone();
            let data = obj.remove("data").unwrap_or(Value::Object(JsonMap::new()));
            return Ok(Self::Event(StreamEvent::new(name, data)));
        }

        let value = Value::Object(obj);
        if let Some(err) = ValidationError::from_value(&value) {
            return Ok(Self::ValidationError(err));
        }
        Ok(Self::Event(StreamEvent::new(DEFAULT_EVENT, value)))
    }

    /// Decode an SSE frame. The event name comes from the frame's `event:`
    /// line, defaulting to `message`.
    pub fn from_sse(frame: &SseFrame) -> Result<Self, ContractError> {
        let value: Value = serde_json::from_str(&frame.data)?;
        if let Some(err) = ValidationError::from_value(&value) {
            return Ok(Self::ValidationError(err));
        }
        let name = frame.event.as_deref().unwrap_or(DEFAULT_EVENT);
        Ok(Self::Event(StreamEvent::new(name, value)))
    }

    pub fn as_event(&self) -> Option<&StreamEvent> {
        match self {
            Self::Event(e) => Some(e),
            Self::ValidationError(_) => None,
        }
    }

    /// Nothing useful follows this message on the same feed.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Event(e) => e.is_final(),
            Self::ValidationError(_) => true,
        }
    }
}

fn into_map(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        Value::Null => JsonMap::new(),
        other => {
            let mut map = JsonMap::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_kind_round_trips_known_names() {
        for name in ["entropy", "whitening", "seed", "draw", "tests", "final", "message"] {
            assert_eq!(EventKind::from_name(name).as_str(), name);
        }
        assert_eq!(
            EventKind::from_name("heartbeat"),
            EventKind::Other("heartbeat".into())
        );
    }

    #[test]
    fn stage_kinds() {
        assert!(EventKind::Seed.is_stage());
        assert!(!EventKind::Final.is_stage());
        assert!(!EventKind::Message.is_stage());
    }

    #[test]
    fn named_event_from_ws_text() {
        let msg = StreamMessage::from_json(r#"{"event":"seed","data":{"seed":"abcd"}}"#).unwrap();
        let ev = msg.as_event().unwrap();
        assert_eq!(ev.kind(), EventKind::Seed);
        assert_eq!(ev.data["seed"], "abcd");
        assert!(!msg.is_terminal());
    }

    #[test]
    fn event_without_data_has_empty_map() {
        let msg = StreamMessage::from_json(r#"{"event":"final"}"#).unwrap();
        let ev = msg.as_event().unwrap();
        assert!(ev.data.is_empty());
        assert!(msg.is_terminal());
    }

    #[test]
    fn scalar_data_is_wrapped() {
        let msg = StreamMessage::from_json(r#"{"event":"entropy","data":0.93}"#).unwrap();
        assert_eq!(msg.as_event().unwrap().data["value"], json!(0.93));
    }

    #[test]
    fn validation_error_from_detail_list() {
        let msg = StreamMessage::from_json(
            r#"{"detail":[{"loc":["body","numbers",2],"msg":"value is not a valid integer","type":"type_error.integer"}]}"#,
        )
        .unwrap();
        let StreamMessage::ValidationError(err) = &msg else {
            panic!("expected validation error, got {msg:?}");
        };
        assert_eq!(err.issues.len(), 1);
        let issue = &err.issues[0];
        assert_eq!(
            issue.location,
            vec![
                LocSegment::Key("body".into()),
                LocSegment::Key("numbers".into()),
                LocSegment::Index(2)
            ]
        );
        assert_eq!(issue.kind, "type_error.integer");
        assert_eq!(err.to_string(), "body.numbers.2: value is not a valid integer");
        assert!(msg.is_terminal());
    }

    #[test]
    fn validation_error_from_issues_alias() {
        let value = json!({"issues": [{"location": ["bits"], "message": "too short", "kind": "value_error"}]});
        let err = ValidationError::from_value(&value).unwrap();
        assert_eq!(err.issues[0].message, "too short");
        // serializes back in the backend's field names
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"detail": [{"loc": ["bits"], "msg": "too short", "type": "value_error"}]})
        );
    }

    #[test]
    fn string_detail_becomes_single_issue() {
        let err = ValidationError::from_value(&json!({"detail": "Job not found"})).unwrap();
        assert_eq!(err.to_string(), "Job not found");
    }

    #[test]
    fn unnamed_object_is_message_event() {
        let msg = StreamMessage::from_json(r#"{"progress":0.5}"#).unwrap();
        let ev = msg.as_event().unwrap();
        assert_eq!(ev.kind(), EventKind::Message);
        assert_eq!(ev.data["progress"], json!(0.5));
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(matches!(
            StreamMessage::from_json("[1,2]"),
            Err(ContractError::NotAnObject("array"))
        ));
        assert!(matches!(
            StreamMessage::from_json("{oops"),
            Err(ContractError::Decode(_))
        ));
    }

    #[test]
    fn sse_frame_uses_event_line() {
        let frame = SseFrame {
            event: Some("whitening".into()),
            data: r#"{"method":"sha256"}"#.into(),
            id: None,
        };
        let msg = StreamMessage::from_sse(&frame).unwrap();
        let ev = msg.as_event().unwrap();
        assert_eq!(ev.kind(), EventKind::Whitening);
        assert_eq!(ev.data["method"], "sha256");
    }

    #[test]
    fn sse_frame_without_event_is_message() {
        let frame = SseFrame {
            event: None,
            data: "42".into(),
            id: None,
        };
        let msg = StreamMessage::from_sse(&frame).unwrap();
        let ev = msg.as_event().unwrap();
        assert_eq!(ev.event, DEFAULT_EVENT);
        assert_eq!(ev.data["value"], json!(42));
    }

    #[test]
    fn sse_frame_with_detail_is_validation_error() {
        let frame = SseFrame {
            event: Some("error".into()),
            data: r#"{"detail":[{"loc":["query","job_id"],"msg":"field required","type":"value_error.missing"}]}"#.into(),
            id: None,
        };
        assert!(matches!(
            StreamMessage::from_sse(&frame).unwrap(),
            StreamMessage::ValidationError(_)
        ));
    }

    #[test]
    fn message_serializes_untagged() {
        let msg = StreamMessage::Event(StreamEvent::new("draw", json!({"draw": [1]})));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "draw", "data": {"draw": [1]}})
        );
    }
}
