use serde::{Deserialize, Serialize};

use crate::models::{Channel, Message, nullable_vec};

/// Shown when the backend reports an error without a usable message.
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// One record of the upload response body. The backend writes exactly one of
/// these per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    /// Full channel list for the archive. Normally sent once, first.
    Channels {
        #[serde(default, deserialize_with = "nullable_vec")]
        data: Vec<Channel>,
    },

    /// A batch of messages to append to the bucket named `channel`
    Messages { channel: String, data: Vec<Message> },

    /// Application failure reported by the backend mid-stream
    Error {
        #[serde(default)]
        data: ErrorPayload,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorPayload {
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(UNKNOWN_ERROR)
    }
}

impl IngestEvent {
    /// Wire name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Channels { .. } => "channels",
            Self::Messages { .. } => "messages",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_each_record_kind() {
        let channels: IngestEvent = serde_json::from_value(json!({
            "type": "channels",
            "data": [{"id": "c1", "name": "general"}]
        }))
        .unwrap();
        assert_eq!(
            channels,
            IngestEvent::Channels {
                data: vec![Channel { id: "c1".into(), name: "general".into() }]
            }
        );

        let messages: IngestEvent = serde_json::from_value(json!({
            "type": "messages",
            "channel": "general",
            "data": [{"ts": "1", "text": "hi"}]
        }))
        .unwrap();
        match messages {
            IngestEvent::Messages { channel, data } => {
                assert_eq!(channel, "general");
                assert_eq!(data[0].text.as_deref(), Some("hi"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let error: IngestEvent =
            serde_json::from_value(json!({"type": "error", "data": {"message": "boom"}})).unwrap();
        assert_eq!(error.kind(), "error");
    }

    #[test]
    fn error_without_message_falls_back() {
        let event: IngestEvent = serde_json::from_value(json!({"type": "error"})).unwrap();
        match event {
            IngestEvent::Error { data } => assert_eq!(data.message(), UNKNOWN_ERROR),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn messages_without_channel_is_rejected() {
        let result = serde_json::from_value::<IngestEvent>(json!({"type": "messages", "data": []}));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_value::<IngestEvent>(json!({"type": "progress", "data": 3}));
        assert!(result.is_err());
    }
}
