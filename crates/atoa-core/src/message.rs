//! Envelope for messages exchanged between agents inside a session.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message sent from one agent to another within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2AMessage {
    pub session_id: String,
    pub from_agent_id: String,
    pub to_agent_id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    /// Opaque, sender-defined body.
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl A2AMessage {
    /// Create a message stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        from_agent_id: impl Into<String>,
        to_agent_id: impl Into<String>,
        message_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            from_agent_id: from_agent_id.into(),
            to_agent_id: to_agent_id.into(),
            message_type: message_type.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Check that all routing fields are populated and a payload is present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_id.is_empty() {
            return Err(ValidationError::missing("session_id"));
        }
        if self.from_agent_id.is_empty() {
            return Err(ValidationError::missing("from_agent_id"));
        }
        if self.to_agent_id.is_empty() {
            return Err(ValidationError::missing("to_agent_id"));
        }
        if self.message_type.is_empty() {
            return Err(ValidationError::missing("type"));
        }
        if self.payload.is_null() {
            return Err(ValidationError::missing("payload"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> A2AMessage {
        A2AMessage::new(
            "session-abc",
            "agent-1",
            "agent-2",
            "text",
            json!({"text": "hello"}),
        )
    }

    #[test]
    fn test_valid_message() {
        assert!(message().validate().is_ok());
    }

    #[test]
    fn test_missing_routing_fields() {
        let mut msg = message();
        msg.from_agent_id.clear();
        assert_eq!(
            msg.validate(),
            Err(ValidationError::MissingField {
                field: "from_agent_id"
            })
        );

        let mut msg = message();
        msg.message_type.clear();
        assert_eq!(
            msg.validate(),
            Err(ValidationError::MissingField { field: "type" })
        );
    }

    #[test]
    fn test_missing_payload() {
        let raw = json!({
            "session_id": "session-abc",
            "from_agent_id": "agent-1",
            "to_agent_id": "agent-2",
            "type": "text",
            "timestamp": "2026-01-01T00:00:00Z"
        });
        let msg: A2AMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(
            msg.validate(),
            Err(ValidationError::MissingField { field: "payload" })
        );
    }

    #[test]
    fn test_missing_timestamp_fails_to_decode() {
        let raw = json!({
            "session_id": "session-abc",
            "from_agent_id": "agent-1",
            "to_agent_id": "agent-2",
            "type": "text",
            "payload": {}
        });
        assert!(serde_json::from_value::<A2AMessage>(raw).is_err());
    }
}
