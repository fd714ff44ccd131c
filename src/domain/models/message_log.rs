use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "inbound" => Some(MessageDirection::Inbound),
            "outbound" => Some(MessageDirection::Outbound),
            _ => None,
        }
    }
}

/// One conversational message exchanged with a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub id: Uuid,
    pub contact_id: i64,
    pub direction: MessageDirection,
    pub content: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl MessageLogEntry {
    pub fn new(
        contact_id: i64,
        direction: MessageDirection,
        content: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            direction,
            content,
            received_at,
        }
    }
}
