use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery report for a message this service sent earlier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryStatusEvent {
    pub provider_message_id: String,
    pub recipient: Option<String>,
    pub raw_status: String,
    pub error_title: Option<String>,
}

/// A message a user sent to the business number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundMessageEvent {
    pub from: String,
    pub body: Option<String>,
    pub provider_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackEvent {
    DeliveryStatus(DeliveryStatusEvent),
    InboundMessage(InboundMessageEvent),
}
