use chrono::{DateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::domain::events::{CallbackEvent, DeliveryStatusEvent, InboundMessageEvent};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("malformed callback payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Flattens every `entry[].changes[].value` of a webhook delivery into
/// callback events, inbound messages first within each change.
///
/// Only an unreadable envelope is an error. A single message or status that
/// does not have the expected shape is logged and skipped.
pub fn parse_callback(body: &[u8]) -> Result<Vec<CallbackEvent>, CallbackError> {
    let payload: WebhookPayload = serde_json::from_slice(body)?;

    let events = payload
        .entry
        .into_iter()
        .flat_map(|entry| entry.changes)
        .filter_map(|change| change.value)
        .flat_map(|value| {
            let inbound = value
                .messages
                .into_iter()
                .filter_map(|raw| element::<WebhookMessage>(raw, "message"))
                .map(|message| {
                    CallbackEvent::InboundMessage(InboundMessageEvent {
                        from: message.from,
                        body: message.text.map(|text| text.body),
                        provider_timestamp: message.timestamp.as_deref().and_then(parse_timestamp),
                    })
                });
            let statuses = value
                .statuses
                .into_iter()
                .filter_map(|raw| element::<WebhookStatus>(raw, "status"))
                .map(|status| {
                    CallbackEvent::DeliveryStatus(DeliveryStatusEvent {
                        provider_message_id: status.id,
                        recipient: status.recipient_id,
                        raw_status: status.status,
                        error_title: status.errors.into_iter().next().and_then(|e| e.title),
                    })
                });
            inbound.chain(statuses).collect::<Vec<_>>()
        })
        .collect();

    Ok(events)
}

fn element<T: DeserializeOwned>(raw: Value, kind: &'static str) -> Option<T> {
    match serde_json::from_value(raw) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(kind, error = %err, "skipping malformed callback element");
            None
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
struct WebhookChange {
    value: Option<ChangeValue>,
}

#[derive(Debug, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    statuses: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    from: String,
    timestamp: Option<String>,
    text: Option<WebhookText>,
}

#[derive(Debug, Deserialize)]
struct WebhookText {
    body: String,
}

#[derive(Debug, Deserialize)]
struct WebhookStatus {
    id: String,
    status: String,
    recipient_id: Option<String>,
    #[serde(default)]
    errors: Vec<WebhookError>,
}

#[derive(Debug, Deserialize)]
struct WebhookError {
    title: Option<String>,
}
