use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::message::CampaignRef;

/// Why a single send did not produce a provider message id.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SendError {
    #[error("No message content provided")]
    NoContent,
    #[error("No recipient address provided")]
    MissingRecipient,
    #[error("network error: {message}")]
    Network { message: String },
    /// Non-success response; `body` is whatever the provider returned.
    #[error("provider rejected message (HTTP {status}): {body}")]
    Provider { status: u16, body: serde_json::Value },
    #[error("{message}")]
    Internal { message: String },
}

impl SendError {
    pub fn kind(&self) -> &'static str {
        match self {
            SendError::NoContent => "no_content",
            SendError::MissingRecipient => "missing_recipient",
            SendError::Network { .. } => "network",
            SendError::Provider { .. } => "provider",
            SendError::Internal { .. } => "internal",
        }
    }

    /// Structured detail for API responses.
    pub fn detail(&self) -> serde_json::Value {
        match self {
            SendError::NoContent | SendError::MissingRecipient => {
                serde_json::Value::String(self.to_string())
            }
            SendError::Network { message } | SendError::Internal { message } => {
                serde_json::json!({ "message": message })
            }
            SendError::Provider { body, .. } => body.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendOutcome {
    pub to: String,
    pub campaign: Option<CampaignRef>,
    pub result: Result<String, SendError>,
}

impl SendOutcome {
    pub fn sent(to: impl Into<String>, campaign: Option<CampaignRef>, message_id: String) -> Self {
        Self {
            to: to.into(),
            campaign,
            result: Ok(message_id),
        }
    }

    pub fn failed(to: impl Into<String>, campaign: Option<CampaignRef>, error: SendError) -> Self {
        Self {
            to: to.into(),
            campaign,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn provider_message_id(&self) -> Option<&str> {
        self.result.as_ref().ok().map(String::as_str)
    }

    pub fn error(&self) -> Option<&SendError> {
        self.result.as_ref().err()
    }
}
