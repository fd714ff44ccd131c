use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::{
    application::services::provider::ProviderGateway,
    domain::{
        models::{MessageDirection, MessageLogEntry, SendError, SendRequest},
        repositories::{ContactDirectory, MessageLogRepository},
    },
};

pub struct SendReplyRequest {
    pub to: String,
    pub message: String,
}

pub struct SendReplyUseCase {
    gateway: Arc<dyn ProviderGateway>,
    contacts: Arc<dyn ContactDirectory>,
    message_log: Arc<dyn MessageLogRepository>,
}

impl SendReplyUseCase {
    pub fn new(
        gateway: Arc<dyn ProviderGateway>,
        contacts: Arc<dyn ContactDirectory>,
        message_log: Arc<dyn MessageLogRepository>,
    ) -> Self {
        Self {
            gateway,
            contacts,
            message_log,
        }
    }

    /// Sends one free-text message and, when the recipient is a known
    /// contact, logs it as outbound.
    pub async fn execute(&self, request: SendReplyRequest) -> Result<String, SendError> {
        let send = SendRequest::free_text(request.to.clone(), request.message.clone());
        let message_id = self.gateway.send(&send).await.result?;

        if let Err(err) = self.log_outbound(&request).await {
            warn!(to = %request.to, error = %err, "failed to log outbound reply");
        }
        Ok(message_id)
    }

    async fn log_outbound(&self, request: &SendReplyRequest) -> anyhow::Result<()> {
        let Some(contact_id) = self.contacts.find_by_phone(&request.to).await? else {
            return Ok(());
        };
        self.message_log
            .insert(MessageLogEntry::new(
                contact_id,
                MessageDirection::Outbound,
                Some(request.message.clone()),
                Utc::now(),
            ))
            .await
    }
}
