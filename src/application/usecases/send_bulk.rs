use std::sync::Arc;

use crate::{
    application::handlers::batch_dispatcher::{BatchDispatcher, BulkDispatchReport},
    domain::{
        errors::DomainError,
        models::{CampaignRef, SendRequest},
    },
};

pub struct BulkMessage {
    pub to: Option<String>,
    pub template_name: Option<String>,
    pub message_text: Option<String>,
    pub language_code: Option<String>,
    pub components: Option<Vec<serde_json::Value>>,
    pub contact_id: Option<i64>,
}

pub struct SendBulkRequest {
    pub messages: Vec<BulkMessage>,
    pub campaign_id: Option<i64>,
}

pub struct SendBulkUseCase {
    dispatcher: Arc<BatchDispatcher>,
}

impl SendBulkUseCase {
    pub fn new(dispatcher: Arc<BatchDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn execute(&self, request: SendBulkRequest) -> Result<BulkDispatchReport, DomainError> {
        let campaign_id = request.campaign_id;
        let requests = request
            .messages
            .into_iter()
            .map(|message| {
                let send = SendRequest::from_parts(
                    message.to.unwrap_or_default(),
                    message.template_name,
                    message.message_text,
                    message.language_code,
                    message.components,
                );
                match (campaign_id, message.contact_id) {
                    (Some(campaign_id), Some(contact_id)) => send.for_campaign(CampaignRef {
                        campaign_id,
                        contact_id,
                    }),
                    _ => send,
                }
            })
            .collect();

        self.dispatcher.dispatch_bulk(requests).await
    }
}
