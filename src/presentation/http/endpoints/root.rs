use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::{
    handlers::status_reconciler::StatusReconciler,
    usecases::{
        list_messages::ListMessagesUseCase, send_bulk::SendBulkUseCase,
        send_reply::SendReplyUseCase,
    },
};

#[derive(Clone)]
pub struct ApiState {
    pub send_bulk_usecase: Arc<SendBulkUseCase>,
    pub send_reply_usecase: Arc<SendReplyUseCase>,
    pub list_messages_usecase: Arc<ListMessagesUseCase>,
    pub reconciler: Arc<StatusReconciler>,
    pub verify_token: String,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Messages,
}
