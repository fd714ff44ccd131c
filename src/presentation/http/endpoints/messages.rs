use std::sync::Arc;

use poem::{Result as PoemResult, http::StatusCode};
use poem_openapi::{OpenApi, payload::Json};

use crate::{
    application::usecases::{send_bulk::SendBulkRequest, send_reply::SendReplyRequest},
    domain::errors::DomainError,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::{map_bulk_message, map_bulk_report, map_message, map_reply_failure},
        requests::{BulkSendRequestDto, ReplyRequestDto},
        responses::{BulkSendResponseDto, MessageLogDto, ReplyResponse, ReplyResponseDto},
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    /// Sends a campaign in paced batches and reports per-recipient failures.
    #[oai(
        path = "/send-messages-bulk",
        method = "post",
        tag = EndpointsTags::Messages,
    )]
    pub async fn send_bulk(
        &self,
        request: Json<BulkSendRequestDto>,
    ) -> PoemResult<Json<BulkSendResponseDto>> {
        let Json(request) = request;
        let campaign_id = request.campaign_id;
        let payload = SendBulkRequest {
            messages: request.messages.into_iter().map(map_bulk_message).collect(),
            campaign_id,
        };

        let report = self
            .state
            .send_bulk_usecase
            .execute(payload)
            .await
            .map_err(domain_error)?;

        Ok(Json(map_bulk_report(&report, campaign_id)))
    }

    #[oai(path = "/reply", method = "post", tag = EndpointsTags::Messages)]
    pub async fn reply(&self, request: Json<ReplyRequestDto>) -> ReplyResponse {
        let Json(request) = request;
        let sent = self
            .state
            .send_reply_usecase
            .execute(SendReplyRequest {
                to: request.to,
                message: request.message,
            })
            .await;

        match sent {
            Ok(message_id) => ReplyResponse::Sent(Json(ReplyResponseDto {
                success: true,
                message_id,
            })),
            Err(err) => ReplyResponse::Failed(Json(map_reply_failure(&err))),
        }
    }

    /// The 100 most recent inbound and outbound messages, newest first.
    #[oai(path = "/messages", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_messages(&self) -> PoemResult<Json<Vec<MessageLogDto>>> {
        let messages = self
            .state
            .list_messages_usecase
            .execute()
            .await
            .map_err(internal_error)?;

        Ok(Json(messages.iter().map(map_message).collect()))
    }
}

fn internal_error(err: anyhow::Error) -> poem::Error {
    poem::Error::from_string(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}

fn domain_error(err: DomainError) -> poem::Error {
    match err {
        DomainError::Validation(_) => poem::Error::from_string(err.to_string(), StatusCode::BAD_REQUEST),
        DomainError::CorrelationMiss(_) => {
            poem::Error::from_string(err.to_string(), StatusCode::NOT_FOUND)
        }
        DomainError::Persistence(err) => internal_error(err),
    }
}
