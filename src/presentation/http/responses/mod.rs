use poem_openapi::{ApiResponse, Object, payload::Json};
use uuid::Uuid;

use crate::presentation::models::MessageDirectionKind;

#[derive(Object)]
pub struct SendErrorDto {
    pub to: String,
    pub kind: String,
    pub detail: serde_json::Value,
}

#[derive(Object)]
#[oai(rename_all = "camelCase")]
pub struct BulkSendResponseDto {
    pub success: bool,
    pub sent: u32,
    pub failed: u32,
    pub errors: Vec<SendErrorDto>,
    pub total: u32,
    pub campaign_id: Option<i64>,
}

#[derive(Object)]
#[oai(rename_all = "camelCase")]
pub struct ReplyResponseDto {
    pub success: bool,
    pub message_id: String,
}

#[derive(Object)]
pub struct ReplyFailureDto {
    pub success: bool,
    pub kind: String,
    pub detail: serde_json::Value,
}

#[derive(ApiResponse)]
pub enum ReplyResponse {
    /// Message accepted by the provider.
    #[oai(status = 200)]
    Sent(Json<ReplyResponseDto>),
    /// The provider or the transport rejected the message.
    #[oai(status = 500)]
    Failed(Json<ReplyFailureDto>),
}

#[derive(Object)]
#[oai(rename_all = "camelCase")]
pub struct MessageLogDto {
    pub id: Uuid,
    pub contact_id: i64,
    pub direction: MessageDirectionKind,
    pub content: Option<String>,
    pub received_at: String,
}
