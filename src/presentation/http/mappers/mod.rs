use crate::{
    application::{handlers::batch_dispatcher::BulkDispatchReport, usecases::send_bulk::BulkMessage},
    domain::models::{MessageLogEntry, SendError},
    presentation::http::{
        requests::BulkMessageDto,
        responses::{BulkSendResponseDto, MessageLogDto, ReplyFailureDto, SendErrorDto},
    },
};

pub fn map_bulk_message(dto: BulkMessageDto) -> BulkMessage {
    BulkMessage {
        to: dto.to,
        template_name: dto.template_name,
        message_text: dto.message_text,
        language_code: dto.language_code,
        components: dto.components,
        contact_id: dto.contact_id.as_ref().and_then(contact_id),
    }
}

fn contact_id(raw: &serde_json::Value) -> Option<i64> {
    match raw {
        serde_json::Value::Number(number) => number.as_i64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn map_bulk_report(report: &BulkDispatchReport, campaign_id: Option<i64>) -> BulkSendResponseDto {
    BulkSendResponseDto {
        success: true,
        sent: report.sent,
        failed: report.failed,
        errors: report
            .errors
            .iter()
            .map(|failure| SendErrorDto {
                to: failure.to.clone(),
                kind: failure.error.kind().to_string(),
                detail: failure.error.detail(),
            })
            .collect(),
        total: report.total,
        campaign_id,
    }
}

pub fn map_message(entry: &MessageLogEntry) -> MessageLogDto {
    MessageLogDto {
        id: entry.id,
        contact_id: entry.contact_id,
        direction: entry.direction.into(),
        content: entry.content.clone(),
        received_at: entry.received_at.to_rfc3339(),
    }
}

pub fn map_reply_failure(err: &SendError) -> ReplyFailureDto {
    ReplyFailureDto {
        success: false,
        kind: err.kind().to_string(),
        detail: err.detail(),
    }
}
