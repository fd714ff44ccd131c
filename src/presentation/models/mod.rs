use poem_openapi::Enum;

use crate::domain::models::MessageDirection;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageDirectionKind {
    #[oai(rename = "inbound")]
    Inbound,
    #[oai(rename = "outbound")]
    Outbound,
}

impl From<MessageDirection> for MessageDirectionKind {
    fn from(value: MessageDirection) -> Self {
        match value {
            MessageDirection::Inbound => MessageDirectionKind::Inbound,
            MessageDirection::Outbound => MessageDirectionKind::Outbound,
        }
    }
}
