use poem_openapi::Object;

#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct BulkMessageDto {
    pub to: Option<String>,
    pub template_name: Option<String>,
    pub message_text: Option<String>,
    pub language_code: Option<String>,
    pub components: Option<Vec<serde_json::Value>>,
    /// Numeric id or numeric string; anything else sends without ledger tracking.
    pub contact_id: Option<serde_json::Value>,
}

#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct BulkSendRequestDto {
    pub messages: Vec<BulkMessageDto>,
    pub campaign_id: Option<i64>,
}

#[derive(Object, Debug)]
pub struct ReplyRequestDto {
    #[oai(validator(min_length = 1))]
    pub to: String,
    #[oai(validator(min_length = 1, max_length = 4096))]
    pub message: String,
}
