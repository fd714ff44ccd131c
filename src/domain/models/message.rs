use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Identifies the ledger entry a send belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CampaignRef {
    pub campaign_id: i64,
    pub contact_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateMessage {
    pub name: String,
    pub language_code: String,
    #[serde(default)]
    pub components: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Template(TemplateMessage),
    FreeText { body: String },
}

/// One outbound message as submitted by a caller.
///
/// A request without content is still dispatched; the gateway rejects it with
/// `NoContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendRequest {
    pub to: String,
    pub content: Option<MessageContent>,
    pub campaign: Option<CampaignRef>,
}

impl SendRequest {
    pub fn template(
        to: impl Into<String>,
        name: impl Into<String>,
        language_code: impl Into<String>,
        components: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            to: to.into(),
            content: Some(MessageContent::Template(TemplateMessage {
                name: name.into(),
                language_code: language_code.into(),
                components,
            })),
            campaign: None,
        }
    }

    pub fn free_text(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            content: Some(MessageContent::FreeText { body: body.into() }),
            campaign: None,
        }
    }

    /// Builds a request from loosely-typed caller input. A template name takes
    /// precedence over body text; blank values count as absent.
    pub fn from_parts(
        to: impl Into<String>,
        template_name: Option<String>,
        message_text: Option<String>,
        language_code: Option<String>,
        components: Option<Vec<serde_json::Value>>,
    ) -> Self {
        let template_name = template_name.filter(|name| !name.trim().is_empty());
        let message_text = message_text.filter(|text| !text.trim().is_empty());

        let content = match (template_name, message_text) {
            (Some(name), _) => Some(MessageContent::Template(TemplateMessage {
                name,
                language_code: language_code
                    .filter(|code| !code.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string()),
                components: components.unwrap_or_default(),
            })),
            (None, Some(body)) => Some(MessageContent::FreeText { body }),
            (None, None) => None,
        };

        Self {
            to: to.into(),
            content,
            campaign: None,
        }
    }

    pub fn for_campaign(mut self, campaign: CampaignRef) -> Self {
        self.campaign = Some(campaign);
        self
    }
}
