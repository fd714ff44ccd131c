use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    application::services::provider::ProviderGateway,
    domain::models::{MessageContent, SendError, SendOutcome, SendRequest},
};

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub base_url: String,
    pub phone_number_id: String,
    pub access_token: String,
    pub timeout: Duration,
}

/// WhatsApp Cloud API client for the `/{phone-number-id}/messages` endpoint.
pub struct WhatsAppClient {
    http: Client,
    messages_url: String,
    access_token: String,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> anyhow::Result<Arc<Self>> {
        let http = Client::builder()
            .user_agent("campaigns/whatsapp")
            .timeout(config.timeout)
            .build()?;

        Ok(Arc::new(Self {
            http,
            messages_url: format!(
                "{}/{}/messages",
                config.base_url.trim_end_matches('/'),
                config.phone_number_id
            ),
            access_token: config.access_token.clone(),
        }))
    }

    async fn post(&self, payload: &OutboundPayload<'_>) -> Result<String, SendError> {
        let response = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            return Err(SendError::Provider {
                status: status.as_u16(),
                body: raw_body(body),
            });
        }

        let parsed: Option<SendResponse> = serde_json::from_str(&body).ok();
        parsed
            .and_then(|parsed| parsed.messages.into_iter().next())
            .map(|message| message.id)
            .ok_or_else(|| SendError::Provider {
                status: status.as_u16(),
                body: raw_body(body),
            })
    }
}

#[async_trait]
impl ProviderGateway for WhatsAppClient {
    async fn send(&self, request: &SendRequest) -> SendOutcome {
        let Some(content) = request.content.as_ref() else {
            return SendOutcome::failed(request.to.clone(), request.campaign, SendError::NoContent);
        };

        let payload = OutboundPayload::new(&request.to, content);
        debug!(to = %request.to, kind = payload.kind, "posting message to provider");

        match self.post(&payload).await {
            Ok(id) => SendOutcome::sent(request.to.clone(), request.campaign, id),
            Err(error) => SendOutcome::failed(request.to.clone(), request.campaign, error),
        }
    }
}

fn network_error(err: reqwest::Error) -> SendError {
    SendError::Network {
        message: err.to_string(),
    }
}

fn raw_body(body: String) -> serde_json::Value {
    serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body))
}

#[derive(Debug, Serialize)]
struct OutboundPayload<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<TemplatePayload<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextPayload<'a>>,
}

impl<'a> OutboundPayload<'a> {
    fn new(to: &'a str, content: &'a MessageContent) -> Self {
        let (kind, template, text) = match content {
            MessageContent::Template(template) => (
                "template",
                Some(TemplatePayload {
                    name: &template.name,
                    language: LanguagePayload {
                        code: &template.language_code,
                    },
                    components: &template.components,
                }),
                None,
            ),
            MessageContent::FreeText { body } => (
                "text",
                None,
                Some(TextPayload {
                    preview_url: false,
                    body,
                }),
            ),
        };

        Self {
            messaging_product: "whatsapp",
            to,
            kind,
            template,
            text,
        }
    }
}

#[derive(Debug, Serialize)]
struct TemplatePayload<'a> {
    name: &'a str,
    language: LanguagePayload<'a>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    components: &'a [serde_json::Value],
}

#[derive(Debug, Serialize)]
struct LanguagePayload<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    preview_url: bool,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[cfg(test)]
mod tests {
    use poem::{
        IntoResponse, Request, Response, Route, Server, handler,
        http::StatusCode,
        listener::{Acceptor, Listener, TcpListener},
        post,
        web::Json,
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::models::CampaignRef;

    const TOKEN: &str = "test-token";

    #[handler]
    fn accept(req: &Request, Json(body): Json<Value>) -> Response {
        let authorized = req
            .headers()
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Bearer test-token");
        if !authorized {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let to = body["to"].as_str().unwrap_or_default();
        Json(json!({
            "messaging_product": "whatsapp",
            "contacts": [{ "input": to, "wa_id": to }],
            "messages": [{ "id": format!("wamid.{to}") }]
        }))
        .into_response()
    }

    #[handler]
    fn reject() -> Response {
        Json(json!({
            "error": {
                "message": "(#132001) Template name does not exist in the translation",
                "type": "OAuthException",
                "code": 132001
            }
        }))
        .with_status(StatusCode::BAD_REQUEST)
        .into_response()
    }

    #[handler]
    fn broken() -> Response {
        "upstream down"
            .with_status(StatusCode::BAD_GATEWAY)
            .into_response()
    }

    #[handler]
    fn empty() -> Response {
        Json(json!({ "messaging_product": "whatsapp" })).into_response()
    }

    async fn provider_stub() -> String {
        let app = Route::new()
            .at("/ok/PHONE/messages", post(accept))
            .at("/reject/PHONE/messages", post(reject))
            .at("/broken/PHONE/messages", post(broken))
            .at("/empty/PHONE/messages", post(empty));
        let acceptor = TcpListener::bind("127.0.0.1:0")
            .into_acceptor()
            .await
            .unwrap();
        let addr = *acceptor.local_addr()[0].0.as_socket_addr().unwrap();
        tokio::spawn(Server::new_with_acceptor(acceptor).run(app));
        format!("http://{addr}")
    }

    fn client(base_url: String) -> Arc<WhatsAppClient> {
        WhatsAppClient::new(&WhatsAppConfig {
            base_url,
            phone_number_id: "PHONE".to_string(),
            access_token: TOKEN.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn template_payload_matches_provider_shape() {
        let request = SendRequest::template(
            "15551234567",
            "hello_world",
            "en",
            vec![json!({ "type": "body", "parameters": [{ "type": "text", "text": "Ada" }] })],
        );
        let payload = OutboundPayload::new(&request.to, request.content.as_ref().unwrap());

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "to": "15551234567",
                "type": "template",
                "template": {
                    "name": "hello_world",
                    "language": { "code": "en" },
                    "components": [
                        { "type": "body", "parameters": [{ "type": "text", "text": "Ada" }] }
                    ]
                }
            })
        );
    }

    #[test]
    fn template_without_components_omits_the_field() {
        let request = SendRequest::template("1555", "hello_world", "en_US", Vec::new());
        let payload = OutboundPayload::new(&request.to, request.content.as_ref().unwrap());
        let value = serde_json::to_value(&payload).unwrap();

        assert!(value["template"].get("components").is_none());
        assert!(value.get("text").is_none());
    }

    #[test]
    fn text_payload_disables_previews() {
        let request = SendRequest::free_text("1555", "hi there");
        let payload = OutboundPayload::new(&request.to, request.content.as_ref().unwrap());

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "to": "1555",
                "type": "text",
                "text": { "preview_url": false, "body": "hi there" }
            })
        );
    }

    #[tokio::test]
    async fn missing_content_fails_without_network_call() {
        // Nothing listens on port 9; a network attempt would surface as Network.
        let client = client("http://127.0.0.1:9".to_string());
        let request = SendRequest::from_parts("1555", None, None, None, None);

        let outcome = client.send(&request).await;

        assert_eq!(outcome.error(), Some(&SendError::NoContent));
    }

    #[tokio::test]
    async fn success_returns_provider_message_id() {
        let base = provider_stub().await;
        let client = client(format!("{base}/ok"));
        let campaign = CampaignRef {
            campaign_id: 1,
            contact_id: 7,
        };
        let request = SendRequest::template("15551234567", "hello_world", "en", Vec::new())
            .for_campaign(campaign);

        let outcome = client.send(&request).await;

        assert_eq!(outcome.provider_message_id(), Some("wamid.15551234567"));
        assert_eq!(outcome.campaign, Some(campaign));
        assert_eq!(outcome.to, "15551234567");
    }

    #[tokio::test]
    async fn provider_error_body_is_passed_through() {
        let base = provider_stub().await;
        let client = client(format!("{base}/reject"));

        let outcome = client
            .send(&SendRequest::template("1555", "nope", "en", Vec::new()))
            .await;

        match outcome.error() {
            Some(SendError::Provider { status, body }) => {
                assert_eq!(*status, 400);
                assert_eq!(body["error"]["code"], json!(132001));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_as_text() {
        let base = provider_stub().await;
        let client = client(format!("{base}/broken"));

        let outcome = client.send(&SendRequest::free_text("1555", "hi")).await;

        assert_eq!(
            outcome.error(),
            Some(&SendError::Provider {
                status: 502,
                body: Value::String("upstream down".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn success_without_message_id_is_a_provider_failure() {
        let base = provider_stub().await;
        let client = client(format!("{base}/empty"));

        let outcome = client.send(&SendRequest::free_text("1555", "hi")).await;

        assert!(matches!(
            outcome.error(),
            Some(SendError::Provider { status: 200, .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_network_failure() {
        let client = client("http://127.0.0.1:9".to_string());

        let outcome = client.send(&SendRequest::free_text("1555", "hi")).await;

        assert!(matches!(outcome.error(), Some(SendError::Network { .. })));
    }
}
