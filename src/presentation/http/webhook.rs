use std::sync::Arc;

use poem::{
    IntoResponse, Response, handler,
    http::StatusCode,
    web::{Data, Query},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    infrastructure::provider::webhook::parse_callback,
    presentation::http::endpoints::root::ApiState,
};

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Returns the challenge to echo back when the subscription request carries
/// the expected token.
pub fn verify_subscription(params: &VerifyParams, expected_token: &str) -> Option<String> {
    match (&params.mode, &params.verify_token) {
        (Some(mode), Some(token)) if mode == "subscribe" && token == expected_token => {
            Some(params.challenge.clone().unwrap_or_default())
        }
        _ => None,
    }
}

#[handler]
pub async fn verify_webhook(
    Query(params): Query<VerifyParams>,
    state: Data<&Arc<ApiState>>,
) -> Response {
    match verify_subscription(&params, &state.verify_token) {
        Some(challenge) => {
            info!("webhook subscription verified");
            challenge.with_status(StatusCode::OK).into_response()
        }
        None => {
            warn!(mode = ?params.mode, "webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

#[handler]
pub async fn receive_webhook(body: Vec<u8>, state: Data<&Arc<ApiState>>) -> StatusCode {
    let events = match parse_callback(&body) {
        Ok(events) => events,
        Err(err) => {
            error!(error = %err, "rejecting webhook delivery");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let report = state.reconciler.reconcile(events).await;
    info!(
        applied = report.applied,
        unchanged = report.unchanged,
        ignored = report.ignored,
        recorded = report.recorded,
        unmatched = report.unmatched,
        failed = report.failed,
        "webhook delivery reconciled"
    );
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use poem::test::TestClient;
    use serde_json::json;

    use super::*;
    use crate::{
        domain::models::{CampaignRef, DeliveryStatus, FailureReason},
        presentation::http::routes,
        testing::{TEST_VERIFY_TOKEN, test_state},
    };

    fn params(mode: &str, token: &str, challenge: &str) -> VerifyParams {
        VerifyParams {
            mode: Some(mode.to_string()),
            verify_token: Some(token.to_string()),
            challenge: Some(challenge.to_string()),
        }
    }

    #[test]
    fn subscription_requires_mode_and_matching_token() {
        assert_eq!(
            verify_subscription(&params("subscribe", "secret", "42"), "secret"),
            Some("42".to_string())
        );
        assert_eq!(
            verify_subscription(&params("subscribe", "wrong", "42"), "secret"),
            None
        );
        assert_eq!(
            verify_subscription(&params("unsubscribe", "secret", "42"), "secret"),
            None
        );
        assert_eq!(verify_subscription(&VerifyParams::default(), "secret"), None);
    }

    #[tokio::test]
    async fn verification_echoes_challenge() {
        let (state, _) = test_state().await;
        let client = TestClient::new(routes(state, "http://localhost:3000"));

        let response = client
            .get("/webhook")
            .query("hub.mode", &"subscribe")
            .query("hub.verify_token", &TEST_VERIFY_TOKEN)
            .query("hub.challenge", &"1158201444")
            .send()
            .await;
        response.assert_status_is_ok();
        response.assert_text("1158201444").await;

        let response = client
            .get("/webhook")
            .query("hub.mode", &"subscribe")
            .query("hub.verify_token", &"guess")
            .query("hub.challenge", &"1158201444")
            .send()
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_delivery_is_a_server_error() {
        let (state, _) = test_state().await;
        let client = TestClient::new(routes(state, "http://localhost:3000"));

        let response = client
            .post("/webhook")
            .content_type("application/json")
            .body("{not json")
            .send()
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn status_callbacks_update_the_ledger() {
        let (state, ledger) = test_state().await;
        let client = TestClient::new(routes(state, "http://localhost:3000"));
        let campaign = CampaignRef {
            campaign_id: 4,
            contact_id: 1,
        };

        client
            .post("/api/send-messages-bulk")
            .body_json(&json!({
                "campaignId": 4,
                "messages": [{ "to": "15550000001", "templateName": "hello_world", "contactId": 1 }]
            }))
            .send()
            .await
            .assert_status_is_ok();

        let callback = |status: &str, errors: serde_json::Value| {
            json!({
                "entry": [{ "changes": [{ "value": { "statuses": [{
                    "id": "wamid.15550000001",
                    "status": status,
                    "recipient_id": "15550000001",
                    "errors": errors
                }]}}]}]
            })
        };

        client
            .post("/webhook")
            .body_json(&callback("delivered", json!([])))
            .send()
            .await
            .assert_status_is_ok();
        client
            .post("/webhook")
            .body_json(&callback(
                "failed",
                json!([{ "code": 131026, "title": "Message undeliverable" }]),
            ))
            .send()
            .await
            .assert_status_is_ok();
        client
            .post("/webhook")
            .body_json(&callback("read", json!([])))
            .send()
            .await
            .assert_status_is_ok();

        let entry = ledger.get(campaign).await.unwrap().unwrap();
        assert_eq!(
            entry.status,
            DeliveryStatus::Failed(FailureReason::NotWhatsappUser)
        );
    }

    #[tokio::test]
    async fn unmatched_callbacks_are_still_acknowledged() {
        let (state, _) = test_state().await;
        let client = TestClient::new(routes(state, "http://localhost:3000"));

        let response = client
            .post("/webhook")
            .body_json(&json!({
                "entry": [{ "changes": [{ "value": {
                    "statuses": [{ "id": "wamid.UNKNOWN", "status": "read" }],
                    "messages": [{ "from": "15557777777", "timestamp": "1700000000", "text": { "body": "hi" } }]
                }}]}]
            }))
            .send()
            .await;

        response.assert_status_is_ok();
    }

    #[tokio::test]
    async fn malformed_status_does_not_block_valid_siblings() {
        let (state, ledger) = test_state().await;
        let client = TestClient::new(routes(state, "http://localhost:3000"));
        let campaign = CampaignRef {
            campaign_id: 5,
            contact_id: 1,
        };

        client
            .post("/api/send-messages-bulk")
            .body_json(&json!({
                "campaignId": 5,
                "messages": [{ "to": "15550000001", "templateName": "hello_world", "contactId": 1 }]
            }))
            .send()
            .await
            .assert_status_is_ok();

        let response = client
            .post("/webhook")
            .body_json(&json!({
                "entry": [{ "changes": [{ "value": { "statuses": [
                    { "id": "wamid.15550000001", "status": "delivered", "recipient_id": "15550000001" },
                    { "id": "wamid.15550000002", "recipient_id": "15550000002" }
                ]}}]}]
            }))
            .send()
            .await;

        response.assert_status_is_ok();
        let entry = ledger.get(campaign).await.unwrap().unwrap();
        assert_eq!(entry.status, DeliveryStatus::Delivered);
    }
}
