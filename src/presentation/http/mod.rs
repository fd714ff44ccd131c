use std::sync::Arc;

use poem::{Endpoint, EndpointExt, Route, get};
use poem_openapi::OpenApiService;

use crate::presentation::http::{
    endpoints::{health::HealthEndpoints, messages::MessagesEndpoints, root::ApiState},
    webhook::{receive_webhook, verify_webhook},
};

pub mod endpoints;
pub mod mappers;
pub mod requests;
pub mod responses;
pub mod webhook;

/// OpenAPI endpoints under `/api`, Swagger UI under `/docs` and the provider
/// webhook at `/webhook`.
pub fn routes(state: Arc<ApiState>, server_url: &str) -> impl Endpoint + use<> {
    let api_service = OpenApiService::new(
        (HealthEndpoints, MessagesEndpoints::new(state.clone())),
        "Campaigns API",
        "0.1.0",
    )
    .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/api", api_service)
        .nest("/docs", ui)
        .at("/webhook", get(verify_webhook).post(receive_webhook))
        .data(state)
}
