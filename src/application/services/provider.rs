use async_trait::async_trait;

use crate::domain::models::{SendOutcome, SendRequest};

/// Sends a single message through the messaging provider.
///
/// Implementations never fail: every error is folded into the returned
/// outcome.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    async fn send(&self, request: &SendRequest) -> SendOutcome;
}
