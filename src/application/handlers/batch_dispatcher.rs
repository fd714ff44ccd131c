use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt, stream::FuturesUnordered};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    application::services::{ledger::DeliveryLedger, pacer::Pacer, provider::ProviderGateway},
    domain::{
        errors::DomainError,
        models::{FailureReason, SendError, SendOutcome, SendRequest},
    },
};

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedSend {
    pub to: String,
    pub error: SendError,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkDispatchReport {
    pub sent: u32,
    pub failed: u32,
    pub errors: Vec<FailedSend>,
    pub total: u32,
    /// Outcomes in completion order, batch by batch.
    pub outcomes: Vec<SendOutcome>,
}

impl BulkDispatchReport {
    fn record(&mut self, outcome: SendOutcome) {
        match outcome.error() {
            None => self.sent += 1,
            Some(error) => {
                self.failed += 1;
                self.errors.push(FailedSend {
                    to: outcome.to.clone(),
                    error: error.clone(),
                });
            }
        }
        self.outcomes.push(outcome);
    }
}

pub struct BatchDispatcher {
    gateway: Arc<dyn ProviderGateway>,
    ledger: DeliveryLedger,
    pacer: Arc<dyn Pacer>,
    options: BatchOptions,
}

impl BatchDispatcher {
    pub fn new(
        gateway: Arc<dyn ProviderGateway>,
        ledger: DeliveryLedger,
        pacer: Arc<dyn Pacer>,
        options: BatchOptions,
    ) -> Self {
        Self {
            gateway,
            ledger,
            pacer,
            options,
        }
    }

    pub async fn dispatch_bulk(
        &self,
        requests: Vec<SendRequest>,
    ) -> Result<BulkDispatchReport, DomainError> {
        self.dispatch_bulk_with(requests, self.options).await
    }

    /// Sends `requests` in groups of `options.batch_size`. Members of a group
    /// run concurrently; the next group starts only after the whole group has
    /// settled and the pacing delay has elapsed.
    pub async fn dispatch_bulk_with(
        &self,
        requests: Vec<SendRequest>,
        options: BatchOptions,
    ) -> Result<BulkDispatchReport, DomainError> {
        if options.batch_size == 0 {
            return Err(DomainError::Validation(
                "batch size must be greater than zero".to_string(),
            ));
        }

        let mut report = BulkDispatchReport {
            total: report_count(requests.len())?,
            ..Default::default()
        };
        if requests.is_empty() {
            return Ok(report);
        }

        let batch_count = requests.len().div_ceil(options.batch_size);
        for (index, batch) in requests.chunks(options.batch_size).enumerate() {
            info!(
                batch = index + 1,
                batches = batch_count,
                size = batch.len(),
                "sending batch"
            );

            let mut in_flight: FuturesUnordered<_> =
                batch.iter().map(|request| self.send_one(request)).collect();
            while let Some(outcome) = in_flight.next().await {
                report.record(outcome);
            }

            if index + 1 < batch_count {
                self.pacer.pause(options.inter_batch_delay).await;
            }
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            total = report.total,
            "bulk dispatch finished"
        );
        Ok(report)
    }

    async fn send_one(&self, request: &SendRequest) -> SendOutcome {
        if let Some(campaign) = request.campaign {
            if let Err(err) = self.ledger.create(campaign).await {
                warn!(
                    campaign_id = campaign.campaign_id,
                    contact_id = campaign.contact_id,
                    error = %err,
                    "failed to queue ledger entry"
                );
            }
        }

        let outcome = if request.to.trim().is_empty() {
            SendOutcome::failed(
                request.to.clone(),
                request.campaign,
                SendError::MissingRecipient,
            )
        } else {
            match AssertUnwindSafe(self.gateway.send(request))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => SendOutcome::failed(
                    request.to.clone(),
                    request.campaign,
                    SendError::Internal {
                        message: panic_message(panic),
                    },
                ),
            }
        };

        if !outcome.is_success() {
            warn!(to = %outcome.to, error = ?outcome.error(), "message send failed");
        }
        self.record_in_ledger(&outcome).await;
        outcome
    }

    async fn record_in_ledger(&self, outcome: &SendOutcome) {
        let Some(campaign) = outcome.campaign else {
            return;
        };

        let written = match outcome.provider_message_id() {
            Some(message_id) => self.ledger.mark_sent(campaign, message_id).await,
            None => {
                self.ledger
                    .mark_failed(campaign, FailureReason::Unspecified)
                    .await
            }
        };

        if let Err(err) = written {
            warn!(
                campaign_id = campaign.campaign_id,
                contact_id = campaign.contact_id,
                error = %err,
                "failed to record send outcome in ledger"
            );
        }
    }
}

fn report_count(len: usize) -> Result<u32, DomainError> {
    u32::try_from(len)
        .map_err(|_| DomainError::Validation(format!("too many messages in one request: {len}")))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown error".to_string()
    }
}
