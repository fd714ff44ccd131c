use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    application::services::ledger::DeliveryLedger,
    domain::{
        errors::DomainError,
        events::{CallbackEvent, DeliveryStatusEvent, InboundMessageEvent},
        models::{DeliveryStatus, MessageDirection, MessageLogEntry},
        repositories::MessageLogRepository,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The ledger entry advanced.
    Applied,
    /// The stored status already outranks the event.
    Unchanged,
    /// Provider status outside the ledger vocabulary.
    Ignored,
    /// Inbound message written to the message log.
    Recorded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub applied: u32,
    pub unchanged: u32,
    pub ignored: u32,
    pub recorded: u32,
    pub unmatched: u32,
    pub failed: u32,
}

/// Folds provider callbacks into the delivery ledger and the message log.
pub struct StatusReconciler {
    ledger: DeliveryLedger,
    message_log: Arc<dyn MessageLogRepository>,
}

impl StatusReconciler {
    pub fn new(ledger: DeliveryLedger, message_log: Arc<dyn MessageLogRepository>) -> Self {
        Self {
            ledger,
            message_log,
        }
    }

    /// Processes every event independently. Failures are logged and counted,
    /// never propagated, so one bad event cannot block its siblings.
    pub async fn reconcile(&self, events: Vec<CallbackEvent>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for event in &events {
            match self.apply_event(event).await {
                Ok(EventOutcome::Applied) => report.applied += 1,
                Ok(EventOutcome::Unchanged) => report.unchanged += 1,
                Ok(EventOutcome::Ignored) => report.ignored += 1,
                Ok(EventOutcome::Recorded) => report.recorded += 1,
                Err(DomainError::CorrelationMiss(key)) => {
                    warn!(%key, "dropping callback event without a match");
                    report.unmatched += 1;
                }
                Err(err) => {
                    error!(event = ?event, error = %err, "failed to process callback event");
                    report.failed += 1;
                }
            }
        }

        if !events.is_empty() {
            info!(
                events = events.len(),
                applied = report.applied,
                unmatched = report.unmatched,
                failed = report.failed,
                "callback reconciled"
            );
        }
        report
    }

    pub async fn apply_event(&self, event: &CallbackEvent) -> Result<EventOutcome, DomainError> {
        match event {
            CallbackEvent::DeliveryStatus(status) => self.apply_delivery_status(status).await,
            CallbackEvent::InboundMessage(message) => self.record_inbound(message).await,
        }
    }

    async fn apply_delivery_status(
        &self,
        event: &DeliveryStatusEvent,
    ) -> Result<EventOutcome, DomainError> {
        let Some(candidate) =
            DeliveryStatus::from_provider(&event.raw_status, event.error_title.as_deref())
        else {
            debug!(
                provider_message_id = %event.provider_message_id,
                raw_status = %event.raw_status,
                "ignoring provider status"
            );
            return Ok(EventOutcome::Ignored);
        };

        let entry = self
            .ledger
            .find_by_provider_message_id(&event.provider_message_id)
            .await?
            .ok_or_else(|| {
                DomainError::CorrelationMiss(format!(
                    "provider message id {}",
                    event.provider_message_id
                ))
            })?;

        match self.ledger.apply_status(&entry, candidate).await? {
            Some(updated) => {
                debug!(
                    campaign_id = updated.campaign.campaign_id,
                    contact_id = updated.campaign.contact_id,
                    status = %updated.status,
                    "delivery status advanced"
                );
                Ok(EventOutcome::Applied)
            }
            None => Ok(EventOutcome::Unchanged),
        }
    }

    async fn record_inbound(&self, event: &InboundMessageEvent) -> Result<EventOutcome, DomainError> {
        let contact_id = self
            .ledger
            .find_by_contact(&event.from)
            .await?
            .ok_or_else(|| DomainError::CorrelationMiss(format!("sender {}", event.from)))?;

        self.message_log
            .insert(MessageLogEntry::new(
                contact_id,
                MessageDirection::Inbound,
                event.body.clone(),
                event.provider_timestamp.unwrap_or_else(Utc::now),
            ))
            .await?;
        Ok(EventOutcome::Recorded)
    }
}
