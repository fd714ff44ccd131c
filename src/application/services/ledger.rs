use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    models::{CampaignRef, DeliveryLedgerEntry, DeliveryStatus, FailureReason},
    repositories::{ContactDirectory, DeliveryLedgerRepository},
};

/// Access layer over the per-campaign delivery records. Every status change
/// after creation goes through [`DeliveryLedger::apply_status`].
#[derive(Clone)]
pub struct DeliveryLedger {
    entries: Arc<dyn DeliveryLedgerRepository>,
    contacts: Arc<dyn ContactDirectory>,
}

impl DeliveryLedger {
    pub fn new(
        entries: Arc<dyn DeliveryLedgerRepository>,
        contacts: Arc<dyn ContactDirectory>,
    ) -> Self {
        Self { entries, contacts }
    }

    pub async fn create(&self, campaign: CampaignRef) -> anyhow::Result<DeliveryLedgerEntry> {
        self.entries.create(campaign).await
    }

    pub async fn get(&self, campaign: CampaignRef) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        self.entries.get(campaign).await
    }

    pub async fn mark_sent(
        &self,
        campaign: CampaignRef,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        self.transition(campaign, DeliveryStatus::Sent, Some(provider_message_id))
            .await
    }

    pub async fn mark_failed(
        &self,
        campaign: CampaignRef,
        reason: FailureReason,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        self.transition(campaign, DeliveryStatus::Failed(reason), None)
            .await
    }

    pub async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        self.entries
            .find_by_provider_message_id(provider_message_id)
            .await
    }

    pub async fn find_by_contact(&self, phone: &str) -> anyhow::Result<Option<i64>> {
        self.contacts.find_by_phone(phone).await
    }

    /// Returns the updated entry, or `None` when `candidate` does not outrank
    /// the stored status.
    pub async fn apply_status(
        &self,
        entry: &DeliveryLedgerEntry,
        candidate: DeliveryStatus,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        if !entry.status.admits(&candidate) {
            debug!(
                campaign_id = entry.campaign.campaign_id,
                contact_id = entry.campaign.contact_id,
                current = %entry.status,
                candidate = %candidate,
                "status update skipped"
            );
            return Ok(None);
        }
        self.transition(entry.campaign, candidate, None).await
    }

    async fn transition(
        &self,
        campaign: CampaignRef,
        candidate: DeliveryStatus,
        provider_message_id: Option<&str>,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        let updated = self
            .entries
            .apply_status(campaign, &candidate, provider_message_id)
            .await?;
        if updated.is_none() {
            debug!(
                campaign_id = campaign.campaign_id,
                contact_id = campaign.contact_id,
                candidate = %candidate,
                "stored status outranks candidate"
            );
        }
        Ok(updated)
    }
}
