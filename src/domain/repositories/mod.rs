use async_trait::async_trait;

use crate::domain::models::{CampaignRef, DeliveryLedgerEntry, DeliveryStatus, MessageLogEntry};

#[async_trait]
pub trait DeliveryLedgerRepository: Send + Sync {
    /// Inserts a queued entry, or returns the existing one untouched.
    async fn create(&self, campaign: CampaignRef) -> anyhow::Result<DeliveryLedgerEntry>;

    async fn get(&self, campaign: CampaignRef) -> anyhow::Result<Option<DeliveryLedgerEntry>>;

    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>>;

    /// Moves the entry to `candidate` only if `candidate` outranks the stored
    /// status, checked atomically against the stored row. Returns the updated
    /// entry, or `None` when nothing changed.
    async fn apply_status(
        &self,
        campaign: CampaignRef,
        candidate: &DeliveryStatus,
        provider_message_id: Option<&str>,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>>;
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<i64>>;
}

#[async_trait]
pub trait MessageLogRepository: Send + Sync {
    async fn insert(&self, entry: MessageLogEntry) -> anyhow::Result<()>;
    async fn list_recent(&self, limit: u32) -> anyhow::Result<Vec<MessageLogEntry>>;
}
