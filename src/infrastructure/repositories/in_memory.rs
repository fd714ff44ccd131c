use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    models::{CampaignRef, DeliveryLedgerEntry, DeliveryStatus, MessageLogEntry},
    repositories::{ContactDirectory, DeliveryLedgerRepository, MessageLogRepository},
};

#[derive(Default)]
pub struct InMemoryDeliveryLedgerRepository {
    entries: Arc<RwLock<HashMap<CampaignRef, DeliveryLedgerEntry>>>,
}

impl InMemoryDeliveryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryLedgerRepository for InMemoryDeliveryLedgerRepository {
    async fn create(&self, campaign: CampaignRef) -> anyhow::Result<DeliveryLedgerEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(campaign)
            .or_insert_with(|| DeliveryLedgerEntry::queued(campaign));
        Ok(entry.clone())
    }

    async fn get(&self, campaign: CampaignRef) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&campaign).cloned())
    }

    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|e| e.provider_message_id.as_deref() == Some(provider_message_id))
            .cloned())
    }

    async fn apply_status(
        &self,
        campaign: CampaignRef,
        candidate: &DeliveryStatus,
        provider_message_id: Option<&str>,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&campaign) else {
            return Ok(None);
        };

        if entry.advance(candidate, provider_message_id) {
            Ok(Some(entry.clone()))
        } else {
            Ok(None)
        }
    }
}

#[derive(Default)]
pub struct InMemoryContactDirectory {
    contacts: Arc<RwLock<HashMap<String, i64>>>,
}

impl InMemoryContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, phone: &str, contact_id: i64) {
        let mut contacts = self.contacts.write().await;
        contacts.insert(phone.to_string(), contact_id);
    }
}

#[async_trait]
impl ContactDirectory for InMemoryContactDirectory {
    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<i64>> {
        let contacts = self.contacts.read().await;
        Ok(contacts.get(phone).copied())
    }
}

#[derive(Default)]
pub struct InMemoryMessageLogRepository {
    messages: Arc<RwLock<Vec<MessageLogEntry>>>,
}

impl InMemoryMessageLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageLogRepository for InMemoryMessageLogRepository {
    async fn insert(&self, entry: MessageLogEntry) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        messages.push(entry);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> anyhow::Result<Vec<MessageLogEntry>> {
        let messages = self.messages.read().await;
        let mut recent = messages.clone();
        recent.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        recent.truncate(limit as usize);
        Ok(recent)
    }
}
