use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::domain::{
    models::{CampaignRef, DeliveryLedgerEntry, DeliveryStatus, MessageDirection, MessageLogEntry},
    repositories::{ContactDirectory, DeliveryLedgerRepository, MessageLogRepository},
};

pub type PgPool = Pool<Postgres>;

const LEDGER_COLUMNS: &str =
    "campaign_id, contact_id, status, provider_message_id, sent_at, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresDeliveryLedgerRepository {
    pool: PgPool,
}

impl PostgresDeliveryLedgerRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl DeliveryLedgerRepository for PostgresDeliveryLedgerRepository {
    async fn create(&self, campaign: CampaignRef) -> anyhow::Result<DeliveryLedgerEntry> {
        let queued = DeliveryStatus::Queued;
        sqlx::query(
            r#"
            INSERT INTO campaign_contacts (campaign_id, contact_id, status, status_rank)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (campaign_id, contact_id) DO NOTHING
            "#,
        )
        .bind(campaign.campaign_id)
        .bind(campaign.contact_id)
        .bind(queued.to_string())
        .bind(queued.rank())
        .execute(&self.pool)
        .await?;

        self.get(campaign)
            .await?
            .ok_or_else(|| anyhow::anyhow!("ledger entry vanished after insert"))
    }

    async fn get(&self, campaign: CampaignRef) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        let record = sqlx::query_as::<_, LedgerRecord>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM campaign_contacts WHERE campaign_id = $1 AND contact_id = $2"
        ))
        .bind(campaign.campaign_id)
        .bind(campaign.contact_id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(DeliveryLedgerEntry::try_from).transpose()
    }

    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        let record = sqlx::query_as::<_, LedgerRecord>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM campaign_contacts WHERE provider_message_id = $1 LIMIT 1"
        ))
        .bind(provider_message_id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(DeliveryLedgerEntry::try_from).transpose()
    }

    async fn apply_status(
        &self,
        campaign: CampaignRef,
        candidate: &DeliveryStatus,
        provider_message_id: Option<&str>,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        // The rank guard lives in the WHERE clause so the check and the write
        // are one statement.
        let record = sqlx::query_as::<_, LedgerRecord>(&format!(
            r#"
            UPDATE campaign_contacts
            SET status = $3,
                status_rank = $4,
                provider_message_id = COALESCE($5, provider_message_id),
                sent_at = CASE WHEN $6 THEN COALESCE(sent_at, NOW()) ELSE sent_at END,
                updated_at = NOW()
            WHERE campaign_id = $1
              AND contact_id = $2
              AND status_rank < $4
            RETURNING {LEDGER_COLUMNS}
            "#
        ))
        .bind(campaign.campaign_id)
        .bind(campaign.contact_id)
        .bind(candidate.to_string())
        .bind(candidate.rank())
        .bind(provider_message_id)
        .bind(matches!(candidate, DeliveryStatus::Sent))
        .fetch_optional(&self.pool)
        .await?;
        record.map(DeliveryLedgerEntry::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PostgresContactDirectory {
    pool: PgPool,
}

impl PostgresContactDirectory {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl ContactDirectory for PostgresContactDirectory {
    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(r#"SELECT id FROM contacts WHERE phone = $1"#)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}

#[derive(Clone)]
pub struct PostgresMessageLogRepository {
    pool: PgPool,
}

impl PostgresMessageLogRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl MessageLogRepository for PostgresMessageLogRepository {
    async fn insert(&self, entry: MessageLogEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, contact_id, direction, content, received_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(entry.contact_id)
        .bind(entry.direction.as_str())
        .bind(&entry.content)
        .bind(entry.received_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> anyhow::Result<Vec<MessageLogEntry>> {
        let rows = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, contact_id, direction, content, received_at
            FROM messages
            ORDER BY received_at DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MessageLogEntry::try_from).collect()
    }
}

#[derive(FromRow)]
struct LedgerRecord {
    campaign_id: i64,
    contact_id: i64,
    status: String,
    provider_message_id: Option<String>,
    sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LedgerRecord> for DeliveryLedgerEntry {
    type Error = anyhow::Error;

    fn try_from(value: LedgerRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            campaign: CampaignRef {
                campaign_id: value.campaign_id,
                contact_id: value.contact_id,
            },
            status: DeliveryStatus::parse(&value.status)?,
            provider_message_id: value.provider_message_id,
            sent_at: value.sent_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    contact_id: i64,
    direction: String,
    content: Option<String>,
    received_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for MessageLogEntry {
    type Error = anyhow::Error;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let direction = MessageDirection::from_str(&value.direction)
            .ok_or_else(|| anyhow::anyhow!("unknown message direction {}", value.direction))?;
        Ok(Self {
            id: value.id,
            contact_id: value.contact_id,
            direction,
            content: value.content,
            received_at: value.received_at,
        })
    }
}
