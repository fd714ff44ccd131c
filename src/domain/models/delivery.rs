use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::CampaignRef;

const FAILED: &str = "failed";

/// Compact reason codes for a failed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NotWhatsappUser,
    MetaBlocked,
    RateLimited,
    Expired,
    ReEngagementRequired,
    /// Slug of a provider error title with no dedicated code.
    Provider(String),
    /// Failure reported without any title, or a failed send.
    Unspecified,
}

/// Provider error titles with a dedicated reason code. Compared case-insensitively.
fn known_title(lowered: &str) -> Option<FailureReason> {
    match lowered {
        "message undeliverable" | "receiver is incapable of receiving this message" => {
            Some(FailureReason::NotWhatsappUser)
        }
        "this message was not delivered to maintain healthy ecosystem engagement." => {
            Some(FailureReason::MetaBlocked)
        }
        "rate limit hit" | "spam rate limit hit" => Some(FailureReason::RateLimited),
        "message expired" => Some(FailureReason::Expired),
        "re-engagement message" => Some(FailureReason::ReEngagementRequired),
        _ => None,
    }
}

impl FailureReason {
    pub fn from_title(title: Option<&str>) -> Self {
        let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
            return FailureReason::Unspecified;
        };

        if let Some(reason) = known_title(&title.to_lowercase()) {
            return reason;
        }

        let slug = slugify(title);
        if slug.is_empty() {
            FailureReason::Unspecified
        } else {
            Self::from_code(&slug)
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            FailureReason::NotWhatsappUser => Some("not_whatsapp_user"),
            FailureReason::MetaBlocked => Some("meta_blocked"),
            FailureReason::RateLimited => Some("rate_limited"),
            FailureReason::Expired => Some("expired"),
            FailureReason::ReEngagementRequired => Some("re_engagement_required"),
            FailureReason::Provider(slug) => Some(slug.as_str()),
            FailureReason::Unspecified => None,
        }
    }

    fn from_code(code: &str) -> Self {
        match code {
            "not_whatsapp_user" => FailureReason::NotWhatsappUser,
            "meta_blocked" => FailureReason::MetaBlocked,
            "rate_limited" => FailureReason::RateLimited,
            "expired" => FailureReason::Expired,
            "re_engagement_required" => FailureReason::ReEngagementRequired,
            other => FailureReason::Provider(other.to_string()),
        }
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed(FailureReason),
}

impl DeliveryStatus {
    /// Failures sit above every other status, so the single rule "apply only a
    /// strictly higher rank" also makes them terminal and first-one-wins.
    pub const FAILED_RANK: i16 = i16::MAX;

    pub fn rank(&self) -> i16 {
        match self {
            DeliveryStatus::Queued => 0,
            DeliveryStatus::Sent => 1,
            DeliveryStatus::Delivered => 2,
            DeliveryStatus::Read => 3,
            DeliveryStatus::Failed(_) => Self::FAILED_RANK,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeliveryStatus::Failed(_))
    }

    /// Whether an entry currently at `self` may move to `candidate`.
    pub fn admits(&self, candidate: &DeliveryStatus) -> bool {
        candidate.rank() > self.rank()
    }

    /// Maps a raw provider status plus optional error title to a candidate
    /// status. Statuses outside the ledger's vocabulary yield `None`.
    pub fn from_provider(raw_status: &str, error_title: Option<&str>) -> Option<Self> {
        match raw_status.trim().to_ascii_lowercase().as_str() {
            "sent" => Some(DeliveryStatus::Sent),
            "delivered" => Some(DeliveryStatus::Delivered),
            "read" => Some(DeliveryStatus::Read),
            FAILED => Some(DeliveryStatus::Failed(FailureReason::from_title(error_title))),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        Ok(match value {
            "queued" => DeliveryStatus::Queued,
            "sent" => DeliveryStatus::Sent,
            "delivered" => DeliveryStatus::Delivered,
            "read" => DeliveryStatus::Read,
            FAILED => DeliveryStatus::Failed(FailureReason::Unspecified),
            other => match other.strip_prefix("failed:") {
                Some(code) if !code.is_empty() => {
                    DeliveryStatus::Failed(FailureReason::from_code(code))
                }
                _ => anyhow::bail!("unknown delivery status {other}"),
            },
        })
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Queued => f.write_str("queued"),
            DeliveryStatus::Sent => f.write_str("sent"),
            DeliveryStatus::Delivered => f.write_str("delivered"),
            DeliveryStatus::Read => f.write_str("read"),
            DeliveryStatus::Failed(reason) => match reason.code() {
                Some(code) => write!(f, "{FAILED}:{code}"),
                None => f.write_str(FAILED),
            },
        }
    }
}

impl From<DeliveryStatus> for String {
    fn from(value: DeliveryStatus) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DeliveryStatus::parse(&value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryLedgerEntry {
    pub campaign: CampaignRef,
    pub status: DeliveryStatus,
    pub provider_message_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryLedgerEntry {
    pub fn queued(campaign: CampaignRef) -> Self {
        let now = Utc::now();
        Self {
            campaign,
            status: DeliveryStatus::Queued,
            provider_message_id: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `candidate` if the rank rule allows it. Returns whether the
    /// entry changed.
    pub fn advance(&mut self, candidate: &DeliveryStatus, provider_message_id: Option<&str>) -> bool {
        if !self.status.admits(candidate) {
            return false;
        }

        let now = Utc::now();
        if let Some(id) = provider_message_id {
            self.provider_message_id = Some(id.to_string());
        }
        if matches!(candidate, DeliveryStatus::Sent) && self.sent_at.is_none() {
            self.sent_at = Some(now);
        }
        self.status = candidate.clone();
        self.updated_at = now;
        true
    }
}
