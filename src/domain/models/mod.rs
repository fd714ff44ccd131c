pub mod delivery;
pub mod message;
pub mod message_log;
pub mod outcome;

pub use delivery::{DeliveryLedgerEntry, DeliveryStatus, FailureReason};
pub use message::{CampaignRef, MessageContent, SendRequest};
pub use message_log::{MessageDirection, MessageLogEntry};
pub use outcome::{SendError, SendOutcome};
