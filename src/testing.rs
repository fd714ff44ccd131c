// Test doubles for the dispatch and reconciliation paths.
//
// - MockGateway (ProviderGateway): scripted per-recipient outcomes, call log
// - RecordingPacer (Pacer): records pauses instead of sleeping
// - FailingLedgerRepository / FailingMessageLog: storage that is always down
// - test_state: fully wired in-memory ApiState for HTTP tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use crate::{
    application::{
        handlers::{
            batch_dispatcher::{BatchDispatcher, BatchOptions},
            status_reconciler::StatusReconciler,
        },
        services::{ledger::DeliveryLedger, pacer::Pacer, provider::ProviderGateway},
        usecases::{
            list_messages::ListMessagesUseCase, send_bulk::SendBulkUseCase,
            send_reply::SendReplyUseCase,
        },
    },
    domain::{
        models::{
            CampaignRef, DeliveryLedgerEntry, DeliveryStatus, MessageLogEntry, SendError,
            SendOutcome, SendRequest,
        },
        repositories::{DeliveryLedgerRepository, MessageLogRepository},
    },
    infrastructure::repositories::in_memory::{
        InMemoryContactDirectory, InMemoryDeliveryLedgerRepository, InMemoryMessageLogRepository,
    },
    presentation::http::endpoints::root::ApiState,
};

pub const TEST_VERIFY_TOKEN: &str = "verify-me";

pub fn in_memory_ledger() -> (
    DeliveryLedger,
    Arc<InMemoryDeliveryLedgerRepository>,
    Arc<InMemoryContactDirectory>,
) {
    let entries = Arc::new(InMemoryDeliveryLedgerRepository::new());
    let contacts = Arc::new(InMemoryContactDirectory::new());
    let ledger = DeliveryLedger::new(entries.clone(), contacts.clone());
    (ledger, entries, contacts)
}

// ---------------------------------------------------------------------------
// MockGateway
// ---------------------------------------------------------------------------

/// Succeeds with `wamid.<to>` unless told otherwise.
#[derive(Default)]
pub struct MockGateway {
    failures: HashSet<String>,
    panics: HashSet<String>,
    message_ids: HashMap<String, String>,
    pacer: Option<Arc<RecordingPacer>>,
    /// (recipient, pauses observed when the call started)
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(mut self, to: &str) -> Self {
        self.failures.insert(to.to_string());
        self
    }

    pub fn panic_for(mut self, to: &str) -> Self {
        self.panics.insert(to.to_string());
        self
    }

    pub fn with_message_id(mut self, to: &str, id: &str) -> Self {
        self.message_ids.insert(to.to_string(), id.to_string());
        self
    }

    /// Tags each call with the number of pauses the pacer has seen so far.
    pub fn observing(mut self, pacer: Arc<RecordingPacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of calls made between consecutive pauses.
    pub fn batch_sizes(&self) -> Vec<usize> {
        let calls = self.calls.lock().unwrap();
        let mut sizes: Vec<usize> = Vec::new();
        for (_, batch) in calls.iter() {
            if sizes.len() <= *batch {
                sizes.resize(*batch + 1, 0);
            }
            sizes[*batch] += 1;
        }
        sizes
    }
}

#[async_trait]
impl ProviderGateway for MockGateway {
    async fn send(&self, request: &SendRequest) -> SendOutcome {
        let batch = self
            .pacer
            .as_ref()
            .map(|pacer| pacer.pauses().len())
            .unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push((request.to.clone(), batch));

        tokio::task::yield_now().await;

        if self.panics.contains(&request.to) {
            panic!("gateway exploded for {}", request.to);
        }
        if self.failures.contains(&request.to) {
            return SendOutcome::failed(
                request.to.clone(),
                request.campaign,
                SendError::Provider {
                    status: 400,
                    body: serde_json::json!({
                        "error": { "message": "Invalid parameter", "code": 100 }
                    }),
                },
            );
        }

        let id = self
            .message_ids
            .get(&request.to)
            .cloned()
            .unwrap_or_else(|| format!("wamid.{}", request.to));
        SendOutcome::sent(request.to.clone(), request.campaign, id)
    }
}

// ---------------------------------------------------------------------------
// RecordingPacer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, delay: Duration) {
        self.pauses.lock().unwrap().push(delay);
    }
}

// ---------------------------------------------------------------------------
// Failing stores
// ---------------------------------------------------------------------------

pub struct FailingLedgerRepository;

#[async_trait]
impl DeliveryLedgerRepository for FailingLedgerRepository {
    async fn create(&self, _campaign: CampaignRef) -> anyhow::Result<DeliveryLedgerEntry> {
        bail!("ledger store unavailable")
    }

    async fn get(&self, _campaign: CampaignRef) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        bail!("ledger store unavailable")
    }

    async fn find_by_provider_message_id(
        &self,
        _provider_message_id: &str,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        bail!("ledger store unavailable")
    }

    async fn apply_status(
        &self,
        _campaign: CampaignRef,
        _candidate: &DeliveryStatus,
        _provider_message_id: Option<&str>,
    ) -> anyhow::Result<Option<DeliveryLedgerEntry>> {
        bail!("ledger store unavailable")
    }
}

pub struct FailingMessageLog;

#[async_trait]
impl MessageLogRepository for FailingMessageLog {
    async fn insert(&self, _entry: MessageLogEntry) -> anyhow::Result<()> {
        bail!("message log unavailable")
    }

    async fn list_recent(&self, _limit: u32) -> anyhow::Result<Vec<MessageLogEntry>> {
        bail!("message log unavailable")
    }
}

// ---------------------------------------------------------------------------
// HTTP state
// ---------------------------------------------------------------------------

/// Contacts 1 and 2 are `15550000001` and `15550000002`; sends to
/// `15559999999` are rejected by the provider.
pub async fn test_state() -> (Arc<ApiState>, DeliveryLedger) {
    let (ledger, _, contacts) = in_memory_ledger();
    contacts.add("15550000001", 1).await;
    contacts.add("15550000002", 2).await;

    let gateway: Arc<dyn ProviderGateway> = Arc::new(MockGateway::new().fail_for("15559999999"));
    let message_log = Arc::new(InMemoryMessageLogRepository::new());
    let dispatcher = Arc::new(BatchDispatcher::new(
        gateway.clone(),
        ledger.clone(),
        Arc::new(RecordingPacer::default()),
        BatchOptions::default(),
    ));

    let state = ApiState {
        send_bulk_usecase: Arc::new(SendBulkUseCase::new(dispatcher)),
        send_reply_usecase: Arc::new(SendReplyUseCase::new(
            gateway,
            contacts,
            message_log.clone(),
        )),
        list_messages_usecase: Arc::new(ListMessagesUseCase::new(message_log.clone())),
        reconciler: Arc::new(StatusReconciler::new(ledger.clone(), message_log)),
        verify_token: TEST_VERIFY_TOKEN.to_string(),
    };
    (Arc::new(state), ledger)
}
