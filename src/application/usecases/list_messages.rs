use std::sync::Arc;

use crate::domain::{models::MessageLogEntry, repositories::MessageLogRepository};

const RECENT_LIMIT: u32 = 100;

pub struct ListMessagesUseCase {
    repo: Arc<dyn MessageLogRepository>,
}

impl ListMessagesUseCase {
    pub fn new(repo: Arc<dyn MessageLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self) -> anyhow::Result<Vec<MessageLogEntry>> {
        self.repo.list_recent(RECENT_LIMIT).await
    }
}
