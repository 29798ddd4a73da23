use std::sync::Arc;

use async_trait::async_trait;
use auditrail_core::AppResult;

use crate::audit_ports::AuditRecordRepository;

use super::{AuditEventConsumer, ConsumerRole, QueuedEvent};

/// Appends every queued record to the audit store.
#[derive(Clone)]
pub struct AuditPersistenceConsumer {
    repository: Arc<dyn AuditRecordRepository>,
}

impl AuditPersistenceConsumer {
    /// Creates the consumer.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRecordRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl AuditEventConsumer for AuditPersistenceConsumer {
    fn role(&self) -> ConsumerRole {
        ConsumerRole::Persistence
    }

    async fn consume(&self, event: &QueuedEvent) -> AppResult<()> {
        self.repository.append(&event.record).await
    }
}
