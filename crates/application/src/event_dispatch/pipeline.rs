use std::sync::Arc;
use std::time::Duration;

use auditrail_domain::{AuditCategory, AuditRecord, AuditSeverity};
use tokio::sync::Semaphore;
use tracing::error;

use crate::audit_ports::{AuditEventSink, AuditRecordRepository};

use super::{AuditDispatcher, ConsumerRole, QueuedEvent};

/// Roles a record is delivered to.
///
/// Every record is persisted. Records at WARNING or above, and security or
/// authentication records, are also evaluated for anomalies. Security records
/// and records at WARNING or above are also evaluated for alerts.
#[must_use]
pub fn route_roles(record: &AuditRecord) -> Vec<ConsumerRole> {
    let elevated = record.severity().at_least(AuditSeverity::Warning);
    let category = record.category();

    let mut roles = Vec::with_capacity(3);
    roles.push(ConsumerRole::Persistence);
    if elevated || matches!(category, AuditCategory::Security | AuditCategory::Auth) {
        roles.push(ConsumerRole::AnomalyEvaluation);
    }
    if elevated || category == AuditCategory::Security {
        roles.push(ConsumerRole::SecurityAlerting);
    }
    roles
}

/// Limits for the direct-write path used when dispatch is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackSettings {
    /// Delay before writing, letting the originating transaction commit first.
    pub delay: Duration,
    /// Maximum direct writes in flight; further records are lost and logged.
    pub max_pending_writes: usize,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            max_pending_writes: 256,
        }
    }
}

/// Audit sink that routes records onto the dispatcher queues, falling back to a
/// delayed direct write on a separate store connection once dispatch has stopped.
#[derive(Clone)]
pub struct AuditPipeline {
    dispatcher: Arc<AuditDispatcher>,
    fallback_writer: Arc<dyn AuditRecordRepository>,
    settings: FallbackSettings,
    pending_writes: Arc<Semaphore>,
}

impl AuditPipeline {
    /// Creates the pipeline. `fallback_writer` must not share connections with business transactions.
    #[must_use]
    pub fn new(
        dispatcher: Arc<AuditDispatcher>,
        fallback_writer: Arc<dyn AuditRecordRepository>,
        settings: FallbackSettings,
    ) -> Self {
        Self {
            dispatcher,
            fallback_writer,
            settings,
            pending_writes: Arc::new(Semaphore::new(settings.max_pending_writes.max(1))),
        }
    }

    fn write_direct(&self, record: Arc<AuditRecord>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(record_id = %record.id(), "audit dispatch unavailable outside a runtime; record lost");
            return;
        };
        let Ok(permit) = Arc::clone(&self.pending_writes).try_acquire_owned() else {
            error!(record_id = %record.id(), "audit fallback writes saturated; record lost");
            return;
        };

        let writer = Arc::clone(&self.fallback_writer);
        let delay = self.settings.delay;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(error) = writer.append(&record).await {
                error!(record_id = %record.id(), error = %error, "audit fallback write failed");
            }
            drop(permit);
        });
    }
}

impl AuditEventSink for AuditPipeline {
    fn submit(&self, record: AuditRecord) {
        let record = Arc::new(record);
        if !self.dispatcher.is_accepting() {
            self.write_direct(record);
            return;
        }

        let mut persisted = true;
        for role in route_roles(&record) {
            let accepted = self
                .dispatcher
                .enqueue(QueuedEvent::new(Arc::clone(&record), role));
            if role == ConsumerRole::Persistence {
                persisted = accepted;
            }
        }

        // Saturation drops; only a dispatcher that stopped mid-submit falls back.
        if !persisted && !self.dispatcher.is_accepting() {
            self.write_direct(record);
        }
    }
}
