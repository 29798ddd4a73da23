use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, warn};

use super::{AuditEventConsumer, ConsumerRole, RoleCounters, SharedReceiver};

pub(super) async fn run_worker(
    role: ConsumerRole,
    worker_index: usize,
    receiver: SharedReceiver,
    consumer: Arc<dyn AuditEventConsumer>,
    counters: Arc<RoleCounters>,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(event) = next else {
            break;
        };

        match consumer.consume(&event).await {
            Ok(()) => {
                counters.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    role = role.as_str(),
                    worker_index,
                    record_id = %event.record.id(),
                    error = %error,
                    "audit consumer failed"
                );
            }
        }
    }

    debug!(role = role.as_str(), worker_index, "audit worker stopped");
}
