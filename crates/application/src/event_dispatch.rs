use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use auditrail_core::{AppError, AppResult};
use auditrail_domain::AuditRecord;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

mod persistence;
mod pipeline;
mod workers;


pub use persistence::AuditPersistenceConsumer;
pub use pipeline::{AuditPipeline, FallbackSettings, route_roles};

/// Independent consumer role fed by its own bounded queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerRole {
    /// Durable append to the audit store.
    Persistence,
    /// Behavioural anomaly rules.
    AnomalyEvaluation,
    /// Security alert rules.
    SecurityAlerting,
}

impl ConsumerRole {
    /// Returns a stable label for logs and stats.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persistence => "persistence",
            Self::AnomalyEvaluation => "anomaly_evaluation",
            Self::SecurityAlerting => "security_alerting",
        }
    }

    /// Returns all roles in queue order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Persistence,
            Self::AnomalyEvaluation,
            Self::SecurityAlerting,
        ]
    }

    fn index(self) -> usize {
        match self {
            Self::Persistence => 0,
            Self::AnomalyEvaluation => 1,
            Self::SecurityAlerting => 2,
        }
    }
}

/// Envelope addressing one record to one consumer role.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    /// Shared record; one record may be queued to several roles.
    pub record: Arc<AuditRecord>,
    /// Destination role.
    pub role: ConsumerRole,
    /// Enqueue time.
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedEvent {
    /// Wraps a record for one role, stamped with the current time.
    #[must_use]
    pub fn new(record: Arc<AuditRecord>, role: ConsumerRole) -> Self {
        Self {
            record,
            role,
            enqueued_at: Utc::now(),
        }
    }
}

/// Background consumer for one role.
#[async_trait]
pub trait AuditEventConsumer: Send + Sync {
    /// Role this consumer serves.
    fn role(&self) -> ConsumerRole;

    /// Handles one event. Errors are counted and logged, never propagated to producers.
    async fn consume(&self, event: &QueuedEvent) -> AppResult<()>;
}

/// Queue sizing for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleQueueSettings {
    /// Maximum queued events before new ones are dropped.
    pub capacity: usize,
    /// Fixed worker pool size.
    pub workers: usize,
}

/// Queue sizing for all roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Persistence queue.
    pub persistence: RoleQueueSettings,
    /// Anomaly evaluation queue.
    pub anomaly_evaluation: RoleQueueSettings,
    /// Security alerting queue.
    pub security_alerting: RoleQueueSettings,
}

impl DispatchSettings {
    fn for_role(&self, role: ConsumerRole) -> RoleQueueSettings {
        match role {
            ConsumerRole::Persistence => self.persistence,
            ConsumerRole::AnomalyEvaluation => self.anomaly_evaluation,
            ConsumerRole::SecurityAlerting => self.security_alerting,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            persistence: RoleQueueSettings {
                capacity: 10_000,
                workers: 2,
            },
            anomaly_evaluation: RoleQueueSettings {
                capacity: 5_000,
                workers: 1,
            },
            security_alerting: RoleQueueSettings {
                capacity: 5_000,
                workers: 1,
            },
        }
    }
}

#[derive(Debug, Default)]
struct RoleCounters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

impl RoleCounters {
    fn pending(&self) -> u64 {
        let finished =
            self.processed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed);
        self.enqueued.load(Ordering::Relaxed).saturating_sub(finished)
    }
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedEvent>>>;

struct RoleQueue {
    role: ConsumerRole,
    settings: RoleQueueSettings,
    sender: RwLock<Option<mpsc::Sender<QueuedEvent>>>,
    receiver: SharedReceiver,
    counters: Arc<RoleCounters>,
}

/// Counters for one role queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleQueueStats {
    /// Role.
    pub role: ConsumerRole,
    /// Configured capacity.
    pub capacity: usize,
    /// Configured worker count.
    pub workers: usize,
    /// Events accepted.
    pub enqueued: u64,
    /// Events dropped on saturation.
    pub dropped: u64,
    /// Events consumed successfully.
    pub processed: u64,
    /// Events whose consumer returned an error.
    pub failed: u64,
    /// Events accepted but not yet finished.
    pub depth: u64,
}

/// Snapshot of dispatcher counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    /// Whether the dispatcher still accepts events.
    pub accepting: bool,
    /// Per-role counters in queue order.
    pub roles: Vec<RoleQueueStats>,
}

/// Outcome of a bounded shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Events accepted but never finished.
    pub abandoned: u64,
    /// Whether the drain hit the timeout.
    pub timed_out: bool,
}

/// Bounded per-role queues with fixed worker pools.
///
/// Producers never wait: a full queue drops the newest event and counts it.
pub struct AuditDispatcher {
    queues: Vec<RoleQueue>,
    accepting: AtomicBool,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AuditDispatcher {
    /// Creates the role queues. Workers start with [`AuditDispatcher::start`].
    #[must_use]
    pub fn new(settings: DispatchSettings) -> Self {
        let queues = ConsumerRole::all()
            .iter()
            .map(|role| {
                let role_settings = settings.for_role(*role);
                let (sender, receiver) = mpsc::channel(role_settings.capacity.max(1));
                RoleQueue {
                    role: *role,
                    settings: role_settings,
                    sender: RwLock::new(Some(sender)),
                    receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
                    counters: Arc::new(RoleCounters::default()),
                }
            })
            .collect();

        Self {
            queues,
            accepting: AtomicBool::new(true),
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the worker pool of each consumer's role. Requires a Tokio runtime.
    pub fn start(&self, consumers: Vec<Arc<dyn AuditEventConsumer>>) -> AppResult<()> {
        let mut seen = [false; 3];
        for consumer in &consumers {
            let index = consumer.role().index();
            if seen[index] {
                return Err(AppError::Validation(format!(
                    "more than one consumer registered for role '{}'",
                    consumer.role().as_str()
                )));
            }
            seen[index] = true;
        }

        if self.started.swap(true, Ordering::AcqRel) {
            return Err(AppError::Conflict(
                "audit dispatcher already started".to_owned(),
            ));
        }

        let mut handles = self.workers.lock();
        for consumer in consumers {
            let queue = self.queue(consumer.role());
            let worker_count = queue.settings.workers.max(1);
            for worker_index in 0..worker_count {
                handles.push(tokio::spawn(workers::run_worker(
                    queue.role,
                    worker_index,
                    Arc::clone(&queue.receiver),
                    Arc::clone(&consumer),
                    Arc::clone(&queue.counters),
                )));
            }
            info!(
                role = queue.role.as_str(),
                workers = worker_count,
                capacity = queue.settings.capacity,
                "audit worker pool started"
            );
        }

        for queue in &self.queues {
            if !seen[queue.role.index()] {
                warn!(
                    role = queue.role.as_str(),
                    "no consumer registered; queued events will only accumulate"
                );
            }
        }

        Ok(())
    }

    /// Offers an event to its role queue without waiting.
    ///
    /// Returns `false` when the queue is saturated (the event is dropped and counted)
    /// or the dispatcher has shut down.
    pub fn enqueue(&self, event: QueuedEvent) -> bool {
        if !self.accepting.load(Ordering::Acquire) {
            return false;
        }

        let queue = self.queue(event.role);
        let sender = queue.sender.read();
        let Some(sender) = sender.as_ref() else {
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => {
                queue.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(event)) => {
                let dropped = queue.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    role = queue.role.as_str(),
                    capacity = queue.settings.capacity,
                    dropped_total = dropped,
                    record_id = %event.record.id(),
                    "audit queue capacity exceeded; dropping event"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Returns whether new events are still accepted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Returns a snapshot of all role counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            accepting: self.is_accepting(),
            roles: self
                .queues
                .iter()
                .map(|queue| RoleQueueStats {
                    role: queue.role,
                    capacity: queue.settings.capacity,
                    workers: queue.settings.workers,
                    enqueued: queue.counters.enqueued.load(Ordering::Relaxed),
                    dropped: queue.counters.dropped.load(Ordering::Relaxed),
                    processed: queue.counters.processed.load(Ordering::Relaxed),
                    failed: queue.counters.failed.load(Ordering::Relaxed),
                    depth: queue.counters.pending(),
                })
                .collect(),
        }
    }

    /// Stops accepting events and drains the queues until they empty or `timeout` elapses.
    ///
    /// Workers still running at the deadline are aborted and their pending events abandoned.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        self.accepting.store(false, Ordering::Release);
        for queue in &self.queues {
            queue.sender.write().take();
        }

        let mut handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let drained = tokio::time::timeout(timeout, async {
            for handle in &mut handles {
                if let Err(error) = handle.await {
                    warn!(error = %error, "audit worker ended abnormally");
                }
            }
        })
        .await;

        let timed_out = drained.is_err();
        if timed_out {
            for handle in &handles {
                handle.abort();
            }
        }

        let abandoned = self
            .queues
            .iter()
            .map(|queue| queue.counters.pending())
            .sum();

        if abandoned > 0 {
            warn!(abandoned, timed_out, "audit dispatcher stopped with pending events");
        } else {
            info!("audit dispatcher drained");
        }

        ShutdownReport {
            abandoned,
            timed_out,
        }
    }

    fn queue(&self, role: ConsumerRole) -> &RoleQueue {
        &self.queues[role.index()]
    }
}
