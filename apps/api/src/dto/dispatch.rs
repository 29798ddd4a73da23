use auditrail_application::{DispatchStats, RoleQueueStats};
use serde::Serialize;

/// Counters for one consumer queue.
#[derive(Debug, Serialize)]
pub struct RoleQueueStatsResponse {
    pub role: &'static str,
    pub capacity: usize,
    pub workers: usize,
    pub enqueued: u64,
    pub dropped: u64,
    pub processed: u64,
    pub failed: u64,
    pub depth: u64,
}

/// Dispatcher counters across all roles.
#[derive(Debug, Serialize)]
pub struct DispatchStatsResponse {
    pub accepting: bool,
    pub roles: Vec<RoleQueueStatsResponse>,
}

impl From<RoleQueueStats> for RoleQueueStatsResponse {
    fn from(value: RoleQueueStats) -> Self {
        Self {
            role: value.role.as_str(),
            capacity: value.capacity,
            workers: value.workers,
            enqueued: value.enqueued,
            dropped: value.dropped,
            processed: value.processed,
            failed: value.failed,
            depth: value.depth,
        }
    }
}

impl From<DispatchStats> for DispatchStatsResponse {
    fn from(value: DispatchStats) -> Self {
        Self {
            accepting: value.accepting,
            roles: value
                .roles
                .into_iter()
                .map(RoleQueueStatsResponse::from)
                .collect(),
        }
    }
}
