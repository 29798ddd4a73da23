use std::sync::Arc;

use auditrail_application::{AuditDispatcher, StatementExecutor};

use super::*;

pub(super) async fn check_postgres(executor: Arc<dyn StatementExecutor>) -> HealthDependencyStatus {
    match executor.query_scalar("SELECT 1").await {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("postgres check failed: {error}")),
        },
    }
}

pub(super) fn check_dispatch(dispatcher: &AuditDispatcher) -> HealthDependencyStatus {
    let stats = dispatcher.stats();
    if !stats.accepting {
        return HealthDependencyStatus {
            status: "error",
            detail: Some("audit dispatch is not accepting events".to_owned()),
        };
    }

    let saturated: Vec<&str> = stats
        .roles
        .iter()
        .filter(|role| role.depth >= u64::try_from(role.capacity).unwrap_or(u64::MAX))
        .map(|role| role.role.as_str())
        .collect();
    if saturated.is_empty() {
        HealthDependencyStatus {
            status: "ok",
            detail: None,
        }
    } else {
        HealthDependencyStatus {
            status: "degraded",
            detail: Some(format!("saturated queues: {}", saturated.join(", "))),
        }
    }
}
