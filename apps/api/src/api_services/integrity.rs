use std::time::Duration;

use auditrail_application::AuditLogService;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

const INTEGRITY_LOOKBACK_DAYS: i64 = 30;

/// Starts the periodic integrity check, if an interval is configured.
pub fn spawn_integrity_checks(
    service: AuditLogService,
    interval: Option<Duration>,
) -> Option<JoinHandle<()>> {
    let interval = interval?;
    info!(
        interval_seconds = interval.as_secs(),
        "scheduled audit integrity checks enabled"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so startup stays quiet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let since = Utc::now() - chrono::Duration::days(INTEGRITY_LOOKBACK_DAYS);
            if let Err(error) = service.run_integrity_check(None, since).await {
                error!(error = %error, "scheduled audit integrity check failed");
            }
        }
    }))
}
