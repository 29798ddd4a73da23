use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use auditrail_core::{AppResult, TenantId};
use auditrail_domain::{AuditActionType, AuditCategory, AuditRecord, AuditSeverity};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit_ports::{SecurityAlert, SecurityAlertRepository, SecurityAlertType};
use crate::audit_rules::{
    SWEEP_EVERY, SlidingWindowCounter, is_after_hours, is_compensation_update, login_key,
};
use crate::event_dispatch::{AuditEventConsumer, ConsumerRole, QueuedEvent};


const ADMIN_ROLE_BONUS: u8 = 10;
const AFTER_HOURS_BONUS: u8 = 15;
const MAX_RISK_SCORE: u8 = 100;

/// Thresholds for alert evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertRules {
    /// Failed sign-ins per account that raise an alert.
    pub failed_login_threshold: usize,
    /// Window for failed sign-ins.
    pub failed_login_window: Duration,
    /// Window in which repeated alerts for the same type, tenant and actor are suppressed.
    pub throttle_window: Duration,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            failed_login_threshold: 5,
            failed_login_window: Duration::minutes(15),
            throttle_window: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ThrottleKey {
    alert_type: SecurityAlertType,
    tenant_id: Option<TenantId>,
    actor: String,
}

struct Trigger {
    alert_type: SecurityAlertType,
    base_score: u8,
    title: &'static str,
    description: String,
}

/// Security-alert evaluation consumer.
pub struct SecurityAlertService {
    repository: Arc<dyn SecurityAlertRepository>,
    rules: AlertRules,
    failed_logins: SlidingWindowCounter<String>,
    last_raised: DashMap<ThrottleKey, DateTime<Utc>>,
    claims: AtomicU64,
}

impl SecurityAlertService {
    /// Creates the service.
    #[must_use]
    pub fn new(repository: Arc<dyn SecurityAlertRepository>, rules: AlertRules) -> Self {
        Self {
            repository,
            failed_logins: SlidingWindowCounter::new(rules.failed_login_window),
            last_raised: DashMap::new(),
            claims: AtomicU64::new(0),
            rules,
        }
    }

    /// Evaluates one record and returns the alert to raise, if any.
    ///
    /// The first matching trigger wins. Alerts repeating an unexpired
    /// (type, tenant, actor) combination are suppressed.
    pub fn evaluate(&self, record: &AuditRecord) -> Option<SecurityAlert> {
        let trigger = self.trigger_for(record)?;
        let risk_score = risk_score(record, &trigger);

        let key = ThrottleKey {
            alert_type: trigger.alert_type,
            tenant_id: record.tenant_id(),
            actor: actor_key(record),
        };
        if !self.try_claim(key, record.occurred_at()) {
            info!(
                alert_type = trigger.alert_type.as_str(),
                record_id = %record.id(),
                "security alert throttled"
            );
            return None;
        }

        Some(SecurityAlert {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            tenant_id: record.tenant_id(),
            actor_id: record.actor_id(),
            actor_email: record.actor_email().map(str::to_owned),
            alert_type: trigger.alert_type,
            severity: record.severity().max(severity_for_score(risk_score)),
            risk_score,
            title: trigger.title.to_owned(),
            description: trigger.description,
            audit_record_id: record.id(),
            ip_address: record.request().ip_address.clone(),
        })
    }

    fn trigger_for(&self, record: &AuditRecord) -> Option<Trigger> {
        let action = record.action();

        if action == AuditActionType::PermissionDenied {
            return Some(Trigger {
                alert_type: SecurityAlertType::UnauthorizedAccess,
                base_score: 75,
                title: "Unauthorized access attempt",
                description: format!(
                    "{} was denied access to {}",
                    actor_label(record),
                    record
                        .request()
                        .request_path
                        .as_deref()
                        .unwrap_or(record.subject_type())
                ),
            });
        }

        if action == AuditActionType::LoginFailed {
            let key = login_key(record)?;
            let attempts = self.failed_logins.record(key.clone(), record.occurred_at());
            if attempts < self.rules.failed_login_threshold {
                return None;
            }
            return Some(Trigger {
                alert_type: SecurityAlertType::FailedLoginThreshold,
                base_score: 80,
                title: "Repeated failed sign-ins",
                description: format!(
                    "{attempts} failed sign-ins for '{key}' within {} minutes",
                    self.rules.failed_login_window.num_minutes()
                ),
            });
        }

        let severity = record.severity();
        if action == AuditActionType::DataExported && severity.at_least(AuditSeverity::Critical) {
            return Some(Trigger {
                alert_type: SecurityAlertType::MassDataExport,
                base_score: 70,
                title: "Large data export",
                description: format!("{} exported a large data set", actor_label(record)),
            });
        }

        if severity.at_least(AuditSeverity::Warning) && is_after_hours(record.occurred_at()) {
            return Some(Trigger {
                alert_type: SecurityAlertType::AfterHoursAccess,
                base_score: 45,
                title: "Activity outside business hours",
                description: format!(
                    "{} performed {} at {}",
                    actor_label(record),
                    action,
                    record.occurred_at().format("%H:%M UTC")
                ),
            });
        }

        if is_compensation_update(record) {
            return Some(Trigger {
                alert_type: SecurityAlertType::CompensationChange,
                base_score: 60,
                title: "Compensation changed",
                description: format!(
                    "{} changed compensation on {} '{}'",
                    actor_label(record),
                    record.subject_type(),
                    record.subject_id().unwrap_or_default()
                ),
            });
        }

        if record.category() == AuditCategory::Security && severity.at_least(AuditSeverity::Critical) {
            return Some(Trigger {
                alert_type: SecurityAlertType::CriticalSecurityEvent,
                base_score: severity_base_score(severity),
                title: "Critical security event",
                description: format!("{action} recorded at {} severity", severity.as_str()),
            });
        }

        None
    }

    fn try_claim(&self, key: ThrottleKey, at: DateTime<Utc>) -> bool {
        let window = self.rules.throttle_window;
        let mut claimed = false;
        self.last_raised
            .entry(key)
            .and_modify(|last| {
                if at - *last >= window {
                    *last = at;
                    claimed = true;
                }
            })
            .or_insert_with(|| {
                claimed = true;
                at
            });

        if self.claims.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.last_raised.retain(|_, last| at - *last < window);
        }
        claimed
    }
}

fn risk_score(record: &AuditRecord, trigger: &Trigger) -> u8 {
    let mut score = trigger.base_score.max(severity_base_score(record.severity()));
    if record
        .actor_role()
        .is_some_and(|role| role.to_ascii_lowercase().contains("admin"))
    {
        score = score.saturating_add(ADMIN_ROLE_BONUS);
    }
    if trigger.alert_type != SecurityAlertType::AfterHoursAccess
        && is_after_hours(record.occurred_at())
    {
        score = score.saturating_add(AFTER_HOURS_BONUS);
    }
    score.min(MAX_RISK_SCORE)
}

fn severity_base_score(severity: AuditSeverity) -> u8 {
    match severity {
        AuditSeverity::Info => 10,
        AuditSeverity::Warning => 30,
        AuditSeverity::Critical => 70,
        AuditSeverity::Emergency => 90,
    }
}

fn severity_for_score(score: u8) -> AuditSeverity {
    match score {
        90.. => AuditSeverity::Critical,
        50.. => AuditSeverity::Warning,
        _ => AuditSeverity::Info,
    }
}

fn actor_key(record: &AuditRecord) -> String {
    record
        .actor_id()
        .map(|actor_id| actor_id.to_string())
        .or_else(|| login_key(record))
        .unwrap_or_default()
}

fn actor_label(record: &AuditRecord) -> String {
    record
        .actor_email()
        .map(str::to_owned)
        .or_else(|| record.actor_id().map(|actor_id| actor_id.to_string()))
        .unwrap_or_else(|| "anonymous actor".to_owned())
}

#[async_trait]
impl AuditEventConsumer for SecurityAlertService {
    fn role(&self) -> ConsumerRole {
        ConsumerRole::SecurityAlerting
    }

    async fn consume(&self, event: &QueuedEvent) -> AppResult<()> {
        let Some(alert) = self.evaluate(&event.record) else {
            return Ok(());
        };

        warn!(
            alert_type = alert.alert_type.as_str(),
            severity = alert.severity.as_str(),
            risk_score = alert.risk_score,
            actor_id = ?alert.actor_id,
            record_id = %alert.audit_record_id,
            "security alert raised"
        );
        self.repository.save_alert(&alert).await
    }
}
