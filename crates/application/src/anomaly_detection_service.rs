use std::sync::Arc;

use async_trait::async_trait;
use auditrail_core::{AppResult, UserId};
use auditrail_domain::{AuditActionType, AuditCategory, AuditRecord, AuditSeverity};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::audit_ports::{AnomalyRepository, AnomalyType, DetectedAnomaly};
use crate::audit_rules::{
    SlidingWindowCounter, compensation_change_ratio, exported_record_count, is_after_hours,
    is_compensation_update, is_privilege_change, login_key,
};
use crate::event_dispatch::{AuditEventConsumer, ConsumerRole, QueuedEvent};


/// Thresholds for anomaly evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyRules {
    /// Failed sign-ins per account that raise a warning.
    pub failed_login_threshold: usize,
    /// Failed sign-ins per account that raise a critical anomaly.
    pub failed_login_critical: usize,
    /// Window for failed sign-ins.
    pub failed_login_window: Duration,
    /// High-risk actions per actor that count as a burst.
    pub rapid_action_threshold: usize,
    /// Window for high-risk bursts.
    pub rapid_action_window: Duration,
    /// Exported records that count as a mass export.
    pub mass_export_threshold: u64,
    /// Exported records that make a mass export critical.
    pub mass_export_critical: u64,
    /// Relative compensation change that is flagged.
    pub compensation_change_ratio: f64,
    /// Relative compensation change that is critical.
    pub compensation_critical_ratio: f64,
}

impl Default for AnomalyRules {
    fn default() -> Self {
        Self {
            failed_login_threshold: 5,
            failed_login_critical: 10,
            failed_login_window: Duration::minutes(15),
            rapid_action_threshold: 10,
            rapid_action_window: Duration::seconds(60),
            mass_export_threshold: 100,
            mass_export_critical: 1_000,
            compensation_change_ratio: 0.5,
            compensation_critical_ratio: 1.0,
        }
    }
}

struct Finding {
    anomaly_type: AnomalyType,
    severity: AuditSeverity,
    risk_score: u8,
    description: String,
    evidence: Value,
}

/// Anomaly evaluation consumer. Keeps per-actor windows in memory.
pub struct AnomalyDetectionService {
    repository: Arc<dyn AnomalyRepository>,
    rules: AnomalyRules,
    failed_logins: SlidingWindowCounter<String>,
    high_risk_actions: SlidingWindowCounter<UserId>,
}

impl AnomalyDetectionService {
    /// Creates the service.
    #[must_use]
    pub fn new(repository: Arc<dyn AnomalyRepository>, rules: AnomalyRules) -> Self {
        Self {
            repository,
            failed_logins: SlidingWindowCounter::new(rules.failed_login_window),
            high_risk_actions: SlidingWindowCounter::new(rules.rapid_action_window),
            rules,
        }
    }

    /// Evaluates one record against every rule, updating the in-memory windows.
    pub fn evaluate(&self, record: &AuditRecord) -> Vec<DetectedAnomaly> {
        if record.action() == AuditActionType::SuspiciousActivityDetected {
            return Vec::new();
        }

        let mut findings = Vec::new();
        findings.extend(self.failed_login_burst(record));
        findings.extend(self.rapid_high_risk_actions(record));
        findings.extend(self.mass_export(record));
        findings.extend(after_hours_activity(record));
        findings.extend(self.large_compensation_change(record));
        findings.extend(privilege_self_modification(record));

        findings
            .into_iter()
            .map(|finding| DetectedAnomaly {
                id: Uuid::new_v4(),
                detected_at: Utc::now(),
                tenant_id: record.tenant_id(),
                actor_id: record.actor_id(),
                actor_email: record.actor_email().map(str::to_owned),
                anomaly_type: finding.anomaly_type,
                severity: finding.severity,
                risk_score: finding.risk_score,
                description: finding.description,
                evidence: finding.evidence,
                audit_record_id: record.id(),
            })
            .collect()
    }

    fn failed_login_burst(&self, record: &AuditRecord) -> Option<Finding> {
        if record.action() != AuditActionType::LoginFailed {
            return None;
        }
        let key = login_key(record)?;
        let attempts = self.failed_logins.record(key.clone(), record.occurred_at());

        let (severity, risk_score) = if attempts == self.rules.failed_login_critical {
            (AuditSeverity::Critical, 85)
        } else if attempts == self.rules.failed_login_threshold {
            (AuditSeverity::Warning, 60)
        } else {
            return None;
        };

        Some(Finding {
            anomaly_type: AnomalyType::FailedLoginBurst,
            severity,
            risk_score,
            description: format!(
                "{attempts} failed sign-ins for '{key}' within {} minutes",
                self.rules.failed_login_window.num_minutes()
            ),
            evidence: json!({ "account": key, "attempts": attempts }),
        })
    }

    fn rapid_high_risk_actions(&self, record: &AuditRecord) -> Option<Finding> {
        let actor_id = record.actor_id()?;
        let high_risk = (record.category() == AuditCategory::DataChange
            && record.severity().at_least(AuditSeverity::Warning))
            || record.action() == AuditActionType::DataExported
            || record.action().is_privilege_change();
        if !high_risk {
            return None;
        }

        let actions = self.high_risk_actions.record(actor_id, record.occurred_at());
        (actions == self.rules.rapid_action_threshold).then(|| Finding {
            anomaly_type: AnomalyType::RapidHighRiskActions,
            severity: AuditSeverity::Warning,
            risk_score: 70,
            description: format!(
                "{actions} high-risk actions within {} seconds",
                self.rules.rapid_action_window.num_seconds()
            ),
            evidence: json!({ "actions": actions, "latest_action": record.action().to_string() }),
        })
    }

    fn mass_export(&self, record: &AuditRecord) -> Option<Finding> {
        if record.action() != AuditActionType::DataExported {
            return None;
        }
        let exported = exported_record_count(record)?;
        if exported < self.rules.mass_export_threshold {
            return None;
        }

        let critical = exported >= self.rules.mass_export_critical;
        Some(Finding {
            anomaly_type: AnomalyType::MassDataExport,
            severity: if critical {
                AuditSeverity::Critical
            } else {
                AuditSeverity::Warning
            },
            risk_score: if critical { 90 } else { 65 },
            description: format!("{exported} records exported in one request"),
            evidence: json!({ "record_count": exported }),
        })
    }

    fn large_compensation_change(&self, record: &AuditRecord) -> Option<Finding> {
        if !is_compensation_update(record) {
            return None;
        }
        let ratio = compensation_change_ratio(record)?;
        if ratio < self.rules.compensation_change_ratio {
            return None;
        }

        let critical = ratio >= self.rules.compensation_critical_ratio;
        Some(Finding {
            anomaly_type: AnomalyType::LargeCompensationChange,
            severity: if critical {
                AuditSeverity::Critical
            } else {
                AuditSeverity::Warning
            },
            risk_score: if critical { 80 } else { 60 },
            description: format!(
                "compensation changed by {:.0}% on {} '{}'",
                ratio * 100.0,
                record.subject_type(),
                record.subject_id().unwrap_or_default()
            ),
            evidence: json!({
                "change_ratio": ratio,
                "old_values": record.old_values(),
                "new_values": record.new_values(),
            }),
        })
    }
}

fn after_hours_activity(record: &AuditRecord) -> Option<Finding> {
    let sensitive = record.category() == AuditCategory::DataChange
        || record.action() == AuditActionType::DataExported;
    if !sensitive
        || !record.severity().at_least(AuditSeverity::Warning)
        || !is_after_hours(record.occurred_at())
    {
        return None;
    }

    Some(Finding {
        anomaly_type: AnomalyType::AfterHoursActivity,
        severity: AuditSeverity::Warning,
        risk_score: 45,
        description: format!(
            "{} outside business hours at {}",
            record.action(),
            record.occurred_at().format("%H:%M UTC")
        ),
        evidence: json!({ "occurred_at": record.occurred_at().to_rfc3339() }),
    })
}

fn privilege_self_modification(record: &AuditRecord) -> Option<Finding> {
    let actor_id = record.actor_id()?.to_string();
    if !is_privilege_change(record)
        || !record
            .subject_id()
            .is_some_and(|subject| subject.eq_ignore_ascii_case(&actor_id))
    {
        return None;
    }

    Some(Finding {
        anomaly_type: AnomalyType::PrivilegeSelfModification,
        severity: AuditSeverity::Critical,
        risk_score: 95,
        description: "actor modified their own privileges".to_owned(),
        evidence: json!({
            "action": record.action().to_string(),
            "changed_fields": record.changed_fields(),
        }),
    })
}

#[async_trait]
impl AuditEventConsumer for AnomalyDetectionService {
    fn role(&self) -> ConsumerRole {
        ConsumerRole::AnomalyEvaluation
    }

    async fn consume(&self, event: &QueuedEvent) -> AppResult<()> {
        let mut first_error = None;
        for anomaly in self.evaluate(&event.record) {
            warn!(
                anomaly_type = anomaly.anomaly_type.as_str(),
                severity = anomaly.severity.as_str(),
                risk_score = anomaly.risk_score,
                actor_id = ?anomaly.actor_id,
                record_id = %anomaly.audit_record_id,
                "anomaly detected"
            );
            if let Err(error) = self.repository.save_anomaly(&anomaly).await {
                first_error.get_or_insert(error);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
