use std::fmt::Write as _;
use std::str::FromStr;

use auditrail_core::{ActorIdentity, AppError, AppResult};
use auditrail_domain::{
    AuditActionType, AuditCategory, AuditRecord, AuditRecordDraft, AuditSeverity, Capability,
};
use serde_json::{Value, json};
use tracing::info;

use crate::audit_ports::{AuditLogFilter, AuditLogQuery};
use crate::authorization_gate::ProtectedOperation;

use super::{AuditLogService, scope_tenant};

/// Largest number of records one export may contain.
pub const MAX_EXPORT_RECORDS: u64 = 10_000;

const CRITICAL_EXPORT_RECORDS: usize = 1_000;

const CSV_HEADER: &[&str] = &[
    "id",
    "occurred_at",
    "tenant_id",
    "actor_id",
    "actor_email",
    "actor_role",
    "action",
    "category",
    "severity",
    "entity_type",
    "entity_id",
    "success",
    "error_message",
    "changed_fields",
    "ip_address",
    "correlation_id",
    "checksum",
];

/// Export document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// JSON array of records.
    #[default]
    Json,
    /// Comma-separated values with a header row.
    Csv,
}

impl ExportFormat {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Returns the HTTP content type.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(AppError::Validation(format!(
                "unknown export format '{value}'"
            ))),
        }
    }
}

/// Rendered export document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditExport {
    /// Document format.
    pub format: ExportFormat,
    /// Records in the document.
    pub record_count: usize,
    /// Rendered document.
    pub content: String,
}

impl AuditLogService {
    /// Exports every matching record, newest first.
    ///
    /// Exports over [`MAX_EXPORT_RECORDS`] are rejected rather than truncated.
    /// Each export is itself recorded on the audit trail.
    pub async fn export(
        &self,
        actor: &ActorIdentity,
        mut filter: AuditLogFilter,
        format: ExportFormat,
    ) -> AppResult<AuditExport> {
        self.gate
            .authorize(
                actor,
                &ProtectedOperation::new(
                    "audit.logs.export",
                    [Capability::AuditExport, Capability::AuditAdmin],
                ),
            )
            .await?;
        filter.tenant_id = scope_tenant(actor, filter.tenant_id)?;

        let matching = self.repository.count(&filter).await?;
        if matching > MAX_EXPORT_RECORDS {
            return Err(AppError::Validation(format!(
                "{matching} records match; narrow the filter to at most {MAX_EXPORT_RECORDS}"
            )));
        }

        let page = self
            .repository
            .query(&AuditLogQuery {
                filter: filter.clone(),
                limit: usize::try_from(matching).unwrap_or(usize::MAX),
                offset: 0,
            })
            .await?;

        let content = match format {
            ExportFormat::Json => render_json(&page.items)?,
            ExportFormat::Csv => render_csv(&page.items),
        };

        let record_count = page.items.len();
        info!(
            actor_id = %actor.user_id(),
            record_count,
            format = format.as_str(),
            "audit log exported"
        );
        self.record_export(actor, &filter, format, record_count);

        Ok(AuditExport {
            format,
            record_count,
            content,
        })
    }

    fn record_export(
        &self,
        actor: &ActorIdentity,
        filter: &AuditLogFilter,
        format: ExportFormat,
        record_count: usize,
    ) {
        let severity = if record_count >= CRITICAL_EXPORT_RECORDS {
            AuditSeverity::Critical
        } else {
            AuditSeverity::Warning
        };

        let mut draft = AuditRecordDraft::new(
            AuditActionType::DataExported,
            AuditCategory::Security,
            severity,
            "AuditLog",
        );
        draft.tenant_id = filter.tenant_id.or(actor.tenant_id());
        draft.actor_id = Some(actor.user_id());
        draft.actor_email = actor.email().map(str::to_owned);
        draft.actor_role = actor.role().map(str::to_owned);
        draft.metadata = Some(json!({
            "record_count": record_count,
            "format": format.as_str(),
            "filter": {
                "tenant_id": filter.tenant_id.map(|value| value.to_string()),
                "actor_id": filter.actor_id.map(|value| value.to_string()),
                "entity_type": filter.entity_type,
                "entity_id": filter.entity_id,
                "from": filter.from.map(|value| value.to_rfc3339()),
                "to": filter.to.map(|value| value.to_rfc3339()),
            },
        }));

        self.sink.submit(draft.seal());
    }
}

fn export_row(record: &AuditRecord) -> Value {
    json!({
        "id": record.id(),
        "occurred_at": record.occurred_at().to_rfc3339(),
        "tenant_id": record.tenant_id().map(|value| value.to_string()),
        "actor_id": record.actor_id().map(|value| value.to_string()),
        "actor_email": record.actor_email(),
        "actor_role": record.actor_role(),
        "action": record.action().to_string(),
        "category": record.category().as_str(),
        "severity": record.severity().as_str(),
        "entity_type": record.subject_type(),
        "entity_id": record.subject_id(),
        "success": record.success(),
        "error_message": record.error_message(),
        "old_values": record.old_values(),
        "new_values": record.new_values(),
        "changed_fields": record.changed_fields(),
        "ip_address": record.request().ip_address,
        "correlation_id": record.request().correlation_id,
        "checksum": record.checksum(),
    })
}

fn render_json(records: &[AuditRecord]) -> AppResult<String> {
    let rows: Vec<Value> = records.iter().map(export_row).collect();
    serde_json::to_string_pretty(&rows)
        .map_err(|error| AppError::Internal(format!("failed to render audit export: {error}")))
}

fn render_csv(records: &[AuditRecord]) -> String {
    let mut output = CSV_HEADER.join(",");
    output.push('\n');

    for record in records {
        let fields = [
            record.id().to_string(),
            record.occurred_at().to_rfc3339(),
            record.tenant_id().map(|value| value.to_string()).unwrap_or_default(),
            record.actor_id().map(|value| value.to_string()).unwrap_or_default(),
            record.actor_email().unwrap_or_default().to_owned(),
            record.actor_role().unwrap_or_default().to_owned(),
            record.action().to_string(),
            record.category().as_str().to_owned(),
            record.severity().as_str().to_owned(),
            record.subject_type().to_owned(),
            record.subject_id().unwrap_or_default().to_owned(),
            record.success().to_string(),
            record.error_message().unwrap_or_default().to_owned(),
            record.changed_fields().join(";"),
            record.request().ip_address.clone().unwrap_or_default(),
            record.request().correlation_id.clone().unwrap_or_default(),
            record.checksum().to_owned(),
        ];

        let line = fields
            .iter()
            .map(|field| escape_csv(field))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(output, "{line}");
    }

    output
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
pub(super) fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
