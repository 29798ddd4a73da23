use async_trait::async_trait;
use auditrail_application::{
    AuditLogFilter, AuditLogPage, AuditLogQuery, AuditLogReadRepository, AuditRecordRepository,
    AuditStatistics, AuditStatisticsFilter,
};
use auditrail_core::{AppError, AppResult, TenantId, UserId};
use auditrail_domain::{AuditRecord, AuditRecordDraft, RequestMetadata};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

mod filter;
mod statistics;


use filter::push_filter;

const AUDIT_LOG_COLUMNS: &str = "id, occurred_at, tenant_id, actor_id, actor_email, actor_role, \
     action, category, severity, entity_type, entity_id, success, error_message, old_values, \
     new_values, changed_fields, ip_address, http_method, request_path, query_string, \
     correlation_id, session_id, user_agent, metadata, checksum";

/// PostgreSQL-backed audit trail over `master.audit_logs`.
///
/// Writes are insert-only; the table rejects updates and deletes.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    tenant_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    actor_email: Option<String>,
    actor_role: Option<String>,
    action: String,
    category: String,
    severity: String,
    entity_type: String,
    entity_id: Option<String>,
    success: bool,
    error_message: Option<String>,
    old_values: Option<Value>,
    new_values: Option<Value>,
    changed_fields: Vec<String>,
    ip_address: Option<String>,
    http_method: Option<String>,
    request_path: Option<String>,
    query_string: Option<String>,
    correlation_id: Option<String>,
    session_id: Option<String>,
    user_agent: Option<String>,
    metadata: Option<Value>,
    checksum: String,
}

impl TryFrom<AuditLogRow> for AuditRecord {
    type Error = AppError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let record_id = row.id;
        let stored = |error: AppError| {
            AppError::Internal(format!("invalid audit record '{record_id}': {error}"))
        };
        let draft = AuditRecordDraft {
            id: record_id,
            occurred_at: row.occurred_at,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            actor_id: row.actor_id.map(UserId::from_uuid),
            actor_email: row.actor_email,
            actor_role: row.actor_role,
            action: row.action.parse().map_err(stored)?,
            category: row.category.parse().map_err(stored)?,
            severity: row.severity.parse().map_err(stored)?,
            subject_type: row.entity_type,
            subject_id: row.entity_id,
            success: row.success,
            error_message: row.error_message,
            old_values: row.old_values,
            new_values: row.new_values,
            changed_fields: row.changed_fields,
            request: RequestMetadata {
                ip_address: row.ip_address,
                http_method: row.http_method,
                request_path: row.request_path,
                query_string: row.query_string,
                correlation_id: row.correlation_id,
                session_id: row.session_id,
                user_agent: row.user_agent,
            },
            metadata: row.metadata,
        };

        AuditRecord::restore(draft, row.checksum)
    }
}

#[async_trait]
impl AuditRecordRepository for PostgresAuditLogRepository {
    async fn append(&self, record: &AuditRecord) -> AppResult<()> {
        let request = record.request();
        sqlx::query(
            r#"
            INSERT INTO master.audit_logs (
                id, occurred_at, tenant_id, actor_id, actor_email, actor_role,
                action, category, severity, entity_type, entity_id, success, error_message,
                old_values, new_values, changed_fields,
                ip_address, http_method, request_path, query_string,
                correlation_id, session_id, user_agent, metadata, checksum
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id())
        .bind(record.occurred_at())
        .bind(record.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
        .bind(record.actor_id().map(|actor_id| actor_id.as_uuid()))
        .bind(record.actor_email())
        .bind(record.actor_role())
        .bind(record.action().to_string())
        .bind(record.category().as_str())
        .bind(record.severity().as_str())
        .bind(record.subject_type())
        .bind(record.subject_id())
        .bind(record.success())
        .bind(record.error_message())
        .bind(record.old_values())
        .bind(record.new_values())
        .bind(record.changed_fields())
        .bind(request.ip_address.as_deref())
        .bind(request.http_method.as_deref())
        .bind(request.request_path.as_deref())
        .bind(request.query_string.as_deref())
        .bind(request.correlation_id.as_deref())
        .bind(request.session_id.as_deref())
        .bind(request.user_agent.as_deref())
        .bind(record.metadata())
        .bind(record.checksum())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append audit record '{}': {error}",
                record.id()
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl AuditLogReadRepository for PostgresAuditLogRepository {
    async fn query(&self, query: &AuditLogQuery) -> AppResult<AuditLogPage> {
        let limit = i64::try_from(query.limit).map_err(|error| {
            AppError::Validation(format!("invalid audit query limit: {error}"))
        })?;
        let offset = i64::try_from(query.offset).map_err(|error| {
            AppError::Validation(format!("invalid audit query offset: {error}"))
        })?;

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {AUDIT_LOG_COLUMNS} FROM master.audit_logs"));
        push_filter(&mut builder, &query.filter);
        builder.push(" ORDER BY occurred_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<AuditLogRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to query audit log: {error}")))?;

        let items = rows
            .into_iter()
            .map(AuditRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        let total = self.count(&query.filter).await?;

        Ok(AuditLogPage {
            items,
            total,
            page: u32::try_from(query.offset / query.limit.max(1) + 1).unwrap_or(u32::MAX),
            page_size: u32::try_from(query.limit).unwrap_or(u32::MAX),
        })
    }

    async fn count(&self, filter: &AuditLogFilter) -> AppResult<u64> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM master.audit_logs");
        push_filter(&mut builder, filter);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to count audit log: {error}")))?;

        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn find_by_id(&self, record_id: Uuid) -> AppResult<Option<AuditRecord>> {
        let row = sqlx::query_as::<_, AuditLogRow>(&format!(
            "SELECT {AUDIT_LOG_COLUMNS} FROM master.audit_logs WHERE id = $1"
        ))
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load audit record '{record_id}': {error}"))
        })?;

        row.map(AuditRecord::try_from).transpose()
    }

    async fn statistics(&self, filter: &AuditStatisticsFilter) -> AppResult<AuditStatistics> {
        self.statistics_impl(filter).await
    }
}
