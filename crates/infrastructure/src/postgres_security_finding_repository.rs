use async_trait::async_trait;
use auditrail_application::{
    AnomalyRepository, DetectedAnomaly, FindingPage, SecurityAlert, SecurityAlertRepository,
    SecurityFindingFilter, SecurityFindingQuery, SeverityCount,
};
use auditrail_core::{AppError, AppResult, TenantId, UserId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

mod filter;

#[cfg(test)]
mod tests;

use filter::push_finding_filter;

const ALERT_COLUMNS: &str = "id, created_at, tenant_id, actor_id, actor_email, alert_type, \
     severity, risk_score, title, description, audit_record_id, ip_address";

const ANOMALY_COLUMNS: &str = "id, detected_at, tenant_id, actor_id, actor_email, anomaly_type, \
     severity, risk_score, description, evidence, audit_record_id";

/// PostgreSQL-backed store for security alerts and detected anomalies.
#[derive(Clone)]
pub struct PostgresSecurityFindingRepository {
    pool: PgPool,
}

impl PostgresSecurityFindingRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count_matching(
        &self,
        table: &'static str,
        filter: &SecurityFindingFilter,
        type_column: &'static str,
        time_column: &'static str,
    ) -> AppResult<u64> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
        push_finding_filter(&mut builder, filter, type_column, time_column);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to count {table}: {error}")))?;

        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn severity_counts(
        &self,
        table: &'static str,
        filter: &SecurityFindingFilter,
        type_column: &'static str,
        time_column: &'static str,
    ) -> AppResult<Vec<SeverityCount>> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT severity, COUNT(*) FROM {table}"));
        push_finding_filter(&mut builder, filter, type_column, time_column);
        builder.push(" GROUP BY severity");

        let rows = builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to count {table} by severity: {error}"))
            })?;

        let mut counts = rows
            .into_iter()
            .map(|(severity, count)| {
                Ok(SeverityCount {
                    severity: severity.parse().map_err(|error: AppError| {
                        AppError::Internal(format!("invalid severity in {table}: {error}"))
                    })?,
                    count: u64::try_from(count).unwrap_or_default(),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        counts.sort_by_key(|entry| entry.severity);
        Ok(counts)
    }
}

fn page_bounds(query: &SecurityFindingQuery) -> AppResult<(i64, i64)> {
    let limit = i64::try_from(query.limit)
        .map_err(|error| AppError::Validation(format!("invalid finding query limit: {error}")))?;
    let offset = i64::try_from(query.offset)
        .map_err(|error| AppError::Validation(format!("invalid finding query offset: {error}")))?;
    Ok((limit, offset))
}

fn page_of<T>(items: Vec<T>, total: u64, query: &SecurityFindingQuery) -> FindingPage<T> {
    FindingPage {
        items,
        total,
        page: u32::try_from(query.offset / query.limit.max(1) + 1).unwrap_or(u32::MAX),
        page_size: u32::try_from(query.limit).unwrap_or(u32::MAX),
    }
}

fn risk_score(value: i16) -> AppResult<u8> {
    u8::try_from(value)
        .map_err(|error| AppError::Internal(format!("invalid stored risk score {value}: {error}")))
}

#[derive(Debug, FromRow)]
struct SecurityAlertRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    tenant_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    actor_email: Option<String>,
    alert_type: String,
    severity: String,
    risk_score: i16,
    title: String,
    description: String,
    audit_record_id: Uuid,
    ip_address: Option<String>,
}

impl TryFrom<SecurityAlertRow> for SecurityAlert {
    type Error = AppError;

    fn try_from(row: SecurityAlertRow) -> Result<Self, Self::Error> {
        let alert_id = row.id;
        let stored = |error: AppError| {
            AppError::Internal(format!("invalid security alert '{alert_id}': {error}"))
        };

        Ok(Self {
            id: alert_id,
            created_at: row.created_at,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            actor_id: row.actor_id.map(UserId::from_uuid),
            actor_email: row.actor_email,
            alert_type: row.alert_type.parse().map_err(stored)?,
            severity: row.severity.parse().map_err(stored)?,
            risk_score: risk_score(row.risk_score)?,
            title: row.title,
            description: row.description,
            audit_record_id: row.audit_record_id,
            ip_address: row.ip_address,
        })
    }
}

#[derive(Debug, FromRow)]
struct DetectedAnomalyRow {
    id: Uuid,
    detected_at: DateTime<Utc>,
    tenant_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    actor_email: Option<String>,
    anomaly_type: String,
    severity: String,
    risk_score: i16,
    description: String,
    evidence: Value,
    audit_record_id: Uuid,
}

impl TryFrom<DetectedAnomalyRow> for DetectedAnomaly {
    type Error = AppError;

    fn try_from(row: DetectedAnomalyRow) -> Result<Self, Self::Error> {
        let anomaly_id = row.id;
        let stored =
            |error: AppError| AppError::Internal(format!("invalid anomaly '{anomaly_id}': {error}"));

        Ok(Self {
            id: anomaly_id,
            detected_at: row.detected_at,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            actor_id: row.actor_id.map(UserId::from_uuid),
            actor_email: row.actor_email,
            anomaly_type: row.anomaly_type.parse().map_err(stored)?,
            severity: row.severity.parse().map_err(stored)?,
            risk_score: risk_score(row.risk_score)?,
            description: row.description,
            evidence: row.evidence,
            audit_record_id: row.audit_record_id,
        })
    }
}

#[async_trait]
impl SecurityAlertRepository for PostgresSecurityFindingRepository {
    async fn save_alert(&self, alert: &SecurityAlert) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO master.security_alerts (
                id, created_at, tenant_id, actor_id, actor_email, alert_type, severity,
                risk_score, title, description, audit_record_id, ip_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(alert.id)
        .bind(alert.created_at)
        .bind(alert.tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(alert.actor_id.map(|actor_id| actor_id.as_uuid()))
        .bind(alert.actor_email.as_deref())
        .bind(alert.alert_type.as_str())
        .bind(alert.severity.as_str())
        .bind(i16::from(alert.risk_score))
        .bind(alert.title.as_str())
        .bind(alert.description.as_str())
        .bind(alert.audit_record_id)
        .bind(alert.ip_address.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save security alert: {error}")))?;

        Ok(())
    }

    async fn list_alerts(
        &self,
        query: &SecurityFindingQuery,
    ) -> AppResult<FindingPage<SecurityAlert>> {
        let (limit, offset) = page_bounds(query)?;
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {ALERT_COLUMNS} FROM master.security_alerts"));
        push_finding_filter(&mut builder, &query.filter, "alert_type", "created_at");
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<SecurityAlertRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list security alerts: {error}"))
            })?;

        let items = rows
            .into_iter()
            .map(SecurityAlert::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        let total = self
            .count_matching(
                "master.security_alerts",
                &query.filter,
                "alert_type",
                "created_at",
            )
            .await?;

        Ok(page_of(items, total, query))
    }

    async fn find_alert(&self, alert_id: Uuid) -> AppResult<Option<SecurityAlert>> {
        let row = sqlx::query_as::<_, SecurityAlertRow>(&format!(
            "SELECT {ALERT_COLUMNS} FROM master.security_alerts WHERE id = $1"
        ))
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load security alert '{alert_id}': {error}"))
        })?;

        row.map(SecurityAlert::try_from).transpose()
    }

    async fn count_alerts_by_severity(
        &self,
        filter: &SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>> {
        self.severity_counts("master.security_alerts", filter, "alert_type", "created_at")
            .await
    }
}

#[async_trait]
impl AnomalyRepository for PostgresSecurityFindingRepository {
    async fn save_anomaly(&self, anomaly: &DetectedAnomaly) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO master.detected_anomalies (
                id, detected_at, tenant_id, actor_id, actor_email, anomaly_type, severity,
                risk_score, description, evidence, audit_record_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(anomaly.id)
        .bind(anomaly.detected_at)
        .bind(anomaly.tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(anomaly.actor_id.map(|actor_id| actor_id.as_uuid()))
        .bind(anomaly.actor_email.as_deref())
        .bind(anomaly.anomaly_type.as_str())
        .bind(anomaly.severity.as_str())
        .bind(i16::from(anomaly.risk_score))
        .bind(anomaly.description.as_str())
        .bind(&anomaly.evidence)
        .bind(anomaly.audit_record_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save anomaly: {error}")))?;

        Ok(())
    }

    async fn list_anomalies(
        &self,
        query: &SecurityFindingQuery,
    ) -> AppResult<FindingPage<DetectedAnomaly>> {
        let (limit, offset) = page_bounds(query)?;
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {ANOMALY_COLUMNS} FROM master.detected_anomalies"
        ));
        push_finding_filter(&mut builder, &query.filter, "anomaly_type", "detected_at");
        builder.push(" ORDER BY detected_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<DetectedAnomalyRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list anomalies: {error}")))?;

        let items = rows
            .into_iter()
            .map(DetectedAnomaly::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        let total = self
            .count_matching(
                "master.detected_anomalies",
                &query.filter,
                "anomaly_type",
                "detected_at",
            )
            .await?;

        Ok(page_of(items, total, query))
    }

    async fn find_anomaly(&self, anomaly_id: Uuid) -> AppResult<Option<DetectedAnomaly>> {
        let row = sqlx::query_as::<_, DetectedAnomalyRow>(&format!(
            "SELECT {ANOMALY_COLUMNS} FROM master.detected_anomalies WHERE id = $1"
        ))
        .bind(anomaly_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load anomaly '{anomaly_id}': {error}"))
        })?;

        row.map(DetectedAnomaly::try_from).transpose()
    }

    async fn count_anomalies_by_severity(
        &self,
        filter: &SecurityFindingFilter,
    ) -> AppResult<Vec<SeverityCount>> {
        self.severity_counts(
            "master.detected_anomalies",
            filter,
            "anomaly_type",
            "detected_at",
        )
        .await
    }
}
