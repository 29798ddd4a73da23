use std::collections::BTreeMap;

use auditrail_application::{ActionCount, ActorActivity, AuditStatistics, AuditStatisticsFilter};
use auditrail_core::{AppError, AppResult, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::PostgresAuditLogRepository;

const TOP_ENTRIES: i64 = 10;

const STATISTICS_SCOPE: &str = "($1::UUID IS NULL OR tenant_id = $1) \
     AND ($2::TIMESTAMPTZ IS NULL OR occurred_at >= $2) \
     AND ($3::TIMESTAMPTZ IS NULL OR occurred_at <= $3)";

#[derive(Debug, FromRow)]
struct TotalsRow {
    total_records: i64,
    successful_records: i64,
    failed_records: i64,
}

#[derive(Debug, FromRow)]
struct BucketRow {
    bucket: String,
    count: i64,
}

#[derive(Debug, FromRow)]
struct ActorRow {
    actor_id: Uuid,
    actor_email: Option<String>,
    count: i64,
}

struct Scope {
    tenant_id: Option<Uuid>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl PostgresAuditLogRepository {
    pub(super) async fn statistics_impl(
        &self,
        filter: &AuditStatisticsFilter,
    ) -> AppResult<AuditStatistics> {
        let scope = Scope {
            tenant_id: filter.tenant_id.map(|tenant_id| tenant_id.as_uuid()),
            from: filter.from,
            to: filter.to,
        };

        let totals = sqlx::query_as::<_, TotalsRow>(&format!(
            r#"
            SELECT
                COUNT(*) AS total_records,
                COUNT(*) FILTER (WHERE success) AS successful_records,
                COUNT(*) FILTER (WHERE NOT success) AS failed_records
            FROM master.audit_logs
            WHERE {STATISTICS_SCOPE}
            "#
        ))
        .bind(scope.tenant_id)
        .bind(scope.from)
        .bind(scope.to)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to compute audit totals: {error}"))
        })?;

        let by_category = self.buckets("category", &scope).await?;
        let by_severity = self.buckets("severity", &scope).await?;

        let top_actors = sqlx::query_as::<_, ActorRow>(&format!(
            r#"
            SELECT
                actor_id,
                (array_agg(actor_email ORDER BY occurred_at DESC))[1] AS actor_email,
                COUNT(*) AS count
            FROM master.audit_logs
            WHERE actor_id IS NOT NULL AND {STATISTICS_SCOPE}
            GROUP BY actor_id
            ORDER BY count DESC, actor_id
            LIMIT $4
            "#
        ))
        .bind(scope.tenant_id)
        .bind(scope.from)
        .bind(scope.to)
        .bind(TOP_ENTRIES)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to compute top audit actors: {error}"))
        })?;

        let top_actions = sqlx::query_as::<_, BucketRow>(&format!(
            r#"
            SELECT action AS bucket, COUNT(*) AS count
            FROM master.audit_logs
            WHERE {STATISTICS_SCOPE}
            GROUP BY action
            ORDER BY count DESC, action
            LIMIT $4
            "#
        ))
        .bind(scope.tenant_id)
        .bind(scope.from)
        .bind(scope.to)
        .bind(TOP_ENTRIES)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to compute top audit actions: {error}"))
        })?;

        let total_records = to_count(totals.total_records);
        let failed_records = to_count(totals.failed_records);
        Ok(AuditStatistics {
            total_records,
            successful_records: to_count(totals.successful_records),
            failed_records,
            failure_rate: if total_records == 0 {
                0.0
            } else {
                failed_records as f64 / total_records as f64
            },
            by_category,
            by_severity,
            top_actors: top_actors
                .into_iter()
                .map(|row| ActorActivity {
                    actor_id: UserId::from_uuid(row.actor_id),
                    actor_email: row.actor_email,
                    count: to_count(row.count),
                })
                .collect(),
            top_actions: top_actions
                .into_iter()
                .map(|row| ActionCount {
                    action: row.bucket,
                    count: to_count(row.count),
                })
                .collect(),
            generated_at: Utc::now(),
        })
    }

    async fn buckets(&self, column: &'static str, scope: &Scope) -> AppResult<BTreeMap<String, u64>> {
        let rows = sqlx::query_as::<_, BucketRow>(&format!(
            r#"
            SELECT {column} AS bucket, COUNT(*) AS count
            FROM master.audit_logs
            WHERE {STATISTICS_SCOPE}
            GROUP BY {column}
            "#
        ))
        .bind(scope.tenant_id)
        .bind(scope.from)
        .bind(scope.to)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count audit records by {column}: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| (row.bucket, to_count(row.count)))
            .collect())
    }
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
