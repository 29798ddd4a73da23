use auditrail_application::SecurityFindingFilter;
use auditrail_domain::AuditSeverity;
use sqlx::{Postgres, QueryBuilder};

/// Appends the `WHERE` clause for a finding filter.
///
/// `type_column` and `time_column` name the table's type and timestamp columns.
pub(super) fn push_finding_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &SecurityFindingFilter,
    type_column: &'static str,
    time_column: &'static str,
) {
    builder.push(" WHERE TRUE");

    if let Some(tenant_id) = filter.tenant_id {
        builder.push(" AND tenant_id = ");
        builder.push_bind(tenant_id.as_uuid());
    }
    if !filter.finding_types.is_empty() {
        builder.push(format!(" AND {type_column} = ANY("));
        builder.push_bind(filter.finding_types.clone());
        builder.push(")");
    }
    if let Some(threshold) = filter.min_severity {
        builder.push(" AND severity = ANY(");
        builder.push_bind(
            AuditSeverity::all()
                .iter()
                .filter(|severity| severity.at_least(threshold))
                .map(|severity| severity.as_str().to_owned())
                .collect::<Vec<_>>(),
        );
        builder.push(")");
    }
    if let Some(from) = filter.from {
        builder.push(format!(" AND {time_column} >= "));
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(format!(" AND {time_column} <= "));
        builder.push_bind(to);
    }
}
