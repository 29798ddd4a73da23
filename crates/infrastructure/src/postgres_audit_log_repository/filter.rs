use auditrail_application::AuditLogFilter;
use sqlx::{Postgres, QueryBuilder};

/// Appends the `WHERE` clause for an audit log filter.
pub(super) fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    builder.push(" WHERE TRUE");

    if let Some(tenant_id) = filter.tenant_id {
        builder.push(" AND tenant_id = ");
        builder.push_bind(tenant_id.as_uuid());
    }
    if let Some(actor_id) = filter.actor_id {
        builder.push(" AND actor_id = ");
        builder.push_bind(actor_id.as_uuid());
    }
    if let Some(entity_type) = filter.entity_type.as_deref() {
        builder.push(" AND lower(entity_type) = lower(");
        builder.push_bind(entity_type.to_owned());
        builder.push(")");
    }
    if let Some(entity_id) = filter.entity_id.as_deref() {
        builder.push(" AND entity_id = ");
        builder.push_bind(entity_id.to_owned());
    }
    if let Some(from) = filter.from {
        builder.push(" AND occurred_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND occurred_at <= ");
        builder.push_bind(to);
    }
    if !filter.categories.is_empty() {
        builder.push(" AND category = ANY(");
        builder.push_bind(
            filter
                .categories
                .iter()
                .map(|category| category.as_str().to_owned())
                .collect::<Vec<_>>(),
        );
        builder.push(")");
    }
    if !filter.severities.is_empty() {
        builder.push(" AND severity = ANY(");
        builder.push_bind(
            filter
                .severities
                .iter()
                .map(|severity| severity.as_str().to_owned())
                .collect::<Vec<_>>(),
        );
        builder.push(")");
    }
    if !filter.actions.is_empty() {
        builder.push(" AND action = ANY(");
        builder.push_bind(
            filter
                .actions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        );
        builder.push(")");
    }
    if let Some(changed_field) = filter.changed_field.as_deref() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM unnest(changed_fields) AS changed_field WHERE changed_field ILIKE ",
        );
        builder.push_bind(format!("%{}%", escape_like(changed_field)));
        builder.push(")");
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
