use async_trait::async_trait;
use auditrail_application::StatementExecutor;
use auditrail_core::{AppError, AppResult};
use serde_json::Value;
use sqlx::PgPool;

/// Executes raw statement text against PostgreSQL, returning rows as JSON.
#[derive(Clone)]
pub struct PostgresStatementExecutor {
    pool: PgPool,
}

impl PostgresStatementExecutor {
    /// Creates an executor with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn subquery(statement: &str) -> &str {
    statement.trim().trim_end_matches(';').trim_end()
}

#[async_trait]
impl StatementExecutor for PostgresStatementExecutor {
    async fn query_rows(&self, statement: &str) -> AppResult<Vec<Value>> {
        sqlx::query_scalar::<_, Value>(&format!(
            "SELECT to_jsonb(statement_row) FROM ({}) AS statement_row",
            subquery(statement)
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run query: {error}")))
    }

    async fn execute(&self, statement: &str) -> AppResult<u64> {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(|error| AppError::Internal(format!("failed to execute statement: {error}")))
    }

    async fn query_scalar(&self, statement: &str) -> AppResult<Option<Value>> {
        // json_each keeps column order, jsonb would sort the keys.
        let value = sqlx::query_scalar::<_, Option<Value>>(&format!(
            "SELECT (SELECT value FROM json_each(row_to_json(statement_row)) LIMIT 1)::jsonb \
             FROM ({}) AS statement_row LIMIT 1",
            subquery(statement)
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run scalar query: {error}")))?;

        Ok(value.flatten())
    }
}
