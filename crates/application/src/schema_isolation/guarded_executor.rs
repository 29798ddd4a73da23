use std::sync::Arc;

use async_trait::async_trait;
use auditrail_core::AppResult;
use serde_json::Value;

use crate::storage_ports::StatementExecutor;

use super::SchemaIsolationValidator;

/// Statement executor decorator that validates every statement before delegating.
#[derive(Clone)]
pub struct IsolationGuardedExecutor {
    inner: Arc<dyn StatementExecutor>,
    validator: Arc<SchemaIsolationValidator>,
}

impl IsolationGuardedExecutor {
    /// Wraps an executor.
    #[must_use]
    pub fn new(inner: Arc<dyn StatementExecutor>, validator: Arc<SchemaIsolationValidator>) -> Self {
        Self { inner, validator }
    }
}

#[async_trait]
impl StatementExecutor for IsolationGuardedExecutor {
    async fn query_rows(&self, statement: &str) -> AppResult<Vec<Value>> {
        self.validator.enforce(statement)?;
        self.inner.query_rows(statement).await
    }

    async fn execute(&self, statement: &str) -> AppResult<u64> {
        self.validator.enforce(statement)?;
        self.inner.execute(statement).await
    }

    async fn query_scalar(&self, statement: &str) -> AppResult<Option<Value>> {
        self.validator.enforce(statement)?;
        self.inner.query_scalar(statement).await
    }
}
