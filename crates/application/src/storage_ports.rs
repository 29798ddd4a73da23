use async_trait::async_trait;
use auditrail_core::AppResult;
use auditrail_domain::TrackedChange;
use serde_json::Value;

/// Port for persisting a unit of work of tracked entity changes.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Persists the changes atomically, in tracking order.
    async fn persist(&self, changes: &[TrackedChange]) -> AppResult<()>;
}

/// Port for executing raw statement text against the shared store.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Runs a query and returns each row as a JSON object.
    async fn query_rows(&self, statement: &str) -> AppResult<Vec<Value>>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, statement: &str) -> AppResult<u64>;

    /// Runs a query and returns the first column of the first row.
    async fn query_scalar(&self, statement: &str) -> AppResult<Option<Value>>;
}
