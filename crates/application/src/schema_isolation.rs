use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use auditrail_core::{AppError, AppResult};
use regex::Regex;
use tracing::error;

mod guarded_executor;

#[cfg(test)]
mod tests;

pub use guarded_executor::IsolationGuardedExecutor;

const SCHEMA_REFERENCE_PATTERN: &str =
    r#"(?i)(?:^|[^a-z0-9_"])"?(tenant_[a-z0-9_]+|master|public)"?\."?([a-z0-9_]*)"#;

/// Maximum characters of statement text included in violation logs.
pub const STATEMENT_EXCERPT_CHARS: usize = 500;

const TRANSACTION_CONTROL_KEYWORDS: &[&str] = &[
    "BEGIN",
    "COMMIT",
    "ROLLBACK",
    "START TRANSACTION",
    "SAVEPOINT",
    "RELEASE SAVEPOINT",
    "SET",
];

const HEALTH_CHECK: &str = "SELECT 1";

/// Objects whose schema qualifier never counts toward a violation.
const SYSTEM_OBJECTS: &[&str] = &["_sqlx_migrations"];

/// What happens when a statement references more than one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationPolicy {
    /// Log the violation and let the statement run.
    #[default]
    LogOnly,
    /// Log the violation and refuse the statement.
    Block,
}

impl IsolationPolicy {
    /// Returns a stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogOnly => "log_only",
            Self::Block => "block",
        }
    }
}

impl FromStr for IsolationPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "log_only" | "log" => Ok(Self::LogOnly),
            "block" => Ok(Self::Block),
            other => Err(AppError::Validation(format!(
                "unknown schema isolation policy '{other}'"
            ))),
        }
    }
}

/// Result of inspecting one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationVerdict {
    /// Health check or transaction control statement, skipped by inspection.
    Exempt,
    /// At most one schema referenced.
    Isolated,
    /// More than one distinct schema referenced, in order of first appearance, lower-cased.
    CrossSchema(Vec<String>),
}

/// Inspects statement text for references to more than one schema.
///
/// Matching is purely textual: schema-qualified identifiers are extracted with a
/// fixed pattern. It is best-effort and cannot see through dynamic SQL.
/// `pg_catalog` and `information_schema` are never extracted, so catalog reads
/// only count the tenant or shared schemas they touch.
#[derive(Debug)]
pub struct SchemaIsolationValidator {
    pattern: Regex,
    policy: IsolationPolicy,
    violations: AtomicU64,
}

impl SchemaIsolationValidator {
    /// Creates a validator with the given policy.
    pub fn new(policy: IsolationPolicy) -> AppResult<Self> {
        let pattern = Regex::new(SCHEMA_REFERENCE_PATTERN).map_err(|error| {
            AppError::Internal(format!("invalid schema reference pattern: {error}"))
        })?;

        Ok(Self {
            pattern,
            policy,
            violations: AtomicU64::new(0),
        })
    }

    /// Returns the configured policy.
    #[must_use]
    pub fn policy(&self) -> IsolationPolicy {
        self.policy
    }

    /// Returns the number of violations seen since startup.
    #[must_use]
    pub fn violations_detected(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    /// Classifies a statement without side effects.
    #[must_use]
    pub fn inspect(&self, statement: &str) -> IsolationVerdict {
        if is_exempt(statement) {
            return IsolationVerdict::Exempt;
        }

        let mut distinct: Vec<&str> = Vec::new();
        for captures in self.pattern.captures_iter(statement) {
            let Some(schema) = captures.get(1).map(|found| found.as_str()) else {
                continue;
            };
            let object = captures.get(2).map_or("", |found| found.as_str());
            if SYSTEM_OBJECTS
                .iter()
                .any(|system| system.eq_ignore_ascii_case(object))
            {
                continue;
            }
            if !distinct
                .iter()
                .any(|known| known.eq_ignore_ascii_case(schema))
            {
                distinct.push(schema);
            }
        }

        if distinct.len() > 1 {
            IsolationVerdict::CrossSchema(
                distinct
                    .into_iter()
                    .map(str::to_ascii_lowercase)
                    .collect(),
            )
        } else {
            IsolationVerdict::Isolated
        }
    }

    /// Inspects a statement and applies the policy.
    ///
    /// Violations are always logged at error level; under [`IsolationPolicy::Block`]
    /// they are also returned as `Forbidden`.
    pub fn enforce(&self, statement: &str) -> AppResult<()> {
        let IsolationVerdict::CrossSchema(schemas) = self.inspect(statement) else {
            return Ok(());
        };

        self.violations.fetch_add(1, Ordering::Relaxed);
        error!(
            schemas = ?schemas,
            policy = self.policy.as_str(),
            statement = excerpt(statement),
            "cross-schema statement detected"
        );

        match self.policy {
            IsolationPolicy::LogOnly => Ok(()),
            IsolationPolicy::Block => Err(AppError::Forbidden(format!(
                "statement references multiple schemas: {}",
                schemas.join(", ")
            ))),
        }
    }
}

/// Only a single statement is ever exempt: the bare health check, or one that
/// opens with a transaction control keyword.
fn is_exempt(statement: &str) -> bool {
    let body = statement.trim();
    let body = body.strip_suffix(';').unwrap_or(body).trim_end();
    if body.contains(';') {
        return false;
    }

    body.eq_ignore_ascii_case(HEALTH_CHECK)
        || TRANSACTION_CONTROL_KEYWORDS
            .iter()
            .any(|keyword| starts_with_keyword(body, keyword))
}

fn starts_with_keyword(body: &str, keyword: &str) -> bool {
    let bytes = body.as_bytes();
    bytes
        .get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword.as_bytes()))
        && bytes
            .get(keyword.len())
            .is_none_or(|next| !next.is_ascii_alphanumeric() && *next != b'_')
}

/// Returns at most [`STATEMENT_EXCERPT_CHARS`] characters of a statement.
#[must_use]
pub fn excerpt(statement: &str) -> &str {
    match statement.char_indices().nth(STATEMENT_EXCERPT_CHARS) {
        Some((end, _)) => &statement[..end],
        None => statement,
    }
}
