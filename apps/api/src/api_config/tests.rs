use std::collections::HashMap;
use std::time::Duration;

use auditrail_application::IsolationPolicy;
use auditrail_core::AppError;

use super::ApiConfig;

fn load(values: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
    let values: HashMap<String, String> = values
        .iter()
        .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
        .collect();
    ApiConfig::from_lookup(false, |name| values.get(name).cloned())
}

#[test]
fn defaults_apply_when_only_database_url_is_set() {
    let config = load(&[("DATABASE_URL", "postgres://localhost/auditrail")])
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(config.api_port, 3001);
    assert_eq!(config.dispatch.persistence.capacity, 10_000);
    assert_eq!(config.dispatch.persistence.workers, 2);
    assert_eq!(config.dispatch.anomaly_evaluation.capacity, 5_000);
    assert_eq!(config.shutdown_drain, Duration::from_secs(30));
    assert_eq!(config.fallback.delay, Duration::from_millis(100));
    assert_eq!(config.fallback_max_connections, 2);
    assert_eq!(config.isolation_policy, IsolationPolicy::LogOnly);
    assert_eq!(config.tenant_cache_max_age, Duration::from_secs(4 * 60 * 60));
    assert_eq!(config.statistics_cache_ttl_seconds, 300);
    assert!(config.integrity_check_interval.is_none());
    assert!(config.trusted_proxies.is_empty());
}

#[test]
fn missing_database_url_is_rejected() {
    assert!(matches!(load(&[]), Err(AppError::Validation(_))));
}

#[test]
fn malformed_numbers_are_rejected_instead_of_defaulted() {
    let result = load(&[
        ("DATABASE_URL", "postgres://localhost/auditrail"),
        ("AUDIT_PERSIST_QUEUE_CAPACITY", "lots"),
    ]);
    assert!(matches!(result, Err(AppError::Validation(message)) if message.contains("AUDIT_PERSIST_QUEUE_CAPACITY")));
}

#[test]
fn zero_workers_are_rejected() {
    let result = load(&[
        ("DATABASE_URL", "postgres://localhost/auditrail"),
        ("AUDIT_ALERT_WORKERS", "0"),
    ]);
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn lists_and_policy_are_parsed() {
    let config = load(&[
        ("DATABASE_URL", "postgres://localhost/auditrail"),
        ("SCHEMA_ISOLATION_POLICY", "block"),
        ("AUDIT_EXTRA_SENSITIVE_FIELDS", " BankAccount, ,TaxCode "),
        ("TRUSTED_PROXY_CIDRS", "10.0.0.0/8, 192.168.1.7"),
        ("AUDIT_INTEGRITY_CHECK_INTERVAL_SECONDS", "3600"),
    ])
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(config.isolation_policy, IsolationPolicy::Block);
    assert_eq!(
        config.extra_sensitive_fields,
        vec!["BankAccount".to_owned(), "TaxCode".to_owned()]
    );
    assert_eq!(config.trusted_proxies.len(), 2);
    assert_eq!(
        config.integrity_check_interval,
        Some(Duration::from_secs(3600))
    );
}

#[test]
fn invalid_proxy_cidr_is_rejected() {
    let result = load(&[
        ("DATABASE_URL", "postgres://localhost/auditrail"),
        ("TRUSTED_PROXY_CIDRS", "10.0.0.0/40"),
    ]);
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn unknown_isolation_policy_is_rejected() {
    let result = load(&[
        ("DATABASE_URL", "postgres://localhost/auditrail"),
        ("SCHEMA_ISOLATION_POLICY", "ignore"),
    ]);
    assert!(matches!(result, Err(AppError::Validation(_))));
}
