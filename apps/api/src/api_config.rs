use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use auditrail_application::{
    DispatchSettings, FallbackSettings, IsolationPolicy, RoleQueueSettings,
};
use auditrail_core::AppError;
use ipnet::IpNet;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub dispatch: DispatchSettings,
    pub shutdown_drain: Duration,
    pub fallback: FallbackSettings,
    pub fallback_max_connections: u32,
    pub isolation_policy: IsolationPolicy,
    pub tenant_cache_max_age: Duration,
    pub statistics_cache_ttl_seconds: u32,
    pub extra_sensitive_fields: Vec<String>,
    pub integrity_check_interval: Option<Duration>,
    pub trusted_proxies: Vec<IpNet>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(&lookup, "API_PORT", 3001_u16)?;

        let defaults = DispatchSettings::default();
        let dispatch = DispatchSettings {
            persistence: RoleQueueSettings {
                capacity: parse_positive(
                    &lookup,
                    "AUDIT_PERSIST_QUEUE_CAPACITY",
                    defaults.persistence.capacity,
                )?,
                workers: parse_positive(
                    &lookup,
                    "AUDIT_PERSIST_WORKERS",
                    defaults.persistence.workers,
                )?,
            },
            anomaly_evaluation: RoleQueueSettings {
                capacity: parse_positive(
                    &lookup,
                    "AUDIT_ANOMALY_QUEUE_CAPACITY",
                    defaults.anomaly_evaluation.capacity,
                )?,
                workers: parse_positive(
                    &lookup,
                    "AUDIT_ANOMALY_WORKERS",
                    defaults.anomaly_evaluation.workers,
                )?,
            },
            security_alerting: RoleQueueSettings {
                capacity: parse_positive(
                    &lookup,
                    "AUDIT_ALERT_QUEUE_CAPACITY",
                    defaults.security_alerting.capacity,
                )?,
                workers: parse_positive(
                    &lookup,
                    "AUDIT_ALERT_WORKERS",
                    defaults.security_alerting.workers,
                )?,
            },
        };

        let shutdown_drain =
            Duration::from_secs(parse_or(&lookup, "AUDIT_SHUTDOWN_DRAIN_SECONDS", 30_u64)?);
        let fallback = FallbackSettings {
            delay: Duration::from_millis(parse_or(&lookup, "AUDIT_FALLBACK_DELAY_MS", 100_u64)?),
            ..FallbackSettings::default()
        };
        let fallback_max_connections =
            parse_positive(&lookup, "AUDIT_FALLBACK_MAX_CONNECTIONS", 2_u32)?;

        let isolation_policy = parse_or(
            &lookup,
            "SCHEMA_ISOLATION_POLICY",
            IsolationPolicy::default(),
        )?;
        let tenant_cache_max_age = Duration::from_secs(parse_or(
            &lookup,
            "TENANT_CACHE_MAX_AGE_SECONDS",
            14_400_u64,
        )?);
        let statistics_cache_ttl_seconds =
            parse_or(&lookup, "AUDIT_STATISTICS_CACHE_TTL_SECONDS", 300_u32)?;

        let extra_sensitive_fields = lookup("AUDIT_EXTRA_SENSITIVE_FIELDS")
            .map(|value| split_list(&value))
            .unwrap_or_default();

        let integrity_check_interval =
            match parse_or(&lookup, "AUDIT_INTEGRITY_CHECK_INTERVAL_SECONDS", 0_u64)? {
                0 => None,
                seconds => Some(Duration::from_secs(seconds)),
            };

        let trusted_proxies = lookup("TRUSTED_PROXY_CIDRS")
            .map(|value| {
                split_list(&value)
                    .iter()
                    .map(|cidr| parse_proxy_network(cidr))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            migrate_only,
            database_url,
            api_host,
            api_port,
            dispatch,
            shutdown_drain,
            fallback,
            fallback_max_connections,
            isolation_policy,
            tenant_cache_max_age,
            statistics_cache_ttl_seconds,
            extra_sensitive_fields,
            integrity_check_interval,
            trusted_proxies,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name).filter(|value| !value.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}

fn parse_positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: Display,
{
    let value = parse_or(lookup, name, default)?;
    if value <= T::default() {
        return Err(AppError::Validation(format!("{name} must be greater than zero")));
    }

    Ok(value)
}

fn parse_proxy_network(value: &str) -> Result<IpNet, AppError> {
    // Bare addresses are accepted as single-host networks.
    value
        .parse::<IpNet>()
        .or_else(|_| value.parse::<IpAddr>().map(IpNet::from))
        .map_err(|error| {
            AppError::Validation(format!("invalid TRUSTED_PROXY_CIDRS entry '{value}': {error}"))
        })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
