use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use auditrail_domain::{AuditActionType, AuditRecord, ChangeOperation, ClassifiedEntity};
use chrono::{DateTime, Duration, Timelike, Utc};
use dashmap::DashMap;
use serde_json::Value;

const COMPENSATION_FIELDS: &[&str] = &["Salary", "BaseSalary", "Compensation"];
const PRIVILEGE_FIELDS: &[&str] = &["Role", "Permissions", "IsAdmin"];
pub(crate) const SWEEP_EVERY: u64 = 1024;

/// Per-key event timestamps within a trailing window.
pub(crate) struct SlidingWindowCounter<K: Eq + Hash> {
    window: Duration,
    entries: DashMap<K, VecDeque<DateTime<Utc>>>,
    recorded: AtomicU64,
}

impl<K: Eq + Hash> SlidingWindowCounter<K> {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
            recorded: AtomicU64::new(0),
        }
    }

    /// Records one event and returns how many events for `key` fall inside the window.
    pub(crate) fn record(&self, key: K, at: DateTime<Utc>) -> usize {
        let cutoff = at - self.window;
        let count = {
            let mut timestamps = self.entries.entry(key).or_default();
            timestamps.push_back(at);
            while timestamps.front().is_some_and(|oldest| *oldest <= cutoff) {
                timestamps.pop_front();
            }
            timestamps.len()
        };

        if self.recorded.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.entries
                .retain(|_, timestamps| timestamps.back().is_some_and(|latest| *latest > cutoff));
        }
        count
    }
}

/// Returns whether the time falls between 22:00 and 06:00 UTC.
pub(crate) fn is_after_hours(at: DateTime<Utc>) -> bool {
    let hour = at.hour();
    hour >= 22 || hour < 6
}

/// Returns whether the record updates compensation on an employee or payroll record.
pub(crate) fn is_compensation_update(record: &AuditRecord) -> bool {
    matches!(
        record.action(),
        AuditActionType::Entity(
            ClassifiedEntity::Employee | ClassifiedEntity::Payroll,
            ChangeOperation::Updated
        )
    ) && record
        .changed_fields()
        .iter()
        .any(|field| is_one_of(field, COMPENSATION_FIELDS))
}

/// Largest relative change across compensation fields, e.g. `0.5` for +50%.
pub(crate) fn compensation_change_ratio(record: &AuditRecord) -> Option<f64> {
    let old_values = record.old_values()?.as_object()?;
    let new_values = record.new_values()?.as_object()?;

    old_values
        .iter()
        .filter(|(field, _)| is_one_of(field, COMPENSATION_FIELDS))
        .filter_map(|(field, old)| {
            let old = as_number(old)?;
            let new = as_number(new_values.get(field)?)?;
            (old > 0.0).then(|| ((new - old) / old).abs())
        })
        .reduce(f64::max)
}

/// Returns whether the record changes an actor's privileges.
pub(crate) fn is_privilege_change(record: &AuditRecord) -> bool {
    record.action().is_privilege_change()
        || record
            .changed_fields()
            .iter()
            .any(|field| is_one_of(field, PRIVILEGE_FIELDS))
}

/// Reads `record_count` from export metadata.
pub(crate) fn exported_record_count(record: &AuditRecord) -> Option<u64> {
    record
        .metadata()
        .and_then(|metadata| metadata.get("record_count"))
        .and_then(Value::as_u64)
}

/// Key for per-account failed sign-in tracking.
pub(crate) fn login_key(record: &AuditRecord) -> Option<String> {
    record
        .actor_email()
        .or(record.subject_id())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

fn is_one_of(field: &str, names: &[&str]) -> bool {
    names.iter().any(|name| name.eq_ignore_ascii_case(field))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
