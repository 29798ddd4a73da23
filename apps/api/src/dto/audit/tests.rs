use auditrail_core::AppError;
use auditrail_domain::{AuditActionType, AuditCategory, AuditSeverity};
use chrono::{TimeZone, Utc};

use super::conversions::parse_list;
use super::types::AuditLogQueryParams;

#[test]
fn comma_lists_are_parsed_case_insensitively() {
    let categories = parse_list::<AuditCategory>(Some(" Security, auth ,"));
    assert!(matches!(
        categories,
        Ok(values) if values == vec![AuditCategory::Security, AuditCategory::Auth]
    ));

    let actions = parse_list::<AuditActionType>(Some("auth.login_failed"));
    assert!(matches!(actions, Ok(values) if values == vec![AuditActionType::LoginFailed]));
}

#[test]
fn unknown_list_entry_is_a_validation_error() {
    let severities = parse_list::<AuditSeverity>(Some("warning,loud"));
    assert!(matches!(severities, Err(AppError::Validation(_))));
}

#[test]
fn absent_list_is_empty() {
    let categories = parse_list::<AuditCategory>(None);
    assert!(matches!(categories, Ok(values) if values.is_empty()));
}

#[test]
fn query_defaults_to_first_page() {
    let request = AuditLogQueryParams {
        entity_type: Some("  ".to_owned()),
        changed_field: Some(" salary ".to_owned()),
        ..AuditLogQueryParams::default()
    }
    .into_request()
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(request.page, 1);
    assert_eq!(request.page_size, 50);
    assert_eq!(request.filter.entity_type, None);
    assert_eq!(request.filter.changed_field.as_deref(), Some("salary"));
}

#[test]
fn inverted_time_range_is_rejected() {
    let from = Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).single();
    let to = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).single();
    let result = AuditLogQueryParams {
        from,
        to,
        ..AuditLogQueryParams::default()
    }
    .into_request();

    assert!(matches!(result, Err(AppError::Validation(_))));
}
