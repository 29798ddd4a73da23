use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use auditrail_core::{AppError, AppResult};
use proptest::prelude::*;
use serde_json::{Value, json};

use crate::storage_ports::StatementExecutor;

use super::{
    IsolationGuardedExecutor, IsolationPolicy, IsolationVerdict, SchemaIsolationValidator,
    STATEMENT_EXCERPT_CHARS, excerpt,
};

fn validator(policy: IsolationPolicy) -> SchemaIsolationValidator {
    SchemaIsolationValidator::new(policy).unwrap_or_else(|_| unreachable!())
}

#[test]
fn two_tenant_schemas_are_flagged() {
    let verdict = validator(IsolationPolicy::LogOnly).inspect(
        "SELECT a.id FROM tenant_acme.employees a JOIN tenant_globex.employees g ON a.id = g.id",
    );
    assert_eq!(
        verdict,
        IsolationVerdict::CrossSchema(vec!["tenant_acme".to_owned(), "tenant_globex".to_owned()])
    );
}

#[test]
fn one_tenant_schema_is_isolated() {
    let verdict = validator(IsolationPolicy::LogOnly).inspect(
        "SELECT e.id FROM tenant_acme.employees e JOIN tenant_acme.departments d ON d.id = e.department_id",
    );
    assert_eq!(verdict, IsolationVerdict::Isolated);
}

#[test]
fn tenant_and_shared_schema_mix_is_flagged() {
    let verdict = validator(IsolationPolicy::LogOnly)
        .inspect(r#"SELECT * FROM "tenant_acme"."employees" e JOIN master.tenants t ON true"#);
    assert!(matches!(verdict, IsolationVerdict::CrossSchema(schemas) if schemas.len() == 2));
}

#[test]
fn case_differences_do_not_count_as_distinct_schemas() {
    let verdict = validator(IsolationPolicy::LogOnly)
        .inspect("select * from TENANT_ACME.employees join tenant_acme.leave_requests on true");
    assert_eq!(verdict, IsolationVerdict::Isolated);
}

#[test]
fn health_check_and_transaction_control_are_exempt() {
    let validator = validator(IsolationPolicy::Block);
    for statement in [
        "SELECT 1",
        " select 1 ; ",
        "  begin",
        "COMMIT;",
        "RELEASE SAVEPOINT before_import",
        "SET search_path TO tenant_acme, public",
    ] {
        assert_eq!(validator.inspect(statement), IsolationVerdict::Exempt, "{statement}");
        assert!(validator.enforce(statement).is_ok());
    }
}

#[test]
fn exempt_prefixes_do_not_hide_cross_tenant_joins() {
    let validator = validator(IsolationPolicy::Block);
    for statement in [
        "SELECT 1 FROM tenant_acme.employees a JOIN tenant_globex.employees b ON a.id = b.id",
        "SELECT 10 AS n, a.* FROM tenant_acme.employees a, tenant_globex.employees b",
        "SELECT 1; DELETE FROM tenant_acme.x USING tenant_globex.y",
        "BEGINNING_BALANCE: SELECT * FROM tenant_acme.x, tenant_globex.y",
    ] {
        assert!(
            matches!(validator.inspect(statement), IsolationVerdict::CrossSchema(_)),
            "{statement}"
        );
        assert!(matches!(validator.enforce(statement), Err(AppError::Forbidden(_))));
    }
    assert_eq!(validator.violations_detected(), 4);
}

#[test]
fn catalog_words_in_text_do_not_exempt_statements() {
    let validator = validator(IsolationPolicy::Block);
    let statement = "SELECT * FROM tenant_acme.employees a JOIN tenant_globex.employees b \
                     ON a.id = b.id WHERE b.note <> 'information_schema' -- pg_catalog";
    assert!(matches!(
        validator.enforce(statement),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn system_schemas_do_not_count_as_distinct() {
    let validator = validator(IsolationPolicy::Block);
    for statement in [
        "SELECT * FROM information_schema.tables t JOIN tenant_acme.x ON true",
        "SELECT n.nspname FROM pg_catalog.pg_namespace n, public.x",
        "SELECT version FROM public._sqlx_migrations, master.tenants",
    ] {
        assert_eq!(validator.inspect(statement), IsolationVerdict::Isolated, "{statement}");
        assert!(validator.enforce(statement).is_ok());
    }
    assert!(matches!(
        validator.inspect("SELECT * FROM pg_catalog.pg_class, tenant_acme.x, master.tenants"),
        IsolationVerdict::CrossSchema(_)
    ));
}

#[test]
fn log_only_policy_allows_and_counts_violations() {
    let validator = validator(IsolationPolicy::LogOnly);
    let result = validator.enforce("DELETE FROM tenant_a.x USING tenant_b.y");
    assert!(result.is_ok());
    assert_eq!(validator.violations_detected(), 1);
}

#[test]
fn block_policy_rejects_violations() {
    let validator = validator(IsolationPolicy::Block);
    let result = validator.enforce("UPDATE tenant_a.x SET v = (SELECT v FROM public.y)");
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[test]
fn policy_parses_configuration_values() {
    assert!(matches!("BLOCK".parse::<IsolationPolicy>(), Ok(IsolationPolicy::Block)));
    assert!(matches!("log_only".parse::<IsolationPolicy>(), Ok(IsolationPolicy::LogOnly)));
    assert!("strict".parse::<IsolationPolicy>().is_err());
}

#[test]
fn excerpt_respects_char_boundaries() {
    let statement = "é".repeat(STATEMENT_EXCERPT_CHARS + 20);
    assert_eq!(excerpt(&statement).chars().count(), STATEMENT_EXCERPT_CHARS);
    assert_eq!(excerpt("SELECT 2"), "SELECT 2");
}

#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl StatementExecutor for CountingExecutor {
    async fn query_rows(&self, _statement: &str) -> AppResult<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![json!({ "id": 1 })])
    }

    async fn execute(&self, _statement: &str) -> AppResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }

    async fn query_scalar(&self, _statement: &str) -> AppResult<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(json!(1)))
    }
}

#[tokio::test]
async fn guarded_executor_blocks_before_execution() {
    let inner = Arc::new(CountingExecutor::default());
    let executor = IsolationGuardedExecutor::new(
        inner.clone(),
        Arc::new(validator(IsolationPolicy::Block)),
    );

    let blocked = executor
        .query_rows("SELECT * FROM tenant_a.employees, tenant_b.employees")
        .await;
    assert!(blocked.is_err());
    assert_eq!(inner.calls.load(Ordering::SeqCst), 0);

    let allowed = executor.execute("UPDATE tenant_a.employees SET active = true").await;
    assert!(matches!(allowed, Ok(1)));
    let ping = executor.query_scalar("SELECT 1").await;
    assert!(matches!(ping, Ok(Some(_))));
    assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
}

proptest! {
    #[test]
    fn distinct_tenant_pairs_always_flag(
        left in "[a-z][a-z0-9]{0,10}",
        right in "[a-z][a-z0-9]{0,10}",
        table in "[a-z]{1,12}",
    ) {
        prop_assume!(left != right);
        let statement = format!("SELECT * FROM tenant_{left}.{table} JOIN tenant_{right}.{table} USING (id)");
        let verdict = validator(IsolationPolicy::LogOnly).inspect(&statement);
        prop_assert!(matches!(verdict, IsolationVerdict::CrossSchema(_)), "{}", statement);
    }

    #[test]
    fn repeated_single_schema_never_flags(
        tenant in "[a-z][a-z0-9]{0,10}",
        tables in proptest::collection::vec("[a-z]{1,12}", 1..6),
    ) {
        let joined = tables
            .iter()
            .map(|table| format!("tenant_{tenant}.{table}"))
            .collect::<Vec<_>>()
            .join(", ");
        let statement = format!("SELECT * FROM {joined}");
        prop_assert_eq!(validator(IsolationPolicy::LogOnly).inspect(&statement), IsolationVerdict::Isolated);
    }
}

#[test]
fn schema_names_inside_longer_identifiers_are_ignored() {
    let verdict = validator(IsolationPolicy::LogOnly)
        .inspect("SELECT republic.name FROM tenant_acme.countries republic");
    assert_eq!(verdict, IsolationVerdict::Isolated);
}
