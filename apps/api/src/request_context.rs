use std::future::Future;

use auditrail_application::{RequestContext, RequestContextSource};

tokio::task_local! {
    static CURRENT_REQUEST: RequestContext;
}

/// Request context bound to the task serving the request.
///
/// Work spawned onto other tasks (dispatch workers, scheduled checks) sees no context.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalRequestContext;

impl TaskLocalRequestContext {
    /// Runs `future` with `context` as the current request.
    pub async fn scope<F: Future>(context: RequestContext, future: F) -> F::Output {
        CURRENT_REQUEST.scope(context, future).await
    }
}

impl RequestContextSource for TaskLocalRequestContext {
    fn current(&self) -> Option<RequestContext> {
        CURRENT_REQUEST.try_with(Clone::clone).ok()
    }
}

#[cfg(test)]
mod tests {
    use auditrail_application::{RequestContext, RequestContextSource};

    use super::TaskLocalRequestContext;

    fn context() -> RequestContext {
        RequestContext {
            correlation_id: Some("req-42".to_owned()),
            path: Some("/api/audit/logs".to_owned()),
            ..RequestContext::default()
        }
    }

    #[tokio::test]
    async fn context_is_visible_inside_scope_only() {
        let source = TaskLocalRequestContext;
        assert!(source.current().is_none());

        let seen = TaskLocalRequestContext::scope(context(), async { source.current() }).await;
        assert_eq!(
            seen.and_then(|value| value.correlation_id),
            Some("req-42".to_owned())
        );
        assert!(source.current().is_none());
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_context() {
        let seen = TaskLocalRequestContext::scope(context(), async {
            tokio::spawn(async { TaskLocalRequestContext.current() })
                .await
                .unwrap_or_else(|_| unreachable!())
        })
        .await;

        assert!(seen.is_none());
    }
}
