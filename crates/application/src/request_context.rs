use auditrail_core::ActorIdentity;
use auditrail_domain::RequestMetadata;

/// Request-scoped context visible to code running on behalf of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Client IP address after trusted-proxy resolution.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// HTTP method.
    pub http_method: Option<String>,
    /// Request path.
    pub path: Option<String>,
    /// Raw query string.
    pub query_string: Option<String>,
    /// Correlation id.
    pub correlation_id: Option<String>,
    /// Session id.
    pub session_id: Option<String>,
    /// Authenticated actor.
    pub actor: Option<ActorIdentity>,
}

impl RequestContext {
    /// Projects the context onto audit record request metadata.
    #[must_use]
    pub fn to_metadata(&self) -> RequestMetadata {
        RequestMetadata {
            ip_address: self.ip_address.clone(),
            http_method: self.http_method.clone(),
            request_path: self.path.clone(),
            query_string: self.query_string.clone(),
            correlation_id: self.correlation_id.clone(),
            session_id: self.session_id.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Port exposing the current request context, if any.
pub trait RequestContextSource: Send + Sync {
    /// Returns the context of the request being served, or `None` outside a request.
    fn current(&self) -> Option<RequestContext>;
}

/// Context source for background work that never runs inside a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequestContext;

impl RequestContextSource for NoRequestContext {
    fn current(&self) -> Option<RequestContext> {
        None
    }
}
