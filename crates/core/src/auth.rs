use serde::{Deserialize, Serialize};

use crate::{TenantId, UserId};

/// Identity of the actor performing an operation, as supplied by the
/// upstream authentication gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    user_id: UserId,
    email: Option<String>,
    role: Option<String>,
    tenant_id: Option<TenantId>,
}

impl ActorIdentity {
    /// Creates an actor identity.
    #[must_use]
    pub fn new(
        user_id: UserId,
        email: Option<String>,
        role: Option<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            user_id,
            email,
            role,
            tenant_id,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the email, if the gateway supplied one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the role label, if the gateway supplied one.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Returns the tenant the actor is operating in. Platform administrators have none.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }
}
