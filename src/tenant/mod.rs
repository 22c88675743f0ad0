//! Ambient tenant context.
//!
//! The tenant identifier for one inbound operation is bound to a tokio
//! task-local, so everything running within that operation's future can read
//! it without threading it through every signature. Concurrent operations
//! never observe each other's binding. Code running outside any scope (the
//! job dispatcher, bootstrap) simply sees no tenant.

use std::fmt;
use std::future::Future;

/// Identifier of the tenant owning the current inbound operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        TenantId(value.to_string())
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        TenantId(value)
    }
}

tokio::task_local! {
    static CURRENT_TENANT: TenantId;
}

/// Run a future with the given tenant bound for its entire duration.
pub async fn scope<F: Future>(tenant: TenantId, f: F) -> F::Output {
    CURRENT_TENANT.scope(tenant, f).await
}

/// The tenant bound to the current logical task, if any.
pub fn current() -> Option<TenantId> {
    CURRENT_TENANT.try_with(|t| t.clone()).ok()
}
