use crate::data_gateway::TenantScopedStore;
use crate::job_queue::JobStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub gateway: Arc<TenantScopedStore>,
    pub job_store: Arc<dyn JobStore>,
}

impl ServerState {
    pub fn new(gateway: Arc<TenantScopedStore>, job_store: Arc<dyn JobStore>) -> Self {
        ServerState { gateway, job_store }
    }
}
