//! Transparent tenant scoping over a [`RecordStore`].
//!
//! Every operation on a tenant-owned entity is rewritten before it reaches
//! the database: reads, updates and deletes get the ambient tenant merged
//! into their filter, and creates get the tenant stamped onto the row.
//! Entities without a tenant field, and operations running with no tenant
//! bound (background jobs, bootstrap), pass through untouched.

use super::store::RecordStore;
use super::value::{Filter, Record};
use crate::tenant;
use anyhow::Result;
use std::sync::Arc;

/// Tenant-owned entities and the column holding their owning tenant.
/// Anything not listed here is global and never rewritten.
const TENANT_OWNED_ENTITIES: &[(&str, &str)] = &[("users", "team_id"), ("box_users", "box_id")];

fn tenant_field(entity: &str) -> Option<&'static str> {
    TENANT_OWNED_ENTITIES
        .iter()
        .find(|(name, _)| *name == entity)
        .map(|(_, field)| *field)
}

/// Decorator implementing [`RecordStore`] by delegating to an inner store
/// after rewriting arguments for the ambient tenant.
pub struct TenantScopedStore {
    inner: Arc<dyn RecordStore>,
}

impl TenantScopedStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        TenantScopedStore { inner }
    }

    /// The filter actually sent to the inner store. The tenant clause is
    /// merged last so a caller-supplied clause on the same column loses.
    fn scoped_filter(entity: &str, filter: &Filter) -> Filter {
        let mut scoped = filter.clone();
        if let (Some(field), Some(tenant)) = (tenant_field(entity), tenant::current()) {
            scoped.put(field, tenant.as_str());
        }
        scoped
    }

    /// The row actually inserted. Stamps unconditionally, so a caller cannot
    /// write into another tenant by supplying the field themselves.
    fn stamped_values(entity: &str, mut values: Record) -> Record {
        if let (Some(field), Some(tenant)) = (tenant_field(entity), tenant::current()) {
            values.insert(field.to_string(), tenant.as_str().into());
        }
        values
    }
}

impl RecordStore for TenantScopedStore {
    fn find_first(&self, entity: &str, filter: &Filter) -> Result<Option<Record>> {
        self.inner
            .find_first(entity, &Self::scoped_filter(entity, filter))
    }

    fn find_many(&self, entity: &str, filter: &Filter) -> Result<Vec<Record>> {
        self.inner
            .find_many(entity, &Self::scoped_filter(entity, filter))
    }

    fn count(&self, entity: &str, filter: &Filter) -> Result<usize> {
        self.inner.count(entity, &Self::scoped_filter(entity, filter))
    }

    fn create(&self, entity: &str, values: Record) -> Result<Record> {
        self.inner.create(entity, Self::stamped_values(entity, values))
    }

    fn create_many(&self, entity: &str, values: Vec<Record>) -> Result<usize> {
        let stamped = values
            .into_iter()
            .map(|row| Self::stamped_values(entity, row))
            .collect();
        self.inner.create_many(entity, stamped)
    }

    fn update(&self, entity: &str, filter: &Filter, values: Record) -> Result<usize> {
        self.inner
            .update(entity, &Self::scoped_filter(entity, filter), values)
    }

    fn delete(&self, entity: &str, filter: &Filter) -> Result<usize> {
        self.inner
            .delete(entity, &Self::scoped_filter(entity, filter))
    }
}
