mod schema;
mod scoped;
mod store;
mod value;

pub use schema::DIRECTORY_VERSIONED_SCHEMAS;
pub use scoped::TenantScopedStore;
pub use store::{RecordStore, SqliteRecordStore};
pub use value::{Filter, Record, SqlValue};
