//! Tenant-isolated storage for disposable procurement read models.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
