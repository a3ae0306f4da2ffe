//! Infrastructure layer: event storage, command dispatch, read models and the
//! procurement application service.

pub mod command_dispatcher;
pub mod config;
pub mod directory;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod service;


pub use config::{ConfigError, ProcurementConfig};
pub use directory::{CompanyRecord, Directory, InMemoryDirectory, SupplierRecord};
pub use service::{ProcurementService, ServiceError, ServiceResult};
