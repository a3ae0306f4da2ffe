//! `procura-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the procurement
//! modules (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod state;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CompanyId, ProductId, SupplierId, TenantId};
pub use state::StateMachine;
