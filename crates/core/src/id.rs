//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a tenant (multi-tenant boundary).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// Identifier of an aggregate root (one event stream per id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

/// Buying company, owned by the company directory collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(Uuid);

/// Responding supplier, owned by the supplier directory collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(Uuid);

/// Catalog product, owned by the product catalog collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(TenantId, "TenantId");
impl_uuid_newtype!(AggregateId, "AggregateId");
impl_uuid_newtype!(CompanyId, "CompanyId");
impl_uuid_newtype!(SupplierId, "SupplierId");
impl_uuid_newtype!(ProductId, "ProductId");

impl AggregateId {
    /// Deterministic child identity (UUIDv5 in the parent's namespace).
    ///
    /// Two derivations with the same parent and purpose always yield the same
    /// id, so "one X per parent" collapses onto a single event stream.
    pub fn derive(parent: AggregateId, purpose: &str) -> Self {
        Self(Uuid::new_v5(&parent.0, purpose.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_stable_per_parent_and_purpose() {
        let parent = AggregateId::new();
        assert_eq!(
            AggregateId::derive(parent, "payment"),
            AggregateId::derive(parent, "payment")
        );
        assert_ne!(
            AggregateId::derive(parent, "payment"),
            AggregateId::derive(parent, "invoice")
        );
        assert_ne!(
            AggregateId::derive(parent, "payment"),
            AggregateId::derive(AggregateId::new(), "payment")
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<SupplierId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.starts_with("SupplierId")));
    }
}
