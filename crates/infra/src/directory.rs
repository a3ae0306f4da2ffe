//! Lookups of master data the procurement core does not own.
//!
//! Companies, suppliers and catalog products live in other systems; the
//! service only reads them through [`Directory`].

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{CompanyId, ProductId, SupplierId, TenantId};
use procura_pricing::CatalogProduct;

use crate::read_model::{InMemoryTenantStore, TenantStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_id: CompanyId,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRecord {
    pub supplier_id: SupplierId,
    pub name: String,
    pub is_active: bool,
    /// Average review score, if the supplier has been rated.
    pub rating: Option<Decimal>,
}

/// Read-only master data lookups, tenant-scoped.
pub trait Directory: Send + Sync {
    fn company(&self, tenant_id: TenantId, company_id: CompanyId) -> Option<CompanyRecord>;
    fn supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) -> Option<SupplierRecord>;
    fn product(&self, tenant_id: TenantId, product_id: ProductId) -> Option<CatalogProduct>;
}

impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    fn company(&self, tenant_id: TenantId, company_id: CompanyId) -> Option<CompanyRecord> {
        (**self).company(tenant_id, company_id)
    }

    fn supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) -> Option<SupplierRecord> {
        (**self).supplier(tenant_id, supplier_id)
    }

    fn product(&self, tenant_id: TenantId, product_id: ProductId) -> Option<CatalogProduct> {
        (**self).product(tenant_id, product_id)
    }
}

/// Directory backed by tenant stores, for tests and the demo.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    companies: InMemoryTenantStore<CompanyId, CompanyRecord>,
    suppliers: InMemoryTenantStore<SupplierId, SupplierRecord>,
    products: InMemoryTenantStore<ProductId, CatalogProduct>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_company(&self, tenant_id: TenantId, company: CompanyRecord) {
        self.companies.upsert(tenant_id, company.company_id, company);
    }

    pub fn upsert_supplier(&self, tenant_id: TenantId, supplier: SupplierRecord) {
        self.suppliers.upsert(tenant_id, supplier.supplier_id, supplier);
    }

    pub fn upsert_product(&self, tenant_id: TenantId, product: CatalogProduct) {
        self.products.upsert(tenant_id, product.product_id, product);
    }
}

impl Directory for InMemoryDirectory {
    fn company(&self, tenant_id: TenantId, company_id: CompanyId) -> Option<CompanyRecord> {
        self.companies.get(tenant_id, &company_id)
    }

    fn supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) -> Option<SupplierRecord> {
        self.suppliers.get(tenant_id, &supplier_id)
    }

    fn product(&self, tenant_id: TenantId, product_id: ProductId) -> Option<CatalogProduct> {
        self.products.get(tenant_id, &product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lookups_are_tenant_scoped() {
        let dir = InMemoryDirectory::new();
        let tenant_id = TenantId::new();
        let supplier_id = SupplierId::new();
        let product_id = ProductId::new();

        dir.upsert_supplier(
            tenant_id,
            SupplierRecord {
                supplier_id,
                name: "Acme Tools".to_string(),
                is_active: true,
                rating: Some(dec!(4.5)),
            },
        );
        dir.upsert_product(tenant_id, CatalogProduct::new(product_id, "Drill", dec!(89.90)));

        assert_eq!(dir.supplier(tenant_id, supplier_id).unwrap().name, "Acme Tools");
        assert_eq!(dir.product(tenant_id, product_id).unwrap().base_price, dec!(89.90));
        assert!(dir.supplier(TenantId::new(), supplier_id).is_none());
        assert!(dir.company(tenant_id, CompanyId::new()).is_none());
    }
}
