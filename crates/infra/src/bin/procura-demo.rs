//! Runs one procurement cycle end to end on in-memory infrastructure.
//!
//! `RUST_LOG=debug cargo run -p procura-infra --bin procura-demo`

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::info;

use procura_core::{CompanyId, ProductId, SupplierId, TenantId};
use procura_events::{EventEnvelope, InMemoryEventBus};
use procura_infra::event_store::InMemoryEventStore;
use procura_infra::service::{NewOrder, NewPayment, NewQuotation, NewRfq};
use procura_infra::{CompanyRecord, InMemoryDirectory, ProcurementConfig, ProcurementService, SupplierRecord};
use procura_pricing::CatalogProduct;
use procura_quotation::QuotationItemInput;
use procura_rfq::{RfqItemInput, RfqType};

fn main() -> anyhow::Result<()> {
    procura_observability::init();

    let tenant_id = TenantId::new();
    let company_id = CompanyId::new();
    let supplier_id = SupplierId::new();
    let product_id = ProductId::new();

    let directory = Arc::new(InMemoryDirectory::new());
    directory.upsert_company(
        tenant_id,
        CompanyRecord {
            company_id,
            name: "Contoso Manufacturing".to_string(),
            is_active: true,
        },
    );
    directory.upsert_supplier(
        tenant_id,
        SupplierRecord {
            supplier_id,
            name: "Northwind Supplies".to_string(),
            is_active: true,
            rating: None,
        },
    );
    directory.upsert_product(
        tenant_id,
        CatalogProduct::new(product_id, "Steel bracket", Decimal::new(1250, 2)),
    );

    let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
    let service = ProcurementService::new(
        InMemoryEventStore::new(),
        bus,
        directory,
        ProcurementConfig::from_env(),
    );

    let rfq = service
        .create_rfq(
            tenant_id,
            NewRfq {
                company_id,
                title: "Brackets for line 3".to_string(),
                description: Some("Galvanized, 40mm".to_string()),
                rfq_type: RfqType::Invited,
                submission_deadline: Utc::now() + Duration::days(10),
                expected_delivery_date: None,
            },
        )
        .context("create rfq")?;
    let rfq_id = rfq.id_typed();
    service.add_rfq_item(
        tenant_id,
        rfq_id,
        RfqItemInput {
            item_name: "Steel bracket".to_string(),
            specification: None,
            quantity: 400,
            unit: "pcs".to_string(),
            category: Some("hardware".to_string()),
        },
    )?;
    service.invite_supplier(tenant_id, rfq_id, supplier_id)?;
    service.publish_rfq(tenant_id, rfq_id)?;

    let quotation = service
        .create_quotation(
            tenant_id,
            NewQuotation {
                rfq_id,
                supplier_id,
                terms: None,
                items: vec![QuotationItemInput {
                    rfq_item_line: Some(1),
                    product_id: Some(product_id),
                    description: None,
                    quantity: 400,
                    unit_price: Decimal::new(1180, 2),
                    discount_amount: Decimal::new(5000, 2),
                }],
            },
        )
        .context("create quotation")?;
    let quotation_id = quotation.id_typed();
    service.submit_quotation(tenant_id, quotation_id)?;
    service.accept_quotation(tenant_id, quotation_id, company_id)?;

    let order = service
        .create_order(
            tenant_id,
            NewOrder {
                quotation_id,
                company_id,
                delivery_address: Some("Plant 2, Dock B".to_string()),
                expected_delivery_date: None,
                notes: None,
            },
        )
        .context("create order")?;
    let order_id = order.id_typed();
    service.confirm_order(tenant_id, order_id)?;
    service.ship_order(tenant_id, order_id, Some("1Z999AA10123456784".to_string()))?;
    let order = service.deliver_order(tenant_id, order_id)?;

    let payment = service
        .create_payment(
            tenant_id,
            NewPayment {
                order_id,
                amount: order.total(),
                method: Some("bank_transfer".to_string()),
                transaction_id: None,
                notes: None,
            },
        )
        .context("create payment")?;
    let payment = service.complete_payment(tenant_id, payment.id_typed(), Some("TX-0001".to_string()))?;

    info!(
        tenant = %tenant_id,
        order = %order_id,
        subtotal = %order.subtotal(),
        tax = %order.tax_amount(),
        total = %order.total(),
        payment_status = %payment.status(),
        "procurement cycle complete"
    );
    Ok(())
}
