//! Procurement application service.
//!
//! One method per business verb. Each loads the target aggregate from its
//! stream, resolves cross-aggregate facts (RFQ state, supplier status, order
//! totals, quotation counts), dispatches a single command and returns the
//! rehydrated aggregate. Every call appends to exactly one stream.

mod orders;
mod payments;
mod quotations;
mod requests;
mod rfqs;

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;

use procura_core::{DomainError, SupplierId, TenantId};
use procura_events::{EventBus, EventEnvelope};
use procura_orders::{Order, OrderId};
use procura_payments::{Payment, PaymentId};
use procura_pricing::{PriceBreakdown, effective_price};
use procura_quotation::{Quotation, QuotationId};
use procura_rfq::{Rfq, RfqId};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::ProcurementConfig;
use crate::directory::{Directory, SupplierRecord};
use crate::event_store::{EventStore, StoredEvent};
use crate::projections::{QuotationIndexProjection, QuotationProjectionError, QuotationSummary};
use crate::read_model::InMemoryTenantStore;

pub use requests::{
    ItemDiscount, NewOrder, NewPayment, NewQuotation, NewRfq, OrderDetails, PaymentDetails,
    Refund, RfqDetails,
};

pub const RFQ_AGGREGATE_TYPE: &str = "procurement.rfq";
pub const ORDER_AGGREGATE_TYPE: &str = "procurement.order";
pub const PAYMENT_AGGREGATE_TYPE: &str = "procurement.payment";
pub use crate::projections::quotations::QUOTATION_AGGREGATE_TYPE;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Business rule failure, unmodified from the domain layer.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage, concurrency, deserialization or publication failure.
    #[error(transparent)]
    Dispatch(DispatchError),

    #[error(transparent)]
    Projection(#[from] QuotationProjectionError),
}

impl From<DispatchError> for ServiceError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(err) => ServiceError::Domain(err),
            other => ServiceError::Dispatch(other),
        }
    }
}

impl ServiceError {
    /// The domain error, if this is a business rule failure.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

type QuotationIndex = QuotationIndexProjection<InMemoryTenantStore<QuotationId, QuotationSummary>>;

/// Entry point for every procurement operation.
#[derive(Debug)]
pub struct ProcurementService<S, B, D> {
    dispatcher: CommandDispatcher<S, B>,
    directory: D,
    quotation_index: QuotationIndex,
    config: ProcurementConfig,
}

impl<S, B, D> ProcurementService<S, B, D> {
    pub fn new(store: S, bus: B, directory: D, config: ProcurementConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            directory,
            quotation_index: QuotationIndexProjection::new(InMemoryTenantStore::new()),
            config,
        }
    }

    pub fn config(&self) -> &ProcurementConfig {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn bus(&self) -> &B {
        self.dispatcher.bus()
    }

    /// Quotation versions by RFQ and supplier, kept current by this service.
    pub fn quotation_index(&self) -> &QuotationIndex {
        &self.quotation_index
    }
}

impl<S, B, D> ProcurementService<S, B, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: Directory,
{
    /// Rebuild the quotation index from the store's quotation envelopes.
    pub fn rebuild_quotation_index(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> ServiceResult<()> {
        self.quotation_index.rebuild_from_scratch(envelopes)?;
        Ok(())
    }

    /// Unit price breakdown for `quantity` units of a catalog product today.
    pub fn effective_price(
        &self,
        tenant_id: TenantId,
        product_id: procura_core::ProductId,
        quantity: i64,
    ) -> ServiceResult<PriceBreakdown> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive").into());
        }
        let product = self
            .directory
            .product(tenant_id, product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| DomainError::not_found("product", product_id))?;
        Ok(effective_price(&product, quantity, Utc::now().date_naive()))
    }

    pub fn rfq(&self, tenant_id: TenantId, rfq_id: RfqId) -> ServiceResult<Rfq> {
        let rfq = self
            .dispatcher
            .load(tenant_id, rfq_id.0, |_, id| Rfq::empty(RfqId::new(id)))?;
        if !rfq.exists() {
            return Err(DomainError::not_found("rfq", rfq_id).into());
        }
        Ok(rfq)
    }

    pub fn quotation(&self, tenant_id: TenantId, quotation_id: QuotationId) -> ServiceResult<Quotation> {
        let quotation = self.dispatcher.load(tenant_id, quotation_id.0, |_, id| {
            Quotation::empty(QuotationId::new(id))
        })?;
        if !quotation.exists() {
            return Err(DomainError::not_found("quotation", quotation_id).into());
        }
        Ok(quotation)
    }

    pub fn order(&self, tenant_id: TenantId, order_id: OrderId) -> ServiceResult<Order> {
        let order = self
            .dispatcher
            .load(tenant_id, order_id.0, |_, id| Order::empty(OrderId::new(id)))?;
        if !order.exists() {
            return Err(DomainError::not_found("order", order_id).into());
        }
        Ok(order)
    }

    pub fn payment(&self, tenant_id: TenantId, payment_id: PaymentId) -> ServiceResult<Payment> {
        let payment = self
            .dispatcher
            .load(tenant_id, payment_id.0, |_, id| Payment::empty(PaymentId(id)))?;
        if !payment.exists() {
            return Err(DomainError::not_found("payment", payment_id).into());
        }
        Ok(payment)
    }

    /// The payment settling `order_id`, if one was created.
    pub fn payment_for_order(&self, tenant_id: TenantId, order_id: OrderId) -> ServiceResult<Payment> {
        self.payment(tenant_id, PaymentId::for_order(order_id))
    }

    /// Supplier that exists and is active, or the matching domain error.
    fn active_supplier(&self, tenant_id: TenantId, supplier_id: SupplierId) -> ServiceResult<SupplierRecord> {
        let supplier = self
            .directory
            .supplier(tenant_id, supplier_id)
            .ok_or_else(|| DomainError::not_found("supplier", supplier_id))?;
        if !supplier.is_active {
            return Err(DomainError::validation(format!("supplier {supplier_id} is not active")).into());
        }
        Ok(supplier)
    }

    fn index_quotation_events(&self, committed: &[StoredEvent]) -> ServiceResult<()> {
        for stored in committed {
            self.quotation_index.apply_envelope(&stored.to_envelope())?;
        }
        Ok(())
    }
}
