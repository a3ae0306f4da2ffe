use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use procura_core::{AggregateId, DomainError, TenantId};
use procura_events::{EventBus, EventEnvelope};
use procura_orders::{
    CancelOrder, ConfirmOrder, DeliverOrder, Order, OrderCommand, OrderId, PlaceOrder, ReturnOrder,
    SetInvoiceNumber, ShipOrder, StartPreparing, UpdateOrderDetails, UpdateTracking,
};
use procura_quotation::Quotation;
use rust_decimal::Decimal;

use super::{NewOrder, ORDER_AGGREGATE_TYPE, OrderDetails, ProcurementService, ServiceResult};
use crate::directory::Directory;
use crate::event_store::EventStore;

impl<S, B, D> ProcurementService<S, B, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: Directory,
{
    fn dispatch_order(&self, tenant_id: TenantId, order_id: OrderId, command: OrderCommand) -> ServiceResult<Order> {
        let out = self.dispatcher.dispatch(
            tenant_id,
            order_id.0,
            ORDER_AGGREGATE_TYPE,
            command,
            |_, id| Order::empty(OrderId::new(id)),
        )?;
        Ok(out.aggregate)
    }

    /// Tax rate of the first line's catalog product, else the configured default.
    fn order_tax_rate(&self, tenant_id: TenantId, quotation: &Quotation) -> Decimal {
        let product_rate = quotation
            .items()
            .first()
            .and_then(|item| item.product_id)
            .and_then(|product_id| self.directory.product(tenant_id, product_id))
            .and_then(|product| product.tax_rate);
        match product_rate {
            Some(rate) => rate,
            None => {
                debug!(
                    tenant = %tenant_id,
                    quotation = %quotation.id_typed(),
                    rate = %self.config.default_tax_rate,
                    "no product tax rate; using default"
                );
                self.config.default_tax_rate
            }
        }
    }

    /// Place an order from an accepted quotation, copying its lines.
    pub fn create_order(&self, tenant_id: TenantId, req: NewOrder) -> ServiceResult<Order> {
        let quotation = self.quotation(tenant_id, req.quotation_id)?;
        let supplier_id = quotation
            .supplier_id()
            .ok_or_else(|| DomainError::not_found("quotation", req.quotation_id))?;
        self.active_supplier(tenant_id, supplier_id)?;

        let order_id = OrderId::new(AggregateId::new());
        let tax_rate = self.order_tax_rate(tenant_id, &quotation);
        let command = PlaceOrder::from_quotation(
            tenant_id,
            order_id,
            &quotation,
            req.company_id,
            tax_rate,
            req.delivery_address,
            req.expected_delivery_date,
            req.notes,
            Utc::now(),
        )?;

        let order = self.dispatch_order(tenant_id, order_id, OrderCommand::PlaceOrder(command))?;
        info!(
            tenant = %tenant_id,
            order = %order_id,
            quotation = %req.quotation_id,
            subtotal = %order.subtotal(),
            tax = %order.tax_amount(),
            total = %order.total(),
            "order placed"
        );
        Ok(order)
    }

    pub fn confirm_order(&self, tenant_id: TenantId, order_id: OrderId) -> ServiceResult<Order> {
        let order = self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::ConfirmOrder(ConfirmOrder {
                tenant_id,
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, status = %order.status(), "order status changed");
        Ok(order)
    }

    pub fn start_preparing_order(&self, tenant_id: TenantId, order_id: OrderId) -> ServiceResult<Order> {
        let order = self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::StartPreparing(StartPreparing {
                tenant_id,
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, status = %order.status(), "order status changed");
        Ok(order)
    }

    pub fn ship_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        tracking_number: Option<String>,
    ) -> ServiceResult<Order> {
        let order = self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::ShipOrder(ShipOrder {
                tenant_id,
                order_id,
                tracking_number,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, status = %order.status(), "order status changed");
        Ok(order)
    }

    pub fn deliver_order(&self, tenant_id: TenantId, order_id: OrderId) -> ServiceResult<Order> {
        let order = self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::DeliverOrder(DeliverOrder {
                tenant_id,
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, status = %order.status(), "order status changed");
        Ok(order)
    }

    pub fn cancel_order(&self, tenant_id: TenantId, order_id: OrderId, reason: Option<String>) -> ServiceResult<Order> {
        let order = self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::CancelOrder(CancelOrder {
                tenant_id,
                order_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, status = %order.status(), "order status changed");
        Ok(order)
    }

    pub fn return_order(&self, tenant_id: TenantId, order_id: OrderId, reason: Option<String>) -> ServiceResult<Order> {
        let order = self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::ReturnOrder(ReturnOrder {
                tenant_id,
                order_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, order = %order_id, status = %order.status(), "order status changed");
        Ok(order)
    }

    pub fn update_order_details(&self, tenant_id: TenantId, order_id: OrderId, req: OrderDetails) -> ServiceResult<Order> {
        self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::UpdateOrderDetails(UpdateOrderDetails {
                tenant_id,
                order_id,
                delivery_address: req.delivery_address,
                notes: req.notes,
                expected_delivery_date: req.expected_delivery_date,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn update_order_tracking(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        tracking_number: impl Into<String>,
    ) -> ServiceResult<Order> {
        self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::UpdateTracking(UpdateTracking {
                tenant_id,
                order_id,
                tracking_number: tracking_number.into(),
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn set_order_invoice_number(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        invoice_number: impl Into<String>,
    ) -> ServiceResult<Order> {
        self.dispatch_order(
            tenant_id,
            order_id,
            OrderCommand::SetInvoiceNumber(SetInvoiceNumber {
                tenant_id,
                order_id,
                invoice_number: invoice_number.into(),
                occurred_at: Utc::now(),
            }),
        )
    }
}
