use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use procura_core::TenantId;
use procura_events::{EventBus, EventEnvelope};
use procura_payments::{
    CancelPayment, CompletePayment, CreatePayment, ExpirePayment, FailPayment, Payment,
    PaymentCommand, PaymentId, ProcessPayment, RefundPayment, UpdatePaymentDetails,
};

use super::{NewPayment, PAYMENT_AGGREGATE_TYPE, PaymentDetails, ProcurementService, Refund, ServiceResult};
use crate::directory::Directory;
use crate::event_store::EventStore;

impl<S, B, D> ProcurementService<S, B, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: Directory,
{
    fn dispatch_payment(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        command: PaymentCommand,
    ) -> ServiceResult<Payment> {
        let out = self.dispatcher.dispatch(
            tenant_id,
            payment_id.0,
            PAYMENT_AGGREGATE_TYPE,
            command,
            |_, id| Payment::empty(PaymentId(id)),
        )?;
        Ok(out.aggregate)
    }

    fn log_payment(tenant_id: TenantId, payment: &Payment) {
        info!(
            tenant = %tenant_id,
            payment = %payment.id_typed(),
            status = %payment.status(),
            "payment status changed"
        );
    }

    /// Create the single payment of an order, in the order's currency.
    pub fn create_payment(&self, tenant_id: TenantId, req: NewPayment) -> ServiceResult<Payment> {
        let order = self.order(tenant_id, req.order_id)?;
        let payment_id = PaymentId::for_order(req.order_id);
        let payment = self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::CreatePayment(CreatePayment {
                tenant_id,
                payment_id,
                order_id: req.order_id,
                order_total: order.total(),
                amount: req.amount,
                currency: order.currency().to_string(),
                method: req.method,
                transaction_id: req.transaction_id,
                notes: req.notes,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(
            tenant = %tenant_id,
            payment = %payment_id,
            order = %req.order_id,
            amount = %payment.amount(),
            "payment created"
        );
        Ok(payment)
    }

    pub fn process_payment(&self, tenant_id: TenantId, payment_id: PaymentId) -> ServiceResult<Payment> {
        let payment = self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::ProcessPayment(ProcessPayment {
                tenant_id,
                payment_id,
                occurred_at: Utc::now(),
            }),
        )?;
        Self::log_payment(tenant_id, &payment);
        Ok(payment)
    }

    pub fn complete_payment(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        transaction_id: Option<String>,
    ) -> ServiceResult<Payment> {
        let payment = self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::CompletePayment(CompletePayment {
                tenant_id,
                payment_id,
                transaction_id,
                occurred_at: Utc::now(),
            }),
        )?;
        Self::log_payment(tenant_id, &payment);
        Ok(payment)
    }

    pub fn fail_payment(&self, tenant_id: TenantId, payment_id: PaymentId, reason: Option<String>) -> ServiceResult<Payment> {
        let payment = self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::FailPayment(FailPayment {
                tenant_id,
                payment_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        Self::log_payment(tenant_id, &payment);
        Ok(payment)
    }

    pub fn cancel_payment(&self, tenant_id: TenantId, payment_id: PaymentId, reason: Option<String>) -> ServiceResult<Payment> {
        let payment = self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::CancelPayment(CancelPayment {
                tenant_id,
                payment_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        Self::log_payment(tenant_id, &payment);
        Ok(payment)
    }

    pub fn expire_payment(&self, tenant_id: TenantId, payment_id: PaymentId) -> ServiceResult<Payment> {
        let payment = self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::ExpirePayment(ExpirePayment {
                tenant_id,
                payment_id,
                occurred_at: Utc::now(),
            }),
        )?;
        Self::log_payment(tenant_id, &payment);
        Ok(payment)
    }

    /// Refund a completed payment, fully when `req.amount` is `None`.
    pub fn refund_payment(&self, tenant_id: TenantId, payment_id: PaymentId, req: Refund) -> ServiceResult<Payment> {
        let payment = self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::RefundPayment(RefundPayment {
                tenant_id,
                payment_id,
                amount: req.amount,
                reason: req.reason,
                occurred_at: Utc::now(),
            }),
        )?;
        Self::log_payment(tenant_id, &payment);
        Ok(payment)
    }

    pub fn update_payment_details(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        req: PaymentDetails,
    ) -> ServiceResult<Payment> {
        self.dispatch_payment(
            tenant_id,
            payment_id,
            PaymentCommand::UpdatePaymentDetails(UpdatePaymentDetails {
                tenant_id,
                payment_id,
                method: req.method,
                transaction_id: req.transaction_id,
                notes: req.notes,
                occurred_at: Utc::now(),
            }),
        )
    }
}
