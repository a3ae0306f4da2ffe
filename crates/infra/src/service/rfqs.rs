use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use procura_core::{AggregateId, SupplierId, TenantId};
use procura_events::{EventBus, EventEnvelope};
use procura_rfq::{
    AddRfqItem, CancelRfq, CloseRfq, CreateRfq, DeleteRfq, InviteSupplier, PublishRfq,
    RemoveRfqItem, RevokeInvitation, Rfq, RfqCommand, RfqId, RfqItemInput, UpdateRfqDetails,
    UpdateRfqItem,
};

use super::{NewRfq, ProcurementService, RFQ_AGGREGATE_TYPE, RfqDetails, ServiceResult};
use crate::directory::Directory;
use crate::event_store::EventStore;

impl<S, B, D> ProcurementService<S, B, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: Directory,
{
    fn dispatch_rfq(&self, tenant_id: TenantId, rfq_id: RfqId, command: RfqCommand) -> ServiceResult<Rfq> {
        let out = self.dispatcher.dispatch(
            tenant_id,
            rfq_id.0,
            RFQ_AGGREGATE_TYPE,
            command,
            |_, id| Rfq::empty(RfqId::new(id)),
        )?;
        Ok(out.aggregate)
    }

    pub fn create_rfq(&self, tenant_id: TenantId, req: NewRfq) -> ServiceResult<Rfq> {
        let rfq_id = RfqId::new(AggregateId::new());
        let rfq = self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::CreateRfq(CreateRfq {
                tenant_id,
                rfq_id,
                company_id: req.company_id,
                title: req.title,
                description: req.description,
                rfq_type: req.rfq_type,
                submission_deadline: req.submission_deadline,
                expected_delivery_date: req.expected_delivery_date,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, rfq = %rfq_id, "rfq created");
        Ok(rfq)
    }

    pub fn update_rfq_details(&self, tenant_id: TenantId, rfq_id: RfqId, req: RfqDetails) -> ServiceResult<Rfq> {
        self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::UpdateRfqDetails(UpdateRfqDetails {
                tenant_id,
                rfq_id,
                title: req.title,
                description: req.description,
                submission_deadline: req.submission_deadline,
                expected_delivery_date: req.expected_delivery_date,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn add_rfq_item(&self, tenant_id: TenantId, rfq_id: RfqId, item: RfqItemInput) -> ServiceResult<Rfq> {
        self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::AddRfqItem(AddRfqItem {
                tenant_id,
                rfq_id,
                item,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn update_rfq_item(
        &self,
        tenant_id: TenantId,
        rfq_id: RfqId,
        line_no: u32,
        item: RfqItemInput,
    ) -> ServiceResult<Rfq> {
        self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::UpdateRfqItem(UpdateRfqItem {
                tenant_id,
                rfq_id,
                line_no,
                item,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn remove_rfq_item(&self, tenant_id: TenantId, rfq_id: RfqId, line_no: u32) -> ServiceResult<Rfq> {
        self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::RemoveRfqItem(RemoveRfqItem {
                tenant_id,
                rfq_id,
                line_no,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Invite a supplier to an INVITED RFQ. The supplier must exist and be active.
    pub fn invite_supplier(&self, tenant_id: TenantId, rfq_id: RfqId, supplier_id: SupplierId) -> ServiceResult<Rfq> {
        self.active_supplier(tenant_id, supplier_id)?;
        self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::InviteSupplier(InviteSupplier {
                tenant_id,
                rfq_id,
                supplier_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn revoke_invitation(&self, tenant_id: TenantId, rfq_id: RfqId, supplier_id: SupplierId) -> ServiceResult<Rfq> {
        self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::RevokeInvitation(RevokeInvitation {
                tenant_id,
                rfq_id,
                supplier_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn publish_rfq(&self, tenant_id: TenantId, rfq_id: RfqId) -> ServiceResult<Rfq> {
        let rfq = self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::PublishRfq(PublishRfq {
                tenant_id,
                rfq_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, rfq = %rfq_id, items = rfq.items().len(), "rfq published");
        Ok(rfq)
    }

    pub fn close_rfq(&self, tenant_id: TenantId, rfq_id: RfqId) -> ServiceResult<Rfq> {
        let rfq = self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::CloseRfq(CloseRfq {
                tenant_id,
                rfq_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, rfq = %rfq_id, "rfq closed");
        Ok(rfq)
    }

    pub fn cancel_rfq(&self, tenant_id: TenantId, rfq_id: RfqId, reason: Option<String>) -> ServiceResult<Rfq> {
        let rfq = self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::CancelRfq(CancelRfq {
                tenant_id,
                rfq_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, rfq = %rfq_id, "rfq cancelled");
        Ok(rfq)
    }

    /// Delete an RFQ. Fails with `ResourceInUse` while any quotation references it.
    pub fn delete_rfq(&self, tenant_id: TenantId, rfq_id: RfqId) -> ServiceResult<Rfq> {
        let quotation_count = self.quotation_index.count_for_rfq(tenant_id, rfq_id);
        let rfq = self.dispatch_rfq(
            tenant_id,
            rfq_id,
            RfqCommand::DeleteRfq(DeleteRfq {
                tenant_id,
                rfq_id,
                quotation_count,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, rfq = %rfq_id, "rfq deleted");
        Ok(rfq)
    }
}
