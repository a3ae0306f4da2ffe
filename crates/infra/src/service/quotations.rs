use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use procura_core::{AggregateId, CompanyId, DomainError, SupplierId, TenantId};
use procura_events::{EventBus, EventEnvelope};
use procura_quotation::{
    AcceptQuotation, AddQuotationItem, ApplyItemDiscount, ComparisonRecord, CreateQuotation,
    ExpireQuotation, Quotation, QuotationCommand, QuotationId, QuotationItemInput, QuotationTerms,
    RejectQuotation, RemoveQuotationItem, StartReview, SubmitQuotation, SupplierProfile,
    UpdateQuotationItem, UpdateQuotationTerms, compare_quotations,
};
use procura_rfq::{Rfq, RfqId, RfqStatus};

use super::{ItemDiscount, NewQuotation, ProcurementService, QUOTATION_AGGREGATE_TYPE, ServiceResult};
use crate::directory::Directory;
use crate::event_store::EventStore;
use crate::projections::QuotationSummary;

impl<S, B, D> ProcurementService<S, B, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: Directory,
{
    fn dispatch_quotation(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        command: QuotationCommand,
    ) -> ServiceResult<Quotation> {
        let out = self.dispatcher.dispatch(
            tenant_id,
            quotation_id.0,
            QUOTATION_AGGREGATE_TYPE,
            command,
            |_, id| Quotation::empty(QuotationId::new(id)),
        )?;
        self.index_quotation_events(&out.committed)?;
        Ok(out.aggregate)
    }

    /// RFQ that is open for responses from `supplier_id` right now.
    fn rfq_open_to(&self, tenant_id: TenantId, rfq_id: RfqId, supplier_id: SupplierId) -> ServiceResult<Rfq> {
        let rfq = self.rfq(tenant_id, rfq_id)?;
        if rfq.status() != RfqStatus::Published {
            return Err(DomainError::invalid_state("rfq", rfq.status(), "accept quotations").into());
        }
        if !rfq.accepts_quotations_at(Utc::now()) {
            return Err(DomainError::validation(format!(
                "submission deadline for rfq {rfq_id} has passed"
            ))
            .into());
        }
        if !rfq.admits_supplier(supplier_id) {
            return Err(DomainError::validation(format!(
                "supplier {supplier_id} is not invited to rfq {rfq_id}"
            ))
            .into());
        }
        Ok(rfq)
    }

    fn create_version(
        &self,
        tenant_id: TenantId,
        rfq: &Rfq,
        supplier_id: SupplierId,
        terms: QuotationTerms,
        items: Vec<QuotationItemInput>,
        duplicated_from: Option<QuotationId>,
    ) -> ServiceResult<Quotation> {
        let rfq_id = rfq.id_typed();
        let company_id = rfq
            .company_id()
            .ok_or_else(|| DomainError::not_found("rfq", rfq_id))?;
        let quotation_id = QuotationId::new(AggregateId::new());
        let version_number = self.quotation_index.next_version(tenant_id, rfq_id, supplier_id);

        let quotation = self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::CreateQuotation(CreateQuotation {
                tenant_id,
                quotation_id,
                rfq_id,
                company_id,
                supplier_id,
                version_number,
                rfq_item_lines: rfq.items().iter().map(|i| i.line_no).collect(),
                terms,
                items,
                duplicated_from,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(
            tenant = %tenant_id,
            rfq = %rfq_id,
            supplier = %supplier_id,
            quotation = %quotation_id,
            version = version_number,
            "quotation version created"
        );
        Ok(quotation)
    }

    /// Create a supplier's quotation for a published RFQ.
    ///
    /// A supplier that already quoted gets the next version number; earlier
    /// versions stay as they are.
    pub fn create_quotation(&self, tenant_id: TenantId, req: NewQuotation) -> ServiceResult<Quotation> {
        self.active_supplier(tenant_id, req.supplier_id)?;
        let rfq = self.rfq_open_to(tenant_id, req.rfq_id, req.supplier_id)?;
        let terms = req
            .terms
            .unwrap_or_else(|| QuotationTerms::in_currency(self.config.default_currency.clone()));
        self.create_version(tenant_id, &rfq, req.supplier_id, terms, req.items, None)
    }

    /// Copy a quotation's terms and items into a new DRAFT version.
    pub fn duplicate_quotation(&self, tenant_id: TenantId, quotation_id: QuotationId) -> ServiceResult<Quotation> {
        let source = self.quotation(tenant_id, quotation_id)?;
        let (Some(rfq_id), Some(supplier_id)) = (source.rfq_id(), source.supplier_id()) else {
            return Err(DomainError::not_found("quotation", quotation_id).into());
        };
        let rfq = self.rfq(tenant_id, rfq_id)?;
        let items = source.items().iter().map(|item| item.to_input()).collect();
        self.create_version(
            tenant_id,
            &rfq,
            supplier_id,
            source.terms().clone(),
            items,
            Some(quotation_id),
        )
    }

    pub fn update_quotation_terms(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        terms: QuotationTerms,
    ) -> ServiceResult<Quotation> {
        self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::UpdateQuotationTerms(UpdateQuotationTerms {
                tenant_id,
                quotation_id,
                terms,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn add_quotation_item(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        item: QuotationItemInput,
    ) -> ServiceResult<Quotation> {
        self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::AddQuotationItem(AddQuotationItem {
                tenant_id,
                quotation_id,
                item,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn update_quotation_item(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        line_no: u32,
        item: QuotationItemInput,
    ) -> ServiceResult<Quotation> {
        self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::UpdateQuotationItem(UpdateQuotationItem {
                tenant_id,
                quotation_id,
                line_no,
                item,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn remove_quotation_item(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        line_no: u32,
    ) -> ServiceResult<Quotation> {
        self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::RemoveQuotationItem(RemoveQuotationItem {
                tenant_id,
                quotation_id,
                line_no,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn apply_item_discount(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        req: ItemDiscount,
    ) -> ServiceResult<Quotation> {
        self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::ApplyItemDiscount(ApplyItemDiscount {
                tenant_id,
                quotation_id,
                line_no: req.line_no,
                discount_type: req.discount_type,
                value: req.value,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn submit_quotation(&self, tenant_id: TenantId, quotation_id: QuotationId) -> ServiceResult<Quotation> {
        let quotation = self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::SubmitQuotation(SubmitQuotation {
                tenant_id,
                quotation_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(
            tenant = %tenant_id,
            quotation = %quotation_id,
            total = %quotation.total_amount(),
            "quotation submitted"
        );
        Ok(quotation)
    }

    pub fn start_quotation_review(&self, tenant_id: TenantId, quotation_id: QuotationId) -> ServiceResult<Quotation> {
        self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::StartReview(StartReview {
                tenant_id,
                quotation_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Accept on behalf of `company_id`, which must have issued the RFQ.
    pub fn accept_quotation(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        company_id: CompanyId,
    ) -> ServiceResult<Quotation> {
        let quotation = self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::AcceptQuotation(AcceptQuotation {
                tenant_id,
                quotation_id,
                company_id,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, quotation = %quotation_id, "quotation accepted");
        Ok(quotation)
    }

    pub fn reject_quotation(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        company_id: CompanyId,
        reason: Option<String>,
    ) -> ServiceResult<Quotation> {
        let quotation = self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::RejectQuotation(RejectQuotation {
                tenant_id,
                quotation_id,
                company_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        info!(tenant = %tenant_id, quotation = %quotation_id, "quotation rejected");
        Ok(quotation)
    }

    /// Expire a quotation whose `valid_until` date is behind today.
    pub fn expire_quotation(&self, tenant_id: TenantId, quotation_id: QuotationId) -> ServiceResult<Quotation> {
        let now = Utc::now();
        self.dispatch_quotation(
            tenant_id,
            quotation_id,
            QuotationCommand::ExpireQuotation(ExpireQuotation {
                tenant_id,
                quotation_id,
                today: now.date_naive(),
                occurred_at: now,
            }),
        )
    }

    /// Every version a supplier submitted for an RFQ, oldest first.
    pub fn quotation_versions(
        &self,
        tenant_id: TenantId,
        rfq_id: RfqId,
        supplier_id: SupplierId,
    ) -> ServiceResult<Vec<Quotation>> {
        self.load_summaries(tenant_id, self.quotation_index.versions(tenant_id, rfq_id, supplier_id))
    }

    /// Side-by-side view of every quotation received for an RFQ, cheapest first.
    pub fn compare_quotations(&self, tenant_id: TenantId, rfq_id: RfqId) -> ServiceResult<Vec<ComparisonRecord>> {
        self.rfq(tenant_id, rfq_id)?;
        let quotations = self.load_summaries(tenant_id, self.quotation_index.by_rfq(tenant_id, rfq_id))?;
        Ok(compare_quotations(&quotations, |supplier_id| {
            self.directory
                .supplier(tenant_id, supplier_id)
                .map(|s| SupplierProfile {
                    name: s.name,
                    rating: s.rating,
                })
        }))
    }

    fn load_summaries(&self, tenant_id: TenantId, rows: Vec<QuotationSummary>) -> ServiceResult<Vec<Quotation>> {
        rows.into_iter()
            .map(|row| self.quotation(tenant_id, row.quotation_id))
            .collect()
    }
}
