use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{
    Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, ProductId, StateMachine,
    SupplierId, TenantId,
};
use procura_events::Event;
use procura_pricing::{DiscountType, discount_amount, line_total};
use procura_rfq::RfqId;

/// Quotation identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotationId(pub AggregateId);

impl QuotationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for QuotationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quotation status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotationStatus {
    Draft,
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    Expired,
}

impl QuotationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuotationStatus::Draft => "DRAFT",
            QuotationStatus::Submitted => "SUBMITTED",
            QuotationStatus::UnderReview => "UNDER_REVIEW",
            QuotationStatus::Accepted => "ACCEPTED",
            QuotationStatus::Rejected => "REJECTED",
            QuotationStatus::Expired => "EXPIRED",
        }
    }
}

impl core::fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for QuotationStatus {
    const ENTITY: &'static str = "quotation";

    fn allowed_targets(self) -> &'static [Self] {
        use QuotationStatus::*;
        match self {
            Draft => &[Submitted],
            Submitted => &[UnderReview, Accepted, Rejected, Expired],
            UnderReview => &[Accepted, Rejected, Expired],
            Accepted | Rejected | Expired => &[],
        }
    }
}

/// Commercial terms offered by the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationTerms {
    /// ISO 4217 code, e.g. "USD".
    pub currency: String,
    pub valid_until: Option<NaiveDate>,
    pub delivery_days: Option<u32>,
    pub payment_terms: Option<String>,
    pub warranty_terms: Option<String>,
    pub notes: Option<String>,
}

impl QuotationTerms {
    pub fn in_currency(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            valid_until: None,
            delivery_days: None,
            payment_terms: None,
            warranty_terms: None,
            notes: None,
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        let code = self.currency.as_str();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "currency must be a 3-letter uppercase code, got {code:?}"
            )));
        }
        Ok(())
    }
}

/// Line data supplied by the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItemInput {
    /// RFQ line this item answers, if any.
    pub rfq_item_line: Option<u32>,
    pub product_id: Option<ProductId>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
}

/// A priced line on a quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItem {
    pub line_no: u32,
    pub rfq_item_line: Option<u32>,
    pub product_id: Option<ProductId>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
}

impl QuotationItem {
    fn from_input(line_no: u32, input: &QuotationItemInput) -> Self {
        Self {
            line_no,
            rfq_item_line: input.rfq_item_line,
            product_id: input.product_id,
            description: input.description.clone(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            discount_amount: input.discount_amount,
        }
    }

    /// Input that reproduces this line (used when duplicating a version).
    pub fn to_input(&self) -> QuotationItemInput {
        QuotationItemInput {
            rfq_item_line: self.rfq_item_line,
            product_id: self.product_id,
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_amount: self.discount_amount,
        }
    }

    pub fn gross(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// `unit_price × quantity − discount_amount`.
    pub fn total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity, self.discount_amount)
    }
}

/// The single place a quotation total is computed.
pub fn quotation_total(items: &[QuotationItem]) -> Decimal {
    items.iter().map(QuotationItem::total).sum()
}

/// Aggregate root: Quotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quotation {
    id: QuotationId,
    tenant_id: Option<TenantId>,
    rfq_id: Option<RfqId>,
    company_id: Option<CompanyId>,
    supplier_id: Option<SupplierId>,
    status: QuotationStatus,
    terms: QuotationTerms,
    version_number: u32,
    duplicated_from: Option<QuotationId>,
    rfq_item_lines: Vec<u32>,
    items: Vec<QuotationItem>,
    total_amount: Decimal,
    next_line_no: u32,
    rejection_reason: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    decided_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Quotation {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: QuotationId) -> Self {
        Self {
            id,
            tenant_id: None,
            rfq_id: None,
            company_id: None,
            supplier_id: None,
            status: QuotationStatus::Draft,
            terms: QuotationTerms::in_currency(""),
            version_number: 0,
            duplicated_from: None,
            rfq_item_lines: Vec::new(),
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            next_line_no: 1,
            rejection_reason: None,
            submitted_at: None,
            decided_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> QuotationId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn rfq_id(&self) -> Option<RfqId> {
        self.rfq_id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn status(&self) -> QuotationStatus {
        self.status
    }

    pub fn terms(&self) -> &QuotationTerms {
        &self.terms
    }

    pub fn currency(&self) -> &str {
        &self.terms.currency
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    pub fn duplicated_from(&self) -> Option<QuotationId> {
        self.duplicated_from
    }

    pub fn items(&self) -> &[QuotationItem] {
        &self.items
    }

    pub fn item(&self, line_no: u32) -> Option<&QuotationItem> {
        self.items.iter().find(|i| i.line_no == line_no)
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, QuotationStatus::Draft)
    }
}

impl AggregateRoot for Quotation {
    type Id = QuotationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateQuotation.
///
/// Also used for explicit duplication: `duplicated_from` names the source
/// version and `items` carries its copied lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub rfq_id: RfqId,
    pub company_id: CompanyId,
    pub supplier_id: SupplierId,
    /// `max(existing versions for (rfq, supplier)) + 1`.
    pub version_number: u32,
    /// Line numbers of the RFQ items, for reference validation.
    pub rfq_item_lines: Vec<u32>,
    pub terms: QuotationTerms,
    pub items: Vec<QuotationItemInput>,
    pub duplicated_from: Option<QuotationId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateQuotationTerms (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuotationTerms {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub terms: QuotationTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddQuotationItem (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddQuotationItem {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub item: QuotationItemInput,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateQuotationItem (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuotationItem {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub line_no: u32,
    pub item: QuotationItemInput,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveQuotationItem (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveQuotationItem {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApplyItemDiscount (Draft only).
///
/// Replaces the line's discount with `discount_type`/`value` evaluated on the
/// line gross.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyItemDiscount {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub line_no: u32,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReview {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptQuotation. Only the company that issued the RFQ may accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub company_id: CompanyId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ExpireQuotation. Allowed once `today` is past `valid_until`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub today: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationCommand {
    CreateQuotation(CreateQuotation),
    UpdateQuotationTerms(UpdateQuotationTerms),
    AddQuotationItem(AddQuotationItem),
    UpdateQuotationItem(UpdateQuotationItem),
    RemoveQuotationItem(RemoveQuotationItem),
    ApplyItemDiscount(ApplyItemDiscount),
    SubmitQuotation(SubmitQuotation),
    StartReview(StartReview),
    AcceptQuotation(AcceptQuotation),
    RejectQuotation(RejectQuotation),
    ExpireQuotation(ExpireQuotation),
}

/// Event: QuotationCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationCreated {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub rfq_id: RfqId,
    pub company_id: CompanyId,
    pub supplier_id: SupplierId,
    pub version_number: u32,
    pub rfq_item_lines: Vec<u32>,
    pub terms: QuotationTerms,
    pub items: Vec<QuotationItem>,
    pub duplicated_from: Option<QuotationId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationTermsUpdated {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub terms: QuotationTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Event payload for added/updated/discounted lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItemChanged {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub item: QuotationItem,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItemRemoved {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event payload for status-only changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationDecision {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationRejected {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationEvent {
    QuotationCreated(QuotationCreated),
    QuotationTermsUpdated(QuotationTermsUpdated),
    QuotationItemAdded(QuotationItemChanged),
    QuotationItemUpdated(QuotationItemChanged),
    QuotationItemRemoved(QuotationItemRemoved),
    QuotationSubmitted(QuotationDecision),
    QuotationReviewStarted(QuotationDecision),
    QuotationAccepted(QuotationDecision),
    QuotationRejected(QuotationRejected),
    QuotationExpired(QuotationDecision),
}

impl QuotationEvent {
    pub fn quotation_id(&self) -> QuotationId {
        match self {
            QuotationEvent::QuotationCreated(e) => e.quotation_id,
            QuotationEvent::QuotationTermsUpdated(e) => e.quotation_id,
            QuotationEvent::QuotationItemAdded(e) | QuotationEvent::QuotationItemUpdated(e) => {
                e.quotation_id
            }
            QuotationEvent::QuotationItemRemoved(e) => e.quotation_id,
            QuotationEvent::QuotationSubmitted(e)
            | QuotationEvent::QuotationReviewStarted(e)
            | QuotationEvent::QuotationAccepted(e)
            | QuotationEvent::QuotationExpired(e) => e.quotation_id,
            QuotationEvent::QuotationRejected(e) => e.quotation_id,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        match self {
            QuotationEvent::QuotationCreated(e) => e.tenant_id,
            QuotationEvent::QuotationTermsUpdated(e) => e.tenant_id,
            QuotationEvent::QuotationItemAdded(e) | QuotationEvent::QuotationItemUpdated(e) => {
                e.tenant_id
            }
            QuotationEvent::QuotationItemRemoved(e) => e.tenant_id,
            QuotationEvent::QuotationSubmitted(e)
            | QuotationEvent::QuotationReviewStarted(e)
            | QuotationEvent::QuotationAccepted(e)
            | QuotationEvent::QuotationExpired(e) => e.tenant_id,
            QuotationEvent::QuotationRejected(e) => e.tenant_id,
        }
    }
}

impl Event for QuotationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuotationEvent::QuotationCreated(_) => "procurement.quotation.created",
            QuotationEvent::QuotationTermsUpdated(_) => "procurement.quotation.terms_updated",
            QuotationEvent::QuotationItemAdded(_) => "procurement.quotation.item_added",
            QuotationEvent::QuotationItemUpdated(_) => "procurement.quotation.item_updated",
            QuotationEvent::QuotationItemRemoved(_) => "procurement.quotation.item_removed",
            QuotationEvent::QuotationSubmitted(_) => "procurement.quotation.submitted",
            QuotationEvent::QuotationReviewStarted(_) => "procurement.quotation.review_started",
            QuotationEvent::QuotationAccepted(_) => "procurement.quotation.accepted",
            QuotationEvent::QuotationRejected(_) => "procurement.quotation.rejected",
            QuotationEvent::QuotationExpired(_) => "procurement.quotation.expired",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QuotationEvent::QuotationCreated(e) => e.occurred_at,
            QuotationEvent::QuotationTermsUpdated(e) => e.occurred_at,
            QuotationEvent::QuotationItemAdded(e) | QuotationEvent::QuotationItemUpdated(e) => {
                e.occurred_at
            }
            QuotationEvent::QuotationItemRemoved(e) => e.occurred_at,
            QuotationEvent::QuotationSubmitted(e)
            | QuotationEvent::QuotationReviewStarted(e)
            | QuotationEvent::QuotationAccepted(e)
            | QuotationEvent::QuotationExpired(e) => e.occurred_at,
            QuotationEvent::QuotationRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Quotation {
    type Command = QuotationCommand;
    type Event = QuotationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            QuotationEvent::QuotationCreated(e) => {
                self.id = e.quotation_id;
                self.tenant_id = Some(e.tenant_id);
                self.rfq_id = Some(e.rfq_id);
                self.company_id = Some(e.company_id);
                self.supplier_id = Some(e.supplier_id);
                self.status = QuotationStatus::Draft;
                self.terms = e.terms.clone();
                self.version_number = e.version_number;
                self.duplicated_from = e.duplicated_from;
                self.rfq_item_lines = e.rfq_item_lines.clone();
                self.items = e.items.clone();
                self.next_line_no = e.items.iter().map(|i| i.line_no).max().unwrap_or(0) + 1;
                self.created = true;
            }
            QuotationEvent::QuotationTermsUpdated(e) => {
                self.terms = e.terms.clone();
            }
            QuotationEvent::QuotationItemAdded(e) => {
                self.items.push(e.item.clone());
                self.next_line_no = self.next_line_no.max(e.item.line_no + 1);
            }
            QuotationEvent::QuotationItemUpdated(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.line_no == e.item.line_no) {
                    *item = e.item.clone();
                }
            }
            QuotationEvent::QuotationItemRemoved(e) => {
                self.items.retain(|i| i.line_no != e.line_no);
            }
            QuotationEvent::QuotationSubmitted(e) => {
                self.status = QuotationStatus::Submitted;
                self.submitted_at = Some(e.occurred_at);
            }
            QuotationEvent::QuotationReviewStarted(_) => {
                self.status = QuotationStatus::UnderReview;
            }
            QuotationEvent::QuotationAccepted(e) => {
                self.status = QuotationStatus::Accepted;
                self.decided_at = Some(e.occurred_at);
            }
            QuotationEvent::QuotationRejected(e) => {
                self.status = QuotationStatus::Rejected;
                self.rejection_reason = e.reason.clone();
                self.decided_at = Some(e.occurred_at);
            }
            QuotationEvent::QuotationExpired(e) => {
                self.status = QuotationStatus::Expired;
                self.decided_at = Some(e.occurred_at);
            }
        }

        // Totals follow the items; recomputed after every event.
        self.total_amount = quotation_total(&self.items);
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            QuotationCommand::CreateQuotation(cmd) => self.handle_create(cmd),
            QuotationCommand::UpdateQuotationTerms(cmd) => self.handle_update_terms(cmd),
            QuotationCommand::AddQuotationItem(cmd) => self.handle_add_item(cmd),
            QuotationCommand::UpdateQuotationItem(cmd) => self.handle_update_item(cmd),
            QuotationCommand::RemoveQuotationItem(cmd) => self.handle_remove_item(cmd),
            QuotationCommand::ApplyItemDiscount(cmd) => self.handle_apply_discount(cmd),
            QuotationCommand::SubmitQuotation(cmd) => self.handle_submit(cmd),
            QuotationCommand::StartReview(cmd) => self.handle_start_review(cmd),
            QuotationCommand::AcceptQuotation(cmd) => self.handle_accept(cmd),
            QuotationCommand::RejectQuotation(cmd) => self.handle_reject(cmd),
            QuotationCommand::ExpireQuotation(cmd) => self.handle_expire(cmd),
        }
    }
}

impl Quotation {
    fn ensure_exists(&self, tenant_id: TenantId, quotation_id: QuotationId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("quotation", quotation_id));
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != quotation_id {
            return Err(DomainError::invariant("quotation_id mismatch"));
        }
        Ok(())
    }

    fn ensure_modifiable(&self, attempted: &str) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invalid_state("quotation", self.status, attempted));
        }
        Ok(())
    }

    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if self.company_id != Some(company_id) {
            return Err(DomainError::unauthorized(format!(
                "company {company_id} did not issue the rfq for quotation {}",
                self.id
            )));
        }
        Ok(())
    }

    fn validate_item(input: &QuotationItemInput, rfq_item_lines: &[u32]) -> Result<(), DomainError> {
        if input.rfq_item_line.is_none() && input.product_id.is_none() {
            return Err(DomainError::validation(
                "quotation item must reference an rfq item or a product",
            ));
        }
        if let Some(line) = input.rfq_item_line {
            if !rfq_item_lines.contains(&line) {
                return Err(DomainError::not_found("rfq item", line));
            }
        }
        if input.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit_price must not be negative"));
        }
        if input.discount_amount < Decimal::ZERO {
            return Err(DomainError::validation("discount_amount must not be negative"));
        }
        let gross = input.unit_price * Decimal::from(input.quantity);
        if input.discount_amount > gross {
            return Err(DomainError::validation(format!(
                "discount_amount {} exceeds line gross {gross}",
                input.discount_amount
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateQuotation) -> Result<Vec<QuotationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("quotation already exists"));
        }
        if cmd.version_number == 0 {
            return Err(DomainError::validation("version_number starts at 1"));
        }
        cmd.terms.validate()?;
        for input in &cmd.items {
            Self::validate_item(input, &cmd.rfq_item_lines)?;
        }

        let items = cmd
            .items
            .iter()
            .zip(1u32..)
            .map(|(input, line_no)| QuotationItem::from_input(line_no, input))
            .collect();

        Ok(vec![QuotationEvent::QuotationCreated(QuotationCreated {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            rfq_id: cmd.rfq_id,
            company_id: cmd.company_id,
            supplier_id: cmd.supplier_id,
            version_number: cmd.version_number,
            rfq_item_lines: cmd.rfq_item_lines.clone(),
            terms: cmd.terms.clone(),
            items,
            duplicated_from: cmd.duplicated_from,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_terms(&self, cmd: &UpdateQuotationTerms) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.ensure_modifiable("update terms")?;
        cmd.terms.validate()?;

        Ok(vec![QuotationEvent::QuotationTermsUpdated(QuotationTermsUpdated {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            terms: cmd.terms.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddQuotationItem) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.ensure_modifiable("add items")?;
        Self::validate_item(&cmd.item, &self.rfq_item_lines)?;

        Ok(vec![QuotationEvent::QuotationItemAdded(QuotationItemChanged {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            item: QuotationItem::from_input(self.next_line_no, &cmd.item),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_item(&self, cmd: &UpdateQuotationItem) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.ensure_modifiable("update items")?;
        if self.item(cmd.line_no).is_none() {
            return Err(DomainError::not_found("quotation item", cmd.line_no));
        }
        Self::validate_item(&cmd.item, &self.rfq_item_lines)?;

        Ok(vec![QuotationEvent::QuotationItemUpdated(QuotationItemChanged {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            item: QuotationItem::from_input(cmd.line_no, &cmd.item),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveQuotationItem) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.ensure_modifiable("remove items")?;
        if self.item(cmd.line_no).is_none() {
            return Err(DomainError::not_found("quotation item", cmd.line_no));
        }

        Ok(vec![QuotationEvent::QuotationItemRemoved(QuotationItemRemoved {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            line_no: cmd.line_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_apply_discount(&self, cmd: &ApplyItemDiscount) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.ensure_modifiable("apply discounts")?;
        let Some(current) = self.item(cmd.line_no) else {
            return Err(DomainError::not_found("quotation item", cmd.line_no));
        };
        if cmd.value < Decimal::ZERO {
            return Err(DomainError::validation("discount value must not be negative"));
        }
        if cmd.discount_type == DiscountType::Percentage && cmd.value > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(
                "percentage discount must not exceed 100",
            ));
        }

        let mut item = current.clone();
        item.discount_amount = discount_amount(item.gross(), cmd.discount_type, cmd.value);

        Ok(vec![QuotationEvent::QuotationItemUpdated(QuotationItemChanged {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            item,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitQuotation) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.status.ensure_transition(QuotationStatus::Submitted)?;
        if self.items.is_empty() {
            return Err(DomainError::validation("cannot submit quotation without items"));
        }

        Ok(vec![QuotationEvent::QuotationSubmitted(QuotationDecision {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start_review(&self, cmd: &StartReview) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.status.ensure_transition(QuotationStatus::UnderReview)?;

        Ok(vec![QuotationEvent::QuotationReviewStarted(QuotationDecision {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept(&self, cmd: &AcceptQuotation) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.ensure_company(cmd.company_id)?;
        self.status.ensure_transition(QuotationStatus::Accepted)?;

        Ok(vec![QuotationEvent::QuotationAccepted(QuotationDecision {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectQuotation) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.ensure_company(cmd.company_id)?;
        self.status.ensure_transition(QuotationStatus::Rejected)?;

        Ok(vec![QuotationEvent::QuotationRejected(QuotationRejected {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_expire(&self, cmd: &ExpireQuotation) -> Result<Vec<QuotationEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quotation_id)?;
        self.status.ensure_transition(QuotationStatus::Expired)?;
        match self.terms.valid_until {
            Some(valid_until) if cmd.today > valid_until => {}
            Some(valid_until) => {
                return Err(DomainError::validation(format!(
                    "quotation is valid until {valid_until}"
                )));
            }
            None => {
                return Err(DomainError::validation(
                    "quotation without a validity date cannot expire",
                ));
            }
        }

        Ok(vec![QuotationEvent::QuotationExpired(QuotationDecision {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
