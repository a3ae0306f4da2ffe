use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{
    Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, StateMachine, SupplierId,
    TenantId,
};
use procura_events::Event;

/// RFQ identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RfqId(pub AggregateId);

impl RfqId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RfqId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Who may respond: anyone (`Open`) or only invited suppliers (`Invited`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RfqType {
    Open,
    Invited,
}

/// RFQ status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RfqStatus {
    Draft,
    Published,
    Closed,
    Cancelled,
}

impl RfqStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RfqStatus::Draft => "DRAFT",
            RfqStatus::Published => "PUBLISHED",
            RfqStatus::Closed => "CLOSED",
            RfqStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for RfqStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for RfqStatus {
    const ENTITY: &'static str = "rfq";

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            RfqStatus::Draft => &[RfqStatus::Published, RfqStatus::Cancelled],
            RfqStatus::Published => &[RfqStatus::Closed, RfqStatus::Cancelled],
            RfqStatus::Closed | RfqStatus::Cancelled => &[],
        }
    }
}

/// Item data supplied by the company when adding or updating a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqItemInput {
    pub item_name: String,
    pub specification: Option<String>,
    pub quantity: i64,
    pub unit: String,
    pub category: Option<String>,
}

impl RfqItemInput {
    fn validate(&self) -> Result<(), DomainError> {
        if self.item_name.trim().is_empty() {
            return Err(DomainError::validation("item_name must not be empty"));
        }
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if self.unit.trim().is_empty() {
            return Err(DomainError::validation("unit must not be empty"));
        }
        Ok(())
    }
}

/// A requested line on an RFQ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqItem {
    pub line_no: u32,
    pub item_name: String,
    pub specification: Option<String>,
    pub quantity: i64,
    pub unit: String,
    pub category: Option<String>,
}

impl RfqItem {
    fn from_input(line_no: u32, input: &RfqItemInput) -> Self {
        Self {
            line_no,
            item_name: input.item_name.clone(),
            specification: input.specification.clone(),
            quantity: input.quantity,
            unit: input.unit.clone(),
            category: input.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqInvitation {
    pub supplier_id: SupplierId,
    pub invited_at: DateTime<Utc>,
}

/// Aggregate root: Rfq.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfq {
    id: RfqId,
    tenant_id: Option<TenantId>,
    company_id: Option<CompanyId>,
    title: String,
    description: Option<String>,
    rfq_type: RfqType,
    status: RfqStatus,
    submission_deadline: Option<DateTime<Utc>>,
    expected_delivery_date: Option<NaiveDate>,
    items: Vec<RfqItem>,
    invitations: Vec<RfqInvitation>,
    next_line_no: u32,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Rfq {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RfqId) -> Self {
        Self {
            id,
            tenant_id: None,
            company_id: None,
            title: String::new(),
            description: None,
            rfq_type: RfqType::Open,
            status: RfqStatus::Draft,
            submission_deadline: None,
            expected_delivery_date: None,
            items: Vec::new(),
            invitations: Vec::new(),
            next_line_no: 1,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> RfqId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn rfq_type(&self) -> RfqType {
        self.rfq_type
    }

    pub fn status(&self) -> RfqStatus {
        self.status
    }

    pub fn submission_deadline(&self) -> Option<DateTime<Utc>> {
        self.submission_deadline
    }

    pub fn expected_delivery_date(&self) -> Option<NaiveDate> {
        self.expected_delivery_date
    }

    pub fn items(&self) -> &[RfqItem] {
        &self.items
    }

    pub fn item(&self, line_no: u32) -> Option<&RfqItem> {
        self.items.iter().find(|i| i.line_no == line_no)
    }

    pub fn invitations(&self) -> &[RfqInvitation] {
        &self.invitations
    }

    /// Exists and has not been deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, RfqStatus::Draft)
    }

    pub fn is_invited(&self, supplier_id: SupplierId) -> bool {
        self.invitations.iter().any(|i| i.supplier_id == supplier_id)
    }

    /// Published and the submission deadline not yet passed at `at`.
    pub fn accepts_quotations_at(&self, at: DateTime<Utc>) -> bool {
        self.status == RfqStatus::Published
            && self.submission_deadline.is_none_or(|deadline| at <= deadline)
    }

    /// Whether `supplier_id` may respond at all (OPEN, or INVITED with an invitation).
    pub fn admits_supplier(&self, supplier_id: SupplierId) -> bool {
        match self.rfq_type {
            RfqType::Open => true,
            RfqType::Invited => self.is_invited(supplier_id),
        }
    }
}

impl AggregateRoot for Rfq {
    type Id = RfqId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRfq.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRfq {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub company_id: CompanyId,
    pub title: String,
    pub description: Option<String>,
    pub rfq_type: RfqType,
    pub submission_deadline: DateTime<Utc>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateRfqDetails (only allowed in Draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRfqDetails {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub title: String,
    pub description: Option<String>,
    pub submission_deadline: DateTime<Utc>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddRfqItem (only allowed in Draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRfqItem {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub item: RfqItemInput,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateRfqItem (only allowed in Draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRfqItem {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub line_no: u32,
    pub item: RfqItemInput,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveRfqItem (only allowed in Draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRfqItem {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: InviteSupplier (Invited RFQs in Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSupplier {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RevokeInvitation (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeInvitation {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PublishRfq.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRfq {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseRfq.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseRfq {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelRfq.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRfq {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteRfq.
///
/// `quotation_count` is the number of quotations referencing this RFQ, as
/// reported by the quotation index at decision time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRfq {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub quotation_count: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RfqCommand {
    CreateRfq(CreateRfq),
    UpdateRfqDetails(UpdateRfqDetails),
    AddRfqItem(AddRfqItem),
    UpdateRfqItem(UpdateRfqItem),
    RemoveRfqItem(RemoveRfqItem),
    InviteSupplier(InviteSupplier),
    RevokeInvitation(RevokeInvitation),
    PublishRfq(PublishRfq),
    CloseRfq(CloseRfq),
    CancelRfq(CancelRfq),
    DeleteRfq(DeleteRfq),
}

/// Event: RfqCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqCreated {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub company_id: CompanyId,
    pub title: String,
    pub description: Option<String>,
    pub rfq_type: RfqType,
    pub submission_deadline: DateTime<Utc>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqDetailsUpdated {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub title: String,
    pub description: Option<String>,
    pub submission_deadline: DateTime<Utc>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqItemAdded / RfqItemUpdated share this payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqItemChanged {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub item: RfqItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqItemRemoved {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierInvited / InvitationRevoked share this payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationChanged {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: status-only changes (published, closed, deleted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqStatusChanged {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqCancelled {
    pub tenant_id: TenantId,
    pub rfq_id: RfqId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RfqEvent {
    RfqCreated(RfqCreated),
    RfqDetailsUpdated(RfqDetailsUpdated),
    RfqItemAdded(RfqItemChanged),
    RfqItemUpdated(RfqItemChanged),
    RfqItemRemoved(RfqItemRemoved),
    SupplierInvited(InvitationChanged),
    InvitationRevoked(InvitationChanged),
    RfqPublished(RfqStatusChanged),
    RfqClosed(RfqStatusChanged),
    RfqCancelled(RfqCancelled),
    RfqDeleted(RfqStatusChanged),
}

impl RfqEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            RfqEvent::RfqCreated(e) => e.tenant_id,
            RfqEvent::RfqDetailsUpdated(e) => e.tenant_id,
            RfqEvent::RfqItemAdded(e) | RfqEvent::RfqItemUpdated(e) => e.tenant_id,
            RfqEvent::RfqItemRemoved(e) => e.tenant_id,
            RfqEvent::SupplierInvited(e) | RfqEvent::InvitationRevoked(e) => e.tenant_id,
            RfqEvent::RfqPublished(e) | RfqEvent::RfqClosed(e) | RfqEvent::RfqDeleted(e) => {
                e.tenant_id
            }
            RfqEvent::RfqCancelled(e) => e.tenant_id,
        }
    }
}

impl Event for RfqEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RfqEvent::RfqCreated(_) => "procurement.rfq.created",
            RfqEvent::RfqDetailsUpdated(_) => "procurement.rfq.details_updated",
            RfqEvent::RfqItemAdded(_) => "procurement.rfq.item_added",
            RfqEvent::RfqItemUpdated(_) => "procurement.rfq.item_updated",
            RfqEvent::RfqItemRemoved(_) => "procurement.rfq.item_removed",
            RfqEvent::SupplierInvited(_) => "procurement.rfq.supplier_invited",
            RfqEvent::InvitationRevoked(_) => "procurement.rfq.invitation_revoked",
            RfqEvent::RfqPublished(_) => "procurement.rfq.published",
            RfqEvent::RfqClosed(_) => "procurement.rfq.closed",
            RfqEvent::RfqCancelled(_) => "procurement.rfq.cancelled",
            RfqEvent::RfqDeleted(_) => "procurement.rfq.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RfqEvent::RfqCreated(e) => e.occurred_at,
            RfqEvent::RfqDetailsUpdated(e) => e.occurred_at,
            RfqEvent::RfqItemAdded(e) | RfqEvent::RfqItemUpdated(e) => e.occurred_at,
            RfqEvent::RfqItemRemoved(e) => e.occurred_at,
            RfqEvent::SupplierInvited(e) | RfqEvent::InvitationRevoked(e) => e.occurred_at,
            RfqEvent::RfqPublished(e) | RfqEvent::RfqClosed(e) | RfqEvent::RfqDeleted(e) => {
                e.occurred_at
            }
            RfqEvent::RfqCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Rfq {
    type Command = RfqCommand;
    type Event = RfqEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RfqEvent::RfqCreated(e) => {
                self.id = e.rfq_id;
                self.tenant_id = Some(e.tenant_id);
                self.company_id = Some(e.company_id);
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.rfq_type = e.rfq_type;
                self.status = RfqStatus::Draft;
                self.submission_deadline = Some(e.submission_deadline);
                self.expected_delivery_date = e.expected_delivery_date;
                self.items.clear();
                self.invitations.clear();
                self.next_line_no = 1;
                self.created = true;
            }
            RfqEvent::RfqDetailsUpdated(e) => {
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.submission_deadline = Some(e.submission_deadline);
                self.expected_delivery_date = e.expected_delivery_date;
            }
            RfqEvent::RfqItemAdded(e) => {
                self.items.push(e.item.clone());
                self.next_line_no = self.next_line_no.max(e.item.line_no + 1);
            }
            RfqEvent::RfqItemUpdated(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.line_no == e.item.line_no) {
                    *item = e.item.clone();
                }
            }
            RfqEvent::RfqItemRemoved(e) => {
                self.items.retain(|i| i.line_no != e.line_no);
            }
            RfqEvent::SupplierInvited(e) => {
                self.invitations.push(RfqInvitation {
                    supplier_id: e.supplier_id,
                    invited_at: e.occurred_at,
                });
            }
            RfqEvent::InvitationRevoked(e) => {
                self.invitations.retain(|i| i.supplier_id != e.supplier_id);
            }
            RfqEvent::RfqPublished(_) => {
                self.status = RfqStatus::Published;
            }
            RfqEvent::RfqClosed(_) => {
                self.status = RfqStatus::Closed;
            }
            RfqEvent::RfqCancelled(_) => {
                self.status = RfqStatus::Cancelled;
            }
            RfqEvent::RfqDeleted(_) => {
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RfqCommand::CreateRfq(cmd) => self.handle_create(cmd),
            RfqCommand::UpdateRfqDetails(cmd) => self.handle_update_details(cmd),
            RfqCommand::AddRfqItem(cmd) => self.handle_add_item(cmd),
            RfqCommand::UpdateRfqItem(cmd) => self.handle_update_item(cmd),
            RfqCommand::RemoveRfqItem(cmd) => self.handle_remove_item(cmd),
            RfqCommand::InviteSupplier(cmd) => self.handle_invite(cmd),
            RfqCommand::RevokeInvitation(cmd) => self.handle_revoke(cmd),
            RfqCommand::PublishRfq(cmd) => self.handle_publish(cmd),
            RfqCommand::CloseRfq(cmd) => self.handle_close(cmd),
            RfqCommand::CancelRfq(cmd) => self.handle_cancel(cmd),
            RfqCommand::DeleteRfq(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Rfq {
    fn ensure_exists(&self, tenant_id: TenantId, rfq_id: RfqId) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found("rfq", rfq_id));
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != rfq_id {
            return Err(DomainError::invariant("rfq_id mismatch"));
        }
        Ok(())
    }

    fn ensure_modifiable(&self, attempted: &str) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invalid_state("rfq", self.status, attempted));
        }
        Ok(())
    }

    fn validate_header(title: &str, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if deadline <= now {
            return Err(DomainError::validation(
                "submission_deadline must be in the future",
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateRfq) -> Result<Vec<RfqEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("rfq already exists"));
        }
        Self::validate_header(&cmd.title, cmd.submission_deadline, cmd.occurred_at)?;

        Ok(vec![RfqEvent::RfqCreated(RfqCreated {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            company_id: cmd.company_id,
            title: cmd.title.trim().to_string(),
            description: cmd.description.clone(),
            rfq_type: cmd.rfq_type,
            submission_deadline: cmd.submission_deadline,
            expected_delivery_date: cmd.expected_delivery_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(&self, cmd: &UpdateRfqDetails) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.ensure_modifiable("update details")?;
        Self::validate_header(&cmd.title, cmd.submission_deadline, cmd.occurred_at)?;

        Ok(vec![RfqEvent::RfqDetailsUpdated(RfqDetailsUpdated {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            title: cmd.title.trim().to_string(),
            description: cmd.description.clone(),
            submission_deadline: cmd.submission_deadline,
            expected_delivery_date: cmd.expected_delivery_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddRfqItem) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.ensure_modifiable("add items")?;
        cmd.item.validate()?;

        Ok(vec![RfqEvent::RfqItemAdded(RfqItemChanged {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            item: RfqItem::from_input(self.next_line_no, &cmd.item),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_item(&self, cmd: &UpdateRfqItem) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.ensure_modifiable("update items")?;
        if self.item(cmd.line_no).is_none() {
            return Err(DomainError::not_found("rfq item", cmd.line_no));
        }
        cmd.item.validate()?;

        Ok(vec![RfqEvent::RfqItemUpdated(RfqItemChanged {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            item: RfqItem::from_input(cmd.line_no, &cmd.item),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveRfqItem) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.ensure_modifiable("remove items")?;
        if self.item(cmd.line_no).is_none() {
            return Err(DomainError::not_found("rfq item", cmd.line_no));
        }

        Ok(vec![RfqEvent::RfqItemRemoved(RfqItemRemoved {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            line_no: cmd.line_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_invite(&self, cmd: &InviteSupplier) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.ensure_modifiable("invite suppliers")?;
        if self.rfq_type != RfqType::Invited {
            return Err(DomainError::validation(
                "invitations are only allowed on INVITED rfqs",
            ));
        }
        if self.is_invited(cmd.supplier_id) {
            return Err(DomainError::validation(format!(
                "supplier {} is already invited",
                cmd.supplier_id
            )));
        }

        Ok(vec![RfqEvent::SupplierInvited(InvitationChanged {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revoke(&self, cmd: &RevokeInvitation) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.ensure_modifiable("revoke invitations")?;
        if !self.is_invited(cmd.supplier_id) {
            return Err(DomainError::not_found("rfq invitation", cmd.supplier_id));
        }

        Ok(vec![RfqEvent::InvitationRevoked(InvitationChanged {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_publish(&self, cmd: &PublishRfq) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.status.ensure_transition(RfqStatus::Published)?;

        if self.items.is_empty() {
            return Err(DomainError::validation("cannot publish rfq without items"));
        }
        if self
            .submission_deadline
            .is_some_and(|deadline| deadline <= cmd.occurred_at)
        {
            return Err(DomainError::validation(
                "cannot publish rfq whose submission deadline has passed",
            ));
        }

        Ok(vec![RfqEvent::RfqPublished(RfqStatusChanged {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseRfq) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.status.ensure_transition(RfqStatus::Closed)?;

        Ok(vec![RfqEvent::RfqClosed(RfqStatusChanged {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelRfq) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        self.status.ensure_transition(RfqStatus::Cancelled)?;

        Ok(vec![RfqEvent::RfqCancelled(RfqCancelled {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteRfq) -> Result<Vec<RfqEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.rfq_id)?;
        if cmd.quotation_count > 0 {
            return Err(DomainError::resource_in_use(
                "rfq",
                "quotations",
                cmd.quotation_count,
            ));
        }

        Ok(vec![RfqEvent::RfqDeleted(RfqStatusChanged {
            tenant_id: cmd.tenant_id,
            rfq_id: cmd.rfq_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
