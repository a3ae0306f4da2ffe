use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{
    Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, ProductId, StateMachine,
    SupplierId, TenantId,
};
use procura_events::Event;
use procura_pricing::{percent_of, round_currency};
use procura_quotation::{Quotation, QuotationId, QuotationItem, QuotationStatus};

/// Order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Returned => "RETURNED",
        }
    }

    /// Address, notes, expected date and tracking are frozen in these statuses.
    pub fn locks_details(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Delivered)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for OrderStatus {
    const ENTITY: &'static str = "order";

    fn allowed_targets(self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Shipped, Cancelled],
            Preparing => &[Shipped, Cancelled],
            Shipped => &[Delivered, Returned],
            Delivered => &[Returned],
            Cancelled | Returned => &[],
        }
    }
}

/// Order line: a structural copy of an accepted quotation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_no: u32,
    /// Source quotation line, kept for traceability only.
    pub quotation_line_no: u32,
    pub rfq_item_line: Option<u32>,
    pub product_id: Option<ProductId>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

impl OrderItem {
    pub fn copy_of(line_no: u32, item: &QuotationItem) -> Self {
        Self {
            line_no,
            quotation_line_no: item.line_no,
            rfq_item_line: item.rfq_item_line,
            product_id: item.product_id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount_amount: item.discount_amount,
            total: item.total(),
        }
    }
}

/// Money figures fixed at placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    /// Percent, e.g. `20` for 20%.
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn compute(items: &[OrderItem], tax_rate: Decimal) -> Self {
        let subtotal: Decimal = items.iter().map(|i| i.total).sum();
        let tax_amount = round_currency(percent_of(subtotal, tax_rate));
        Self {
            subtotal,
            tax_rate,
            tax_amount,
            total: subtotal + tax_amount,
        }
    }

    fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    tenant_id: Option<TenantId>,
    quotation_id: Option<QuotationId>,
    company_id: Option<CompanyId>,
    supplier_id: Option<SupplierId>,
    status: OrderStatus,
    currency: String,
    items: Vec<OrderItem>,
    totals: OrderTotals,
    delivery_address: Option<String>,
    notes: Option<String>,
    expected_delivery_date: Option<NaiveDate>,
    actual_delivery_date: Option<NaiveDate>,
    tracking_number: Option<String>,
    invoice_number: Option<String>,
    history: Vec<StatusChange>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            quotation_id: None,
            company_id: None,
            supplier_id: None,
            status: OrderStatus::Pending,
            currency: String::new(),
            items: Vec::new(),
            totals: OrderTotals::zero(),
            delivery_address: None,
            notes: None,
            expected_delivery_date: None,
            actual_delivery_date: None,
            tracking_number: None,
            invoice_number: None,
            history: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn quotation_id(&self) -> Option<QuotationId> {
        self.quotation_id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Decimal {
        self.totals.subtotal
    }

    pub fn tax_rate(&self) -> Decimal {
        self.totals.tax_rate
    }

    pub fn tax_amount(&self) -> Decimal {
        self.totals.tax_amount
    }

    pub fn total(&self) -> Decimal {
        self.totals.total
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn expected_delivery_date(&self) -> Option<NaiveDate> {
        self.expected_delivery_date
    }

    pub fn actual_delivery_date(&self) -> Option<NaiveDate> {
        self.actual_delivery_date
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn invoice_number(&self) -> Option<&str> {
        self.invoice_number.as_deref()
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
///
/// Build it with [`PlaceOrder::from_quotation`], which checks the quotation
/// and performs the item copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub quotation_id: QuotationId,
    pub company_id: CompanyId,
    pub supplier_id: SupplierId,
    pub currency: String,
    pub items: Vec<OrderItem>,
    pub tax_rate: Decimal,
    pub delivery_address: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl PlaceOrder {
    /// Snapshot an accepted quotation into a placement command.
    ///
    /// Fails unless the quotation is ACCEPTED and `company_id` issued its RFQ.
    #[allow(clippy::too_many_arguments)]
    pub fn from_quotation(
        tenant_id: TenantId,
        order_id: OrderId,
        quotation: &Quotation,
        company_id: CompanyId,
        tax_rate: Decimal,
        delivery_address: Option<String>,
        expected_delivery_date: Option<NaiveDate>,
        notes: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let quotation_id = quotation.id_typed();
        let Some(supplier_id) = quotation.supplier_id().filter(|_| quotation.exists()) else {
            return Err(DomainError::not_found("quotation", quotation_id));
        };
        if quotation.status() != QuotationStatus::Accepted {
            return Err(DomainError::invalid_state(
                "quotation",
                quotation.status(),
                "be ordered (must be ACCEPTED)",
            ));
        }
        if quotation.company_id() != Some(company_id) {
            return Err(DomainError::unauthorized(format!(
                "company {company_id} did not issue the rfq for quotation {quotation_id}"
            )));
        }

        let items = quotation
            .items()
            .iter()
            .zip(1u32..)
            .map(|(item, line_no)| OrderItem::copy_of(line_no, item))
            .collect();

        Ok(Self {
            tenant_id,
            order_id,
            quotation_id,
            company_id,
            supplier_id,
            currency: quotation.currency().to_string(),
            items,
            tax_rate,
            delivery_address,
            expected_delivery_date,
            notes,
            occurred_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPreparing {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub tracking_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeliverOrder. Sets the actual delivery date to the day of
/// `occurred_at` unless one is already recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateOrderDetails. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderDetails {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTracking {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub tracking_number: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetInvoiceNumber {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub invoice_number: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ConfirmOrder(ConfirmOrder),
    StartPreparing(StartPreparing),
    ShipOrder(ShipOrder),
    DeliverOrder(DeliverOrder),
    CancelOrder(CancelOrder),
    ReturnOrder(ReturnOrder),
    UpdateOrderDetails(UpdateOrderDetails),
    UpdateTracking(UpdateTracking),
    SetInvoiceNumber(SetInvoiceNumber),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub quotation_id: QuotationId,
    pub company_id: CompanyId,
    pub supplier_id: SupplierId,
    pub currency: String,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub delivery_address: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: one step through the status table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub reason: Option<String>,
    pub tracking_number: Option<String>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetailsUpdated {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingUpdated {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub tracking_number: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumberSet {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub invoice_number: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderStatusChanged(OrderStatusChanged),
    OrderDetailsUpdated(OrderDetailsUpdated),
    TrackingUpdated(TrackingUpdated),
    InvoiceNumberSet(InvoiceNumberSet),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "procurement.order.placed",
            OrderEvent::OrderStatusChanged(e) => match e.to {
                OrderStatus::Pending => "procurement.order.pending",
                OrderStatus::Confirmed => "procurement.order.confirmed",
                OrderStatus::Preparing => "procurement.order.preparing",
                OrderStatus::Shipped => "procurement.order.shipped",
                OrderStatus::Delivered => "procurement.order.delivered",
                OrderStatus::Cancelled => "procurement.order.cancelled",
                OrderStatus::Returned => "procurement.order.returned",
            },
            OrderEvent::OrderDetailsUpdated(_) => "procurement.order.details_updated",
            OrderEvent::TrackingUpdated(_) => "procurement.order.tracking_updated",
            OrderEvent::InvoiceNumberSet(_) => "procurement.order.invoice_number_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderStatusChanged(e) => e.occurred_at,
            OrderEvent::OrderDetailsUpdated(e) => e.occurred_at,
            OrderEvent::TrackingUpdated(e) => e.occurred_at,
            OrderEvent::InvoiceNumberSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.quotation_id = Some(e.quotation_id);
                self.company_id = Some(e.company_id);
                self.supplier_id = Some(e.supplier_id);
                self.status = OrderStatus::Pending;
                self.currency = e.currency.clone();
                self.items = e.items.clone();
                self.totals = e.totals;
                self.delivery_address = e.delivery_address.clone();
                self.expected_delivery_date = e.expected_delivery_date;
                self.notes = e.notes.clone();
                self.history.push(StatusChange {
                    from: None,
                    to: OrderStatus::Pending,
                    at: e.occurred_at,
                    reason: None,
                });
                self.created = true;
            }
            OrderEvent::OrderStatusChanged(e) => {
                self.status = e.to;
                if let Some(tracking) = &e.tracking_number {
                    self.tracking_number = Some(tracking.clone());
                }
                if self.actual_delivery_date.is_none() {
                    self.actual_delivery_date = e.actual_delivery_date;
                }
                self.history.push(StatusChange {
                    from: Some(e.from),
                    to: e.to,
                    at: e.occurred_at,
                    reason: e.reason.clone(),
                });
            }
            OrderEvent::OrderDetailsUpdated(e) => {
                if e.delivery_address.is_some() {
                    self.delivery_address = e.delivery_address.clone();
                }
                if e.notes.is_some() {
                    self.notes = e.notes.clone();
                }
                if e.expected_delivery_date.is_some() {
                    self.expected_delivery_date = e.expected_delivery_date;
                }
            }
            OrderEvent::TrackingUpdated(e) => {
                self.tracking_number = Some(e.tracking_number.clone());
            }
            OrderEvent::InvoiceNumberSet(e) => {
                self.invoice_number = Some(e.invoice_number.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ConfirmOrder(cmd) => {
                self.transition(cmd.tenant_id, cmd.order_id, OrderStatus::Confirmed, None, None, cmd.occurred_at)
            }
            OrderCommand::StartPreparing(cmd) => {
                self.transition(cmd.tenant_id, cmd.order_id, OrderStatus::Preparing, None, None, cmd.occurred_at)
            }
            OrderCommand::ShipOrder(cmd) => self.transition(
                cmd.tenant_id,
                cmd.order_id,
                OrderStatus::Shipped,
                None,
                cmd.tracking_number.clone(),
                cmd.occurred_at,
            ),
            OrderCommand::DeliverOrder(cmd) => {
                self.transition(cmd.tenant_id, cmd.order_id, OrderStatus::Delivered, None, None, cmd.occurred_at)
            }
            OrderCommand::CancelOrder(cmd) => self.transition(
                cmd.tenant_id,
                cmd.order_id,
                OrderStatus::Cancelled,
                cmd.reason.clone(),
                None,
                cmd.occurred_at,
            ),
            OrderCommand::ReturnOrder(cmd) => self.transition(
                cmd.tenant_id,
                cmd.order_id,
                OrderStatus::Returned,
                cmd.reason.clone(),
                None,
                cmd.occurred_at,
            ),
            OrderCommand::UpdateOrderDetails(cmd) => self.handle_update_details(cmd),
            OrderCommand::UpdateTracking(cmd) => self.handle_update_tracking(cmd),
            OrderCommand::SetInvoiceNumber(cmd) => self.handle_set_invoice_number(cmd),
        }
    }
}

impl Order {
    fn ensure_exists(&self, tenant_id: TenantId, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("order", order_id));
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_details_editable(&self, attempted: &str) -> Result<(), DomainError> {
        if self.status.locks_details() {
            return Err(DomainError::invalid_state("order", self.status, attempted));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("cannot place order without items"));
        }
        if cmd.tax_rate < Decimal::ZERO {
            return Err(DomainError::validation("tax_rate must not be negative"));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            quotation_id: cmd.quotation_id,
            company_id: cmd.company_id,
            supplier_id: cmd.supplier_id,
            currency: cmd.currency.clone(),
            items: cmd.items.clone(),
            totals: OrderTotals::compute(&cmd.items, cmd.tax_rate),
            delivery_address: cmd.delivery_address.clone(),
            expected_delivery_date: cmd.expected_delivery_date,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn transition(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        target: OrderStatus,
        reason: Option<String>,
        tracking_number: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(tenant_id, order_id)?;
        self.status.ensure_transition(target)?;

        let actual_delivery_date = match target {
            OrderStatus::Delivered if self.actual_delivery_date.is_none() => {
                Some(occurred_at.date_naive())
            }
            _ => None,
        };

        Ok(vec![OrderEvent::OrderStatusChanged(OrderStatusChanged {
            tenant_id,
            order_id,
            from: self.status,
            to: target,
            reason,
            tracking_number,
            actual_delivery_date,
            occurred_at,
        })])
    }

    fn handle_update_details(&self, cmd: &UpdateOrderDetails) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;
        self.ensure_details_editable("update details")?;
        if cmd
            .delivery_address
            .as_deref()
            .is_some_and(|a| a.trim().is_empty())
        {
            return Err(DomainError::validation("delivery_address must not be blank"));
        }

        Ok(vec![OrderEvent::OrderDetailsUpdated(OrderDetailsUpdated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            delivery_address: cmd.delivery_address.clone(),
            notes: cmd.notes.clone(),
            expected_delivery_date: cmd.expected_delivery_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_tracking(&self, cmd: &UpdateTracking) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;
        self.ensure_details_editable("update tracking")?;
        if cmd.tracking_number.trim().is_empty() {
            return Err(DomainError::validation("tracking_number must not be empty"));
        }

        Ok(vec![OrderEvent::TrackingUpdated(TrackingUpdated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            tracking_number: cmd.tracking_number.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_invoice_number(&self, cmd: &SetInvoiceNumber) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.order_id)?;
        if cmd.invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice_number must not be empty"));
        }

        Ok(vec![OrderEvent::InvoiceNumberSet(InvoiceNumberSet {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            invoice_number: cmd.invoice_number.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_events::execute;
    use procura_quotation::{
        AcceptQuotation, CreateQuotation, QuotationCommand, QuotationItemInput, QuotationTerms,
        SubmitQuotation,
    };
    use procura_rfq::RfqId;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn accepted_quotation(tenant_id: TenantId, company_id: CompanyId) -> Quotation {
        let quotation_id = QuotationId::new(AggregateId::new());
        let mut q = Quotation::empty(quotation_id);
        let input = |line: u32, quantity: i64, unit_price: Decimal, discount: Decimal| QuotationItemInput {
            rfq_item_line: Some(line),
            product_id: None,
            description: None,
            quantity,
            unit_price,
            discount_amount: discount,
        };
        let commands = [
            QuotationCommand::CreateQuotation(CreateQuotation {
                tenant_id,
                quotation_id,
                rfq_id: RfqId::new(AggregateId::new()),
                company_id,
                supplier_id: SupplierId::new(),
                version_number: 1,
                rfq_item_lines: vec![1, 2],
                terms: QuotationTerms::in_currency("USD"),
                items: vec![
                    input(1, 2, dec!(100), dec!(10)),
                    input(2, 5, dec!(10), Decimal::ZERO),
                ],
                duplicated_from: None,
                occurred_at: test_time(),
            }),
            QuotationCommand::SubmitQuotation(SubmitQuotation {
                tenant_id,
                quotation_id,
                occurred_at: test_time(),
            }),
            QuotationCommand::AcceptQuotation(AcceptQuotation {
                tenant_id,
                quotation_id,
                company_id,
                occurred_at: test_time(),
            }),
        ];
        for cmd in &commands {
            execute(&mut q, cmd).unwrap();
        }
        q
    }

    fn placed() -> (Order, TenantId, OrderId) {
        let tenant_id = TenantId::new();
        let company_id = CompanyId::new();
        let order_id = OrderId::new(AggregateId::new());
        let quotation = accepted_quotation(tenant_id, company_id);
        let cmd = PlaceOrder::from_quotation(
            tenant_id,
            order_id,
            &quotation,
            company_id,
            dec!(20),
            Some("1 School Lane".to_string()),
            None,
            None,
            test_time(),
        )
        .unwrap();

        let mut order = Order::empty(order_id);
        execute(&mut order, &OrderCommand::PlaceOrder(cmd)).unwrap();
        (order, tenant_id, order_id)
    }

    fn command_for(target: OrderStatus, tenant_id: TenantId, order_id: OrderId) -> Option<OrderCommand> {
        let occurred_at = test_time();
        Some(match target {
            OrderStatus::Pending => return None,
            OrderStatus::Confirmed => OrderCommand::ConfirmOrder(ConfirmOrder { tenant_id, order_id, occurred_at }),
            OrderStatus::Preparing => OrderCommand::StartPreparing(StartPreparing { tenant_id, order_id, occurred_at }),
            OrderStatus::Shipped => OrderCommand::ShipOrder(ShipOrder {
                tenant_id,
                order_id,
                tracking_number: Some("TRK-1".to_string()),
                occurred_at,
            }),
            OrderStatus::Delivered => OrderCommand::DeliverOrder(DeliverOrder { tenant_id, order_id, occurred_at }),
            OrderStatus::Cancelled => OrderCommand::CancelOrder(CancelOrder {
                tenant_id,
                order_id,
                reason: None,
                occurred_at,
            }),
            OrderStatus::Returned => OrderCommand::ReturnOrder(ReturnOrder {
                tenant_id,
                order_id,
                reason: Some("damaged".to_string()),
                occurred_at,
            }),
        })
    }

    fn path_to(status: OrderStatus) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match status {
            Pending => &[],
            Confirmed => &[Confirmed],
            Preparing => &[Confirmed, Preparing],
            Shipped => &[Confirmed, Shipped],
            Delivered => &[Confirmed, Shipped, Delivered],
            Cancelled => &[Cancelled],
            Returned => &[Confirmed, Shipped, Returned],
        }
    }

    fn order_at(status: OrderStatus) -> (Order, TenantId, OrderId) {
        let (mut order, tenant_id, order_id) = placed();
        for step in path_to(status) {
            let cmd = command_for(*step, tenant_id, order_id).unwrap();
            execute(&mut order, &cmd).unwrap();
        }
        assert_eq!(order.status(), status);
        (order, tenant_id, order_id)
    }

    const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    #[test]
    fn placement_copies_items_and_computes_tax() {
        let (order, _, _) = placed();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.items()[0].total, dec!(190));
        assert_eq!(order.subtotal(), dec!(240));
        assert_eq!(order.tax_rate(), dec!(20));
        assert_eq!(order.tax_amount(), dec!(48.00));
        assert_eq!(order.total(), dec!(288.00));
        assert_eq!(order.currency(), "USD");
        assert_eq!(order.history().len(), 1);
    }

    #[test]
    fn tax_is_rounded_half_up() {
        let item = OrderItem {
            line_no: 1,
            quotation_line_no: 1,
            rfq_item_line: None,
            product_id: None,
            description: None,
            quantity: 1,
            unit_price: dec!(10.05),
            discount_amount: Decimal::ZERO,
            total: dec!(10.05),
        };
        let totals = OrderTotals::compute(&[item], dec!(10));
        assert_eq!(totals.tax_amount, dec!(1.01));
        assert_eq!(totals.total, dec!(11.06));
    }

    #[test]
    fn cannot_order_unaccepted_quotation() {
        let quotation = Quotation::empty(QuotationId::new(AggregateId::new()));
        let err = PlaceOrder::from_quotation(
            TenantId::new(),
            OrderId::new(AggregateId::new()),
            &quotation,
            CompanyId::new(),
            dec!(20),
            None,
            None,
            None,
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "quotation", .. }));
    }

    #[test]
    fn only_issuing_company_may_order() {
        let tenant_id = TenantId::new();
        let quotation = accepted_quotation(tenant_id, CompanyId::new());
        let err = PlaceOrder::from_quotation(
            tenant_id,
            OrderId::new(AggregateId::new()),
            &quotation,
            CompanyId::new(),
            dec!(20),
            None,
            None,
            None,
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[test]
    fn full_delivery_path_then_cancel_fails() {
        let (mut order, tenant_id, order_id) = order_at(OrderStatus::Delivered);
        let delivered_at = order.history().last().unwrap().at;
        assert_eq!(order.actual_delivery_date(), Some(delivered_at.date_naive()));
        assert_eq!(order.tracking_number(), Some("TRK-1"));
        assert_eq!(order.history().len(), 4);

        let cmd = command_for(OrderStatus::Cancelled, tenant_id, order_id).unwrap();
        let err = execute(&mut order, &cmd).unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_state("order", "DELIVERED", "transition to CANCELLED")
        );
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn transition_table_is_exhaustively_enforced() {
        for from in ALL {
            for to in ALL {
                let Some(_) = command_for(to, TenantId::new(), OrderId::new(AggregateId::new())) else {
                    continue;
                };
                let (order, tenant_id, order_id) = order_at(from);
                let cmd = command_for(to, tenant_id, order_id).unwrap();
                let result = order.handle(&cmd);
                assert_eq!(
                    result.is_ok(),
                    from.can_transition_to(to),
                    "{from} -> {to} returned {result:?}"
                );
                if let Err(err) = result {
                    assert!(matches!(err, DomainError::InvalidState { entity: "order", .. }));
                }
            }
        }
    }

    #[test]
    fn details_are_locked_once_cancelled_or_delivered() {
        for status in [OrderStatus::Cancelled, OrderStatus::Delivered] {
            let (order, tenant_id, order_id) = order_at(status);
            let err = order
                .handle(&OrderCommand::UpdateOrderDetails(UpdateOrderDetails {
                    tenant_id,
                    order_id,
                    delivery_address: Some("2 Other Road".to_string()),
                    notes: None,
                    expected_delivery_date: None,
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidState { .. }));

            let err = order
                .handle(&OrderCommand::UpdateTracking(UpdateTracking {
                    tenant_id,
                    order_id,
                    tracking_number: "TRK-2".to_string(),
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidState { .. }));

            // Invoice numbers stay editable.
            assert!(
                order
                    .handle(&OrderCommand::SetInvoiceNumber(SetInvoiceNumber {
                        tenant_id,
                        order_id,
                        invoice_number: "INV-2026-0042".to_string(),
                        occurred_at: test_time(),
                    }))
                    .is_ok()
            );
        }
    }

    #[test]
    fn update_details_patches_only_given_fields() {
        let (mut order, tenant_id, order_id) = placed();
        let expected = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        execute(
            &mut order,
            &OrderCommand::UpdateOrderDetails(UpdateOrderDetails {
                tenant_id,
                order_id,
                delivery_address: None,
                notes: Some("deliver to reception".to_string()),
                expected_delivery_date: Some(expected),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(order.delivery_address(), Some("1 School Lane"));
        assert_eq!(order.notes(), Some("deliver to reception"));
        assert_eq!(order.expected_delivery_date(), Some(expected));
        assert_eq!(order.total(), dec!(288.00));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn status_strategy() -> impl Strategy<Value = OrderStatus> {
            prop::sample::select(ALL.to_vec())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: random command sequences only ever move along the table,
            /// and totals never change after placement.
            #[test]
            fn status_only_moves_along_table(targets in prop::collection::vec(status_strategy(), 1..12)) {
                let (mut order, tenant_id, order_id) = placed();
                let total = order.total();

                for target in targets {
                    let Some(cmd) = command_for(target, tenant_id, order_id) else { continue };
                    let before = order.status();
                    match execute(&mut order, &cmd) {
                        Ok(_) => {
                            prop_assert!(before.can_transition_to(target));
                            prop_assert_eq!(order.status(), target);
                        }
                        Err(_) => {
                            prop_assert!(!before.can_transition_to(target));
                            prop_assert_eq!(order.status(), before);
                        }
                    }
                    prop_assert_eq!(order.total(), total);
                    prop_assert_eq!(order.subtotal() + order.tax_amount(), order.total());
                }
            }
        }
    }
}
