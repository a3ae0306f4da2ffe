use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateId, AggregateRoot, DomainError, StateMachine, TenantId};
use procura_events::Event;
use procura_orders::OrderId;

/// Payment identifier, derived from the order it settles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub AggregateId);

impl PaymentId {
    /// The one payment stream an order can have.
    pub fn for_order(order_id: OrderId) -> Self {
        Self(AggregateId::derive(order_id.0, "payment"))
    }
}

impl core::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Canceled,
    Expired,
    Refunded,
    PartiallyRefunded,
    /// Set only by an external dispute flow; no command here leads to it.
    Disputed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Canceled => "CANCELED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
            PaymentStatus::Disputed => "DISPUTED",
        }
    }

    /// Transaction id, method and notes are frozen in these statuses.
    pub fn locks_details(self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Refunded | PaymentStatus::Failed
        )
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn allowed_targets(self) -> &'static [Self] {
        use PaymentStatus::*;
        match self {
            Pending => &[Processing, Completed, Failed, Canceled, Expired],
            Processing => &[Completed, Failed, Canceled],
            Completed => &[Refunded, PartiallyRefunded],
            Failed | Canceled | Expired | Refunded | PartiallyRefunded | Disputed => &[],
        }
    }
}

/// Aggregate root: Payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    id: PaymentId,
    tenant_id: Option<TenantId>,
    order_id: Option<OrderId>,
    status: PaymentStatus,
    amount: Decimal,
    currency: String,
    method: Option<String>,
    transaction_id: Option<String>,
    notes: Option<String>,
    refunded_amount: Decimal,
    paid_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Payment {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PaymentId) -> Self {
        Self {
            id,
            tenant_id: None,
            order_id: None,
            status: PaymentStatus::Pending,
            amount: Decimal::ZERO,
            currency: String::new(),
            method: None,
            transaction_id: None,
            notes: None,
            refunded_amount: Decimal::ZERO,
            paid_at: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PaymentId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn refunded_amount(&self) -> Decimal {
        self.refunded_amount
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePayment.
///
/// `order_total` is the total of the order being paid, read at decision time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePayment {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub order_total: Decimal,
    pub amount: Decimal,
    pub currency: String,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessPayment {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePayment {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub transaction_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailPayment {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPayment {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirePayment {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RefundPayment.
///
/// `amount` absent or equal to the paid amount refunds in full; a smaller
/// amount is a partial refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPayment {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub amount: Option<Decimal>,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdatePaymentDetails. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePaymentDetails {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentCommand {
    CreatePayment(CreatePayment),
    ProcessPayment(ProcessPayment),
    CompletePayment(CompletePayment),
    FailPayment(FailPayment),
    CancelPayment(CancelPayment),
    ExpirePayment(ExpirePayment),
    RefundPayment(RefundPayment),
    UpdatePaymentDetails(UpdatePaymentDetails),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCreated {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: String,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusChanged {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub reason: Option<String>,
    pub transaction_id: Option<String>,
    /// Set when this change stamps `paid_at`.
    pub paid_at: Option<DateTime<Utc>>,
    /// Amount returned by this change (refunds only).
    pub refunded_amount: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetailsUpdated {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEvent {
    PaymentCreated(PaymentCreated),
    PaymentStatusChanged(PaymentStatusChanged),
    PaymentDetailsUpdated(PaymentDetailsUpdated),
}

impl Event for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentCreated(_) => "procurement.payment.created",
            PaymentEvent::PaymentStatusChanged(e) => match e.to {
                PaymentStatus::Pending => "procurement.payment.pending",
                PaymentStatus::Processing => "procurement.payment.processing",
                PaymentStatus::Completed => "procurement.payment.completed",
                PaymentStatus::Failed => "procurement.payment.failed",
                PaymentStatus::Canceled => "procurement.payment.canceled",
                PaymentStatus::Expired => "procurement.payment.expired",
                PaymentStatus::Refunded => "procurement.payment.refunded",
                PaymentStatus::PartiallyRefunded => "procurement.payment.partially_refunded",
                PaymentStatus::Disputed => "procurement.payment.disputed",
            },
            PaymentEvent::PaymentDetailsUpdated(_) => "procurement.payment.details_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PaymentEvent::PaymentCreated(e) => e.occurred_at,
            PaymentEvent::PaymentStatusChanged(e) => e.occurred_at,
            PaymentEvent::PaymentDetailsUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Payment {
    type Command = PaymentCommand;
    type Event = PaymentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PaymentEvent::PaymentCreated(e) => {
                self.id = e.payment_id;
                self.tenant_id = Some(e.tenant_id);
                self.order_id = Some(e.order_id);
                self.status = PaymentStatus::Pending;
                self.amount = e.amount;
                self.currency = e.currency.clone();
                self.method = e.method.clone();
                self.transaction_id = e.transaction_id.clone();
                self.notes = e.notes.clone();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            PaymentEvent::PaymentStatusChanged(e) => {
                self.status = e.to;
                if e.transaction_id.is_some() {
                    self.transaction_id = e.transaction_id.clone();
                }
                if self.paid_at.is_none() {
                    self.paid_at = e.paid_at;
                }
                if let Some(refunded) = e.refunded_amount {
                    self.refunded_amount += refunded;
                }
                if let Some(reason) = &e.reason {
                    self.append_note(reason);
                }
            }
            PaymentEvent::PaymentDetailsUpdated(e) => {
                if e.method.is_some() {
                    self.method = e.method.clone();
                }
                if e.transaction_id.is_some() {
                    self.transaction_id = e.transaction_id.clone();
                }
                if e.notes.is_some() {
                    self.notes = e.notes.clone();
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PaymentCommand::CreatePayment(cmd) => self.handle_create(cmd),
            PaymentCommand::ProcessPayment(cmd) => self.transition(
                cmd.tenant_id,
                cmd.payment_id,
                PaymentStatus::Processing,
                Change::at(cmd.occurred_at),
            ),
            PaymentCommand::CompletePayment(cmd) => self.transition(
                cmd.tenant_id,
                cmd.payment_id,
                PaymentStatus::Completed,
                Change {
                    transaction_id: cmd.transaction_id.clone(),
                    ..Change::at(cmd.occurred_at)
                },
            ),
            PaymentCommand::FailPayment(cmd) => self.transition(
                cmd.tenant_id,
                cmd.payment_id,
                PaymentStatus::Failed,
                Change {
                    reason: cmd.reason.as_ref().map(|r| format!("Failed: {r}")),
                    ..Change::at(cmd.occurred_at)
                },
            ),
            PaymentCommand::CancelPayment(cmd) => self.transition(
                cmd.tenant_id,
                cmd.payment_id,
                PaymentStatus::Canceled,
                Change {
                    reason: cmd.reason.as_ref().map(|r| format!("Canceled: {r}")),
                    ..Change::at(cmd.occurred_at)
                },
            ),
            PaymentCommand::ExpirePayment(cmd) => self.transition(
                cmd.tenant_id,
                cmd.payment_id,
                PaymentStatus::Expired,
                Change::at(cmd.occurred_at),
            ),
            PaymentCommand::RefundPayment(cmd) => self.handle_refund(cmd),
            PaymentCommand::UpdatePaymentDetails(cmd) => self.handle_update_details(cmd),
        }
    }
}

/// Optional payload carried by a status change.
struct Change {
    reason: Option<String>,
    transaction_id: Option<String>,
    refunded_amount: Option<Decimal>,
    occurred_at: DateTime<Utc>,
}

impl Change {
    fn at(occurred_at: DateTime<Utc>) -> Self {
        Self {
            reason: None,
            transaction_id: None,
            refunded_amount: None,
            occurred_at,
        }
    }
}

impl Payment {
    fn ensure_exists(&self, tenant_id: TenantId, payment_id: PaymentId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("payment", payment_id));
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != payment_id {
            return Err(DomainError::invariant("payment_id mismatch"));
        }
        Ok(())
    }

    fn append_note(&mut self, note: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
            _ => note.to_string(),
        });
    }

    fn handle_create(&self, cmd: &CreatePayment) -> Result<Vec<PaymentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::validation(format!(
                "payment already exists for order {}",
                cmd.order_id
            )));
        }
        if cmd.payment_id != PaymentId::for_order(cmd.order_id) {
            return Err(DomainError::invariant("payment_id is not derived from order_id"));
        }
        if cmd.amount <= Decimal::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        if cmd.amount > cmd.order_total {
            return Err(DomainError::validation(format!(
                "payment amount {} exceeds order total {}",
                cmd.amount, cmd.order_total
            )));
        }

        Ok(vec![PaymentEvent::PaymentCreated(PaymentCreated {
            tenant_id: cmd.tenant_id,
            payment_id: cmd.payment_id,
            order_id: cmd.order_id,
            amount: cmd.amount,
            currency: cmd.currency.clone(),
            method: cmd.method.clone(),
            transaction_id: cmd.transaction_id.clone(),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn transition(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        target: PaymentStatus,
        change: Change,
    ) -> Result<Vec<PaymentEvent>, DomainError> {
        self.ensure_exists(tenant_id, payment_id)?;
        self.status.ensure_transition(target)?;

        let paid_at = match target {
            PaymentStatus::Completed if self.paid_at.is_none() => Some(change.occurred_at),
            _ => None,
        };

        Ok(vec![PaymentEvent::PaymentStatusChanged(PaymentStatusChanged {
            tenant_id,
            payment_id,
            from: self.status,
            to: target,
            reason: change.reason,
            transaction_id: change.transaction_id,
            paid_at,
            refunded_amount: change.refunded_amount,
            occurred_at: change.occurred_at,
        })])
    }

    fn handle_refund(&self, cmd: &RefundPayment) -> Result<Vec<PaymentEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.payment_id)?;
        if self.status != PaymentStatus::Completed {
            return Err(DomainError::invalid_state("payment", self.status, "refund"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("refund reason must not be empty"));
        }

        let amount = cmd.amount.unwrap_or(self.amount);
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("refund amount must be positive"));
        }
        if amount > self.amount {
            return Err(DomainError::validation(format!(
                "refund amount {amount} exceeds paid amount {}",
                self.amount
            )));
        }
        let target = if amount == self.amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };

        self.transition(
            cmd.tenant_id,
            cmd.payment_id,
            target,
            Change {
                reason: Some(format!("Refund ({amount}): {}", cmd.reason.trim())),
                refunded_amount: Some(amount),
                ..Change::at(cmd.occurred_at)
            },
        )
    }

    fn handle_update_details(&self, cmd: &UpdatePaymentDetails) -> Result<Vec<PaymentEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.payment_id)?;
        if self.status.locks_details() {
            return Err(DomainError::invalid_state("payment", self.status, "update details"));
        }

        Ok(vec![PaymentEvent::PaymentDetailsUpdated(PaymentDetailsUpdated {
            tenant_id: cmd.tenant_id,
            payment_id: cmd.payment_id,
            method: cmd.method.clone(),
            transaction_id: cmd.transaction_id.clone(),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_events::execute;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(tenant_id: TenantId, order_id: OrderId, amount: Decimal) -> PaymentCommand {
        PaymentCommand::CreatePayment(CreatePayment {
            tenant_id,
            payment_id: PaymentId::for_order(order_id),
            order_id,
            order_total: dec!(288.00),
            amount,
            currency: "USD".to_string(),
            method: Some("bank_transfer".to_string()),
            transaction_id: None,
            notes: None,
            occurred_at: test_time(),
        })
    }

    fn created(amount: Decimal) -> (Payment, TenantId, PaymentId) {
        let tenant_id = TenantId::new();
        let order_id = OrderId::new(AggregateId::new());
        let payment_id = PaymentId::for_order(order_id);
        let mut payment = Payment::empty(payment_id);
        execute(&mut payment, &create_cmd(tenant_id, order_id, amount)).unwrap();
        (payment, tenant_id, payment_id)
    }

    fn command_for(target: PaymentStatus, tenant_id: TenantId, payment_id: PaymentId) -> Option<PaymentCommand> {
        let occurred_at = test_time();
        Some(match target {
            PaymentStatus::Processing => PaymentCommand::ProcessPayment(ProcessPayment { tenant_id, payment_id, occurred_at }),
            PaymentStatus::Completed => PaymentCommand::CompletePayment(CompletePayment {
                tenant_id,
                payment_id,
                transaction_id: Some("txn-001".to_string()),
                occurred_at,
            }),
            PaymentStatus::Failed => PaymentCommand::FailPayment(FailPayment {
                tenant_id,
                payment_id,
                reason: Some("card declined".to_string()),
                occurred_at,
            }),
            PaymentStatus::Canceled => PaymentCommand::CancelPayment(CancelPayment {
                tenant_id,
                payment_id,
                reason: None,
                occurred_at,
            }),
            PaymentStatus::Expired => PaymentCommand::ExpirePayment(ExpirePayment { tenant_id, payment_id, occurred_at }),
            PaymentStatus::Refunded => PaymentCommand::RefundPayment(RefundPayment {
                tenant_id,
                payment_id,
                amount: None,
                reason: "order returned".to_string(),
                occurred_at,
            }),
            PaymentStatus::PartiallyRefunded => PaymentCommand::RefundPayment(RefundPayment {
                tenant_id,
                payment_id,
                amount: Some(dec!(50)),
                reason: "one item missing".to_string(),
                occurred_at,
            }),
            PaymentStatus::Pending | PaymentStatus::Disputed => return None,
        })
    }

    fn path_to(status: PaymentStatus) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match status {
            Pending => &[],
            Processing => &[Processing],
            Completed => &[Completed],
            Failed => &[Failed],
            Canceled => &[Canceled],
            Expired => &[Expired],
            Refunded => &[Completed, Refunded],
            PartiallyRefunded => &[Completed, PartiallyRefunded],
            Disputed => &[],
        }
    }

    const REACHABLE: [PaymentStatus; 8] = [
        PaymentStatus::Pending,
        PaymentStatus::Processing,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Canceled,
        PaymentStatus::Expired,
        PaymentStatus::Refunded,
        PaymentStatus::PartiallyRefunded,
    ];

    fn payment_at(status: PaymentStatus) -> (Payment, TenantId, PaymentId) {
        let (mut payment, tenant_id, payment_id) = created(dec!(288.00));
        for step in path_to(status) {
            let cmd = command_for(*step, tenant_id, payment_id).unwrap();
            execute(&mut payment, &cmd).unwrap();
        }
        assert_eq!(payment.status(), status);
        (payment, tenant_id, payment_id)
    }

    #[test]
    fn amount_above_order_total_fails_validation() {
        let order_id = OrderId::new(AggregateId::new());
        let payment = Payment::empty(PaymentId::for_order(order_id));
        let err = payment
            .handle(&create_cmd(TenantId::new(), order_id, dec!(300)))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("exceeds order total") => {}
            other => panic!("Expected Validation for excessive amount, got {other:?}"),
        }
    }

    #[test]
    fn second_create_for_same_order_fails() {
        let tenant_id = TenantId::new();
        let order_id = OrderId::new(AggregateId::new());
        let mut payment = Payment::empty(PaymentId::for_order(order_id));
        execute(&mut payment, &create_cmd(tenant_id, order_id, dec!(288))).unwrap();

        let err = payment
            .handle(&create_cmd(tenant_id, order_id, dec!(10)))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("already exists") => {}
            other => panic!("Expected duplicate payment Validation, got {other:?}"),
        }
    }

    #[test]
    fn payment_id_must_be_derived_from_order() {
        let order_id = OrderId::new(AggregateId::new());
        let stray = PaymentId(AggregateId::new());
        let payment = Payment::empty(stray);
        let mut cmd = create_cmd(TenantId::new(), order_id, dec!(10));
        if let PaymentCommand::CreatePayment(create) = &mut cmd {
            create.payment_id = stray;
        }
        assert!(matches!(
            payment.handle(&cmd),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn completion_stamps_paid_at_and_transaction() {
        let (payment, _, _) = payment_at(PaymentStatus::Completed);
        assert!(payment.paid_at().is_some());
        assert_eq!(payment.transaction_id(), Some("txn-001"));
    }

    #[test]
    fn full_and_partial_refunds() {
        let (full, _, _) = payment_at(PaymentStatus::Refunded);
        assert_eq!(full.refunded_amount(), dec!(288.00));
        assert!(full.notes().unwrap().contains("order returned"));

        let (partial, _, _) = payment_at(PaymentStatus::PartiallyRefunded);
        assert_eq!(partial.refunded_amount(), dec!(50));
        assert!(partial.notes().unwrap().contains("one item missing"));
    }

    #[test]
    fn refund_requires_completed_status() {
        let (payment, tenant_id, payment_id) = payment_at(PaymentStatus::Processing);
        let cmd = command_for(PaymentStatus::Refunded, tenant_id, payment_id).unwrap();
        let err = payment.handle(&cmd).unwrap_err();
        assert_eq!(err, DomainError::invalid_state("payment", "PROCESSING", "refund"));
    }

    #[test]
    fn refund_larger_than_paid_amount_fails() {
        let (payment, tenant_id, payment_id) = payment_at(PaymentStatus::Completed);
        let err = payment
            .handle(&PaymentCommand::RefundPayment(RefundPayment {
                tenant_id,
                payment_id,
                amount: Some(dec!(500)),
                reason: "oops".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn details_locked_after_completion_refund_or_failure() {
        for status in REACHABLE {
            let (payment, tenant_id, payment_id) = payment_at(status);
            let result = payment.handle(&PaymentCommand::UpdatePaymentDetails(UpdatePaymentDetails {
                tenant_id,
                payment_id,
                method: None,
                transaction_id: Some("txn-override".to_string()),
                notes: None,
                occurred_at: test_time(),
            }));
            assert_eq!(result.is_err(), status.locks_details(), "{status}: {result:?}");
        }
    }

    #[test]
    fn transition_table_is_exhaustively_enforced() {
        for from in REACHABLE {
            for to in REACHABLE {
                let (payment, tenant_id, payment_id) = payment_at(from);
                let Some(cmd) = command_for(to, tenant_id, payment_id) else {
                    continue;
                };
                let result = payment.handle(&cmd);
                assert_eq!(
                    result.is_ok(),
                    from.can_transition_to(to),
                    "{from} -> {to} returned {result:?}"
                );
            }
        }
        assert!(PaymentStatus::Disputed.is_terminal());
    }
}
