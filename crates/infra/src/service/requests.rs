//! Request payloads for [`ProcurementService`](super::ProcurementService).
//!
//! Identifiers of the target entity are passed alongside these; the payloads
//! carry only what the caller decides.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{CompanyId, SupplierId};
use procura_orders::OrderId;
use procura_pricing::DiscountType;
use procura_quotation::{QuotationId, QuotationItemInput, QuotationTerms};
use procura_rfq::{RfqId, RfqType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRfq {
    pub company_id: CompanyId,
    pub title: String,
    pub description: Option<String>,
    pub rfq_type: RfqType,
    pub submission_deadline: DateTime<Utc>,
    pub expected_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqDetails {
    pub title: String,
    pub description: Option<String>,
    pub submission_deadline: DateTime<Utc>,
    pub expected_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuotation {
    pub rfq_id: RfqId,
    pub supplier_id: SupplierId,
    /// `None` quotes in the configured default currency with no other terms.
    pub terms: Option<QuotationTerms>,
    pub items: Vec<QuotationItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDiscount {
    pub line_no: u32,
    pub discount_type: DiscountType,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub quotation_id: QuotationId,
    pub company_id: CompanyId,
    pub delivery_address: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Partial update: `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: Decimal,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

/// Partial update: `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    /// `None` refunds the full paid amount.
    pub amount: Option<Decimal>,
    pub reason: String,
}
