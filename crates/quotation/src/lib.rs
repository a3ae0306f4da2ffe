//! Quotation domain module (supplier bids against an RFQ, event-sourced).
//!
//! Each quotation is one version in an append-only chain per (rfq, supplier).
//! Totals are always derived from items; nothing sets them directly.

pub mod comparison;
pub mod quotation;

pub use comparison::{ComparisonRecord, SupplierProfile, compare_quotations};
pub use quotation::{
    AcceptQuotation, AddQuotationItem, ApplyItemDiscount, CreateQuotation, ExpireQuotation,
    Quotation, QuotationCommand, QuotationCreated, QuotationDecision, QuotationEvent, QuotationId,
    QuotationItem, QuotationItemChanged, QuotationItemInput, QuotationItemRemoved,
    QuotationRejected, QuotationStatus, QuotationTerms, QuotationTermsUpdated, RejectQuotation,
    RemoveQuotationItem, StartReview, SubmitQuotation, UpdateQuotationItem, UpdateQuotationTerms,
    quotation_total,
};
