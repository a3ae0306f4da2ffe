//! Side-by-side comparison of the quotations received for one RFQ.
//!
//! A read projection built on demand; nothing here is stored.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::SupplierId;

use crate::quotation::{Quotation, QuotationId, QuotationItem, QuotationStatus};

/// Supplier data shown next to each quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub name: String,
    pub rating: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub quotation_id: QuotationId,
    pub supplier_id: SupplierId,
    pub supplier_name: Option<String>,
    pub supplier_rating: Option<Decimal>,
    pub version_number: u32,
    pub status: QuotationStatus,
    pub currency: String,
    pub total_amount: Decimal,
    pub valid_until: Option<NaiveDate>,
    pub delivery_days: Option<u32>,
    pub payment_terms: Option<String>,
    pub warranty_terms: Option<String>,
    pub items: Vec<QuotationItem>,
}

impl ComparisonRecord {
    fn build(quotation: &Quotation, supplier_id: SupplierId, profile: Option<SupplierProfile>) -> Self {
        let terms = quotation.terms();
        let (supplier_name, supplier_rating) = match profile {
            Some(p) => (Some(p.name), p.rating),
            None => (None, None),
        };
        Self {
            quotation_id: quotation.id_typed(),
            supplier_id,
            supplier_name,
            supplier_rating,
            version_number: quotation.version_number(),
            status: quotation.status(),
            currency: terms.currency.clone(),
            total_amount: quotation.total_amount(),
            valid_until: terms.valid_until,
            delivery_days: terms.delivery_days,
            payment_terms: terms.payment_terms.clone(),
            warranty_terms: terms.warranty_terms.clone(),
            items: quotation.items().to_vec(),
        }
    }
}

/// One record per quotation, cheapest first (ties by supplier, then version).
///
/// `profile` resolves supplier name and rating; unknown suppliers still get a
/// record with those fields empty.
pub fn compare_quotations<'a, I, F>(quotations: I, profile: F) -> Vec<ComparisonRecord>
where
    I: IntoIterator<Item = &'a Quotation>,
    F: Fn(SupplierId) -> Option<SupplierProfile>,
{
    let mut records: Vec<ComparisonRecord> = quotations
        .into_iter()
        .filter(|q| q.exists())
        .filter_map(|q| {
            let supplier_id = q.supplier_id()?;
            Some(ComparisonRecord::build(q, supplier_id, profile(supplier_id)))
        })
        .collect();

    records.sort_by(|a, b| {
        a.total_amount
            .cmp(&b.total_amount)
            .then_with(|| a.supplier_id.as_uuid().cmp(b.supplier_id.as_uuid()))
            .then_with(|| a.version_number.cmp(&b.version_number))
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use procura_core::{AggregateId, CompanyId, TenantId};
    use procura_events::execute;
    use procura_rfq::RfqId;
    use rust_decimal_macros::dec;

    use crate::quotation::{CreateQuotation, QuotationCommand, QuotationItemInput, QuotationTerms};

    fn quotation(supplier_id: SupplierId, unit_price: Decimal) -> Quotation {
        let id = QuotationId::new(AggregateId::new());
        let mut q = Quotation::empty(id);
        let mut terms = QuotationTerms::in_currency("EUR");
        terms.delivery_days = Some(7);
        execute(
            &mut q,
            &QuotationCommand::CreateQuotation(CreateQuotation {
                tenant_id: TenantId::new(),
                quotation_id: id,
                rfq_id: RfqId::new(AggregateId::new()),
                company_id: CompanyId::new(),
                supplier_id,
                version_number: 1,
                rfq_item_lines: vec![1],
                terms,
                items: vec![QuotationItemInput {
                    rfq_item_line: Some(1),
                    product_id: None,
                    description: Some("desk".to_string()),
                    quantity: 3,
                    unit_price,
                    discount_amount: Decimal::ZERO,
                }],
                duplicated_from: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        q
    }

    #[test]
    fn records_are_sorted_cheapest_first_with_profiles() {
        let known = SupplierId::new();
        let unknown = SupplierId::new();
        let quotes = [quotation(known, dec!(50)), quotation(unknown, dec!(40))];

        let records = compare_quotations(quotes.iter(), |id| {
            (id == known).then(|| SupplierProfile {
                name: "Acme Furniture".to_string(),
                rating: Some(dec!(4.5)),
            })
        });

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].supplier_id, unknown);
        assert_eq!(records[0].total_amount, dec!(120));
        assert!(records[0].supplier_name.is_none());
        assert_eq!(records[1].supplier_name.as_deref(), Some("Acme Furniture"));
        assert_eq!(records[1].supplier_rating, Some(dec!(4.5)));
        assert_eq!(records[1].delivery_days, Some(7));
        assert_eq!(records[1].items.len(), 1);
    }
}
