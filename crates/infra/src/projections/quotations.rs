use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use procura_core::{AggregateId, CompanyId, SupplierId, TenantId};
use procura_events::EventEnvelope;
use procura_quotation::{QuotationEvent, QuotationId, QuotationStatus};
use procura_rfq::RfqId;

use crate::read_model::TenantStore;

pub const QUOTATION_AGGREGATE_TYPE: &str = "procurement.quotation";

/// One row per quotation version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationSummary {
    pub quotation_id: QuotationId,
    pub rfq_id: RfqId,
    pub company_id: CompanyId,
    pub supplier_id: SupplierId,
    pub version_number: u32,
    pub status: QuotationStatus,
    pub duplicated_from: Option<QuotationId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum QuotationProjectionError {
    #[error("failed to deserialize quotation event: {0}")]
    Deserialize(String),
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Index of quotation versions by RFQ and supplier.
///
/// Backs version numbering, the versions listing, the comparison view and the
/// RFQ delete guard.
#[derive(Debug)]
pub struct QuotationIndexProjection<S>
where
    S: TenantStore<QuotationId, QuotationSummary>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> QuotationIndexProjection<S>
where
    S: TenantStore<QuotationId, QuotationSummary>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => cursors
                .get(&CursorKey {
                    tenant_id,
                    aggregate_id,
                })
                .copied()
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    fn advance(&self, tenant_id: TenantId, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(
                CursorKey {
                    tenant_id,
                    aggregate_id,
                },
                seq,
            );
        }
    }

    pub fn get(&self, tenant_id: TenantId, quotation_id: &QuotationId) -> Option<QuotationSummary> {
        self.store.get(tenant_id, quotation_id)
    }

    /// Every version for an RFQ, ordered by supplier then version.
    pub fn by_rfq(&self, tenant_id: TenantId, rfq_id: RfqId) -> Vec<QuotationSummary> {
        let mut rows = self.store.list_where(tenant_id, &|q| q.rfq_id == rfq_id);
        rows.sort_by_key(|q| (*q.supplier_id.as_uuid(), q.version_number));
        rows
    }

    /// Version history of one supplier's quotation for an RFQ, oldest first.
    pub fn versions(
        &self,
        tenant_id: TenantId,
        rfq_id: RfqId,
        supplier_id: SupplierId,
    ) -> Vec<QuotationSummary> {
        let mut rows = self
            .store
            .list_where(tenant_id, &|q| q.rfq_id == rfq_id && q.supplier_id == supplier_id);
        rows.sort_by_key(|q| q.version_number);
        rows
    }

    pub fn count_for_rfq(&self, tenant_id: TenantId, rfq_id: RfqId) -> u64 {
        self.store.list_where(tenant_id, &|q| q.rfq_id == rfq_id).len() as u64
    }

    /// `max(existing) + 1`, or 1 for the first quotation of the pair.
    pub fn next_version(&self, tenant_id: TenantId, rfq_id: RfqId, supplier_id: SupplierId) -> u32 {
        self.versions(tenant_id, rfq_id, supplier_id)
            .last()
            .map(|q| q.version_number + 1)
            .unwrap_or(1)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), QuotationProjectionError> {
        if envelope.aggregate_type() != QUOTATION_AGGREGATE_TYPE {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.cursor(tenant_id, aggregate_id);
        if seq == 0 {
            return Err(QuotationProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 {
            return Err(QuotationProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: QuotationEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| QuotationProjectionError::Deserialize(e.to_string()))?;

        if ev.tenant_id() != tenant_id {
            return Err(QuotationProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        let quotation_id = ev.quotation_id();
        if quotation_id.0 != aggregate_id {
            return Err(QuotationProjectionError::TenantIsolation(
                "event quotation_id does not match envelope aggregate_id".to_string(),
            ));
        }

        let status = match &ev {
            QuotationEvent::QuotationCreated(e) => {
                self.store.upsert(
                    tenant_id,
                    quotation_id,
                    QuotationSummary {
                        quotation_id,
                        rfq_id: e.rfq_id,
                        company_id: e.company_id,
                        supplier_id: e.supplier_id,
                        version_number: e.version_number,
                        status: QuotationStatus::Draft,
                        duplicated_from: e.duplicated_from,
                    },
                );
                None
            }
            QuotationEvent::QuotationSubmitted(_) => Some(QuotationStatus::Submitted),
            QuotationEvent::QuotationReviewStarted(_) => Some(QuotationStatus::UnderReview),
            QuotationEvent::QuotationAccepted(_) => Some(QuotationStatus::Accepted),
            QuotationEvent::QuotationRejected(_) => Some(QuotationStatus::Rejected),
            QuotationEvent::QuotationExpired(_) => Some(QuotationStatus::Expired),
            QuotationEvent::QuotationTermsUpdated(_)
            | QuotationEvent::QuotationItemAdded(_)
            | QuotationEvent::QuotationItemUpdated(_)
            | QuotationEvent::QuotationItemRemoved(_) => None,
        };

        if let Some(status) = status {
            if let Some(mut row) = self.store.get(tenant_id, &quotation_id) {
                row.status = status;
                self.store.upsert(tenant_id, quotation_id, row);
            }
        }

        self.advance(tenant_id, aggregate_id, seq);
        Ok(())
    }

    /// Clear the affected tenants and replay in stream order.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), QuotationProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        let mut tenants = envs.iter().map(|e| e.tenant_id()).collect::<Vec<_>>();
        tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
        tenants.dedup();
        for t in tenants {
            self.store.clear_tenant(t);
            if let Ok(mut cursors) = self.cursors.write() {
                cursors.retain(|k, _| k.tenant_id != t);
            }
        }

        envs.sort_by_key(|e| {
            (
                *e.tenant_id().as_uuid().as_bytes(),
                *e.aggregate_id().as_uuid().as_bytes(),
                e.sequence_number(),
            )
        });

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use procura_quotation::{QuotationCreated, QuotationDecision, QuotationTerms};
    use uuid::Uuid;

    use crate::read_model::InMemoryTenantStore;

    fn projection() -> QuotationIndexProjection<InMemoryTenantStore<QuotationId, QuotationSummary>> {
        QuotationIndexProjection::new(InMemoryTenantStore::new())
    }

    fn envelope(tenant_id: TenantId, id: QuotationId, seq: u64, ev: &QuotationEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            tenant_id,
            id.0,
            QUOTATION_AGGREGATE_TYPE.to_string(),
            seq,
            serde_json::to_value(ev).unwrap(),
        )
    }

    fn created(tenant_id: TenantId, id: QuotationId, rfq_id: RfqId, supplier_id: SupplierId, version: u32) -> QuotationEvent {
        QuotationEvent::QuotationCreated(QuotationCreated {
            tenant_id,
            quotation_id: id,
            rfq_id,
            company_id: CompanyId::new(),
            supplier_id,
            version_number: version,
            rfq_item_lines: vec![1],
            terms: QuotationTerms {
                currency: "USD".to_string(),
                valid_until: Some((Utc::now() + Duration::days(30)).date_naive()),
                delivery_days: None,
                payment_terms: None,
                warranty_terms: None,
                notes: None,
            },
            items: vec![],
            duplicated_from: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn tracks_versions_and_status_per_rfq_and_supplier() {
        let p = projection();
        let tenant_id = TenantId::new();
        let rfq_id = RfqId::new(AggregateId::new());
        let supplier_id = SupplierId::new();
        let v1 = QuotationId::new(AggregateId::new());
        let v2 = QuotationId::new(AggregateId::new());

        assert_eq!(p.next_version(tenant_id, rfq_id, supplier_id), 1);
        p.apply_envelope(&envelope(tenant_id, v1, 1, &created(tenant_id, v1, rfq_id, supplier_id, 1)))
            .unwrap();
        p.apply_envelope(&envelope(tenant_id, v2, 1, &created(tenant_id, v2, rfq_id, supplier_id, 2)))
            .unwrap();
        let submitted = QuotationEvent::QuotationSubmitted(QuotationDecision {
            tenant_id,
            quotation_id: v1,
            occurred_at: Utc::now(),
        });
        p.apply_envelope(&envelope(tenant_id, v1, 2, &submitted)).unwrap();
        // Redelivery is a no-op.
        p.apply_envelope(&envelope(tenant_id, v1, 2, &submitted)).unwrap();

        let versions = p.versions(tenant_id, rfq_id, supplier_id);
        assert_eq!(versions.iter().map(|q| q.version_number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(versions[0].status, QuotationStatus::Submitted);
        assert_eq!(p.next_version(tenant_id, rfq_id, supplier_id), 3);
        assert_eq!(p.count_for_rfq(tenant_id, rfq_id), 2);
        assert_eq!(p.count_for_rfq(TenantId::new(), rfq_id), 0);
    }

    #[test]
    fn rejects_gaps_and_foreign_tenants() {
        let p = projection();
        let tenant_id = TenantId::new();
        let id = QuotationId::new(AggregateId::new());
        let ev = created(tenant_id, id, RfqId::new(AggregateId::new()), SupplierId::new(), 1);

        let err = p.apply_envelope(&envelope(tenant_id, id, 3, &ev)).unwrap_err();
        assert!(matches!(err, QuotationProjectionError::NonMonotonicSequence { last: 0, found: 3 }));

        let err = p.apply_envelope(&envelope(TenantId::new(), id, 1, &ev)).unwrap_err();
        assert!(matches!(err, QuotationProjectionError::TenantIsolation(_)));
    }

    #[test]
    fn rebuild_replays_out_of_order_input() {
        let p = projection();
        let tenant_id = TenantId::new();
        let rfq_id = RfqId::new(AggregateId::new());
        let id = QuotationId::new(AggregateId::new());
        let accepted = QuotationEvent::QuotationAccepted(QuotationDecision {
            tenant_id,
            quotation_id: id,
            occurred_at: Utc::now(),
        });

        p.rebuild_from_scratch(vec![
            envelope(tenant_id, id, 2, &accepted),
            envelope(tenant_id, id, 1, &created(tenant_id, id, rfq_id, SupplierId::new(), 1)),
        ])
        .unwrap();

        assert_eq!(p.get(tenant_id, &id).unwrap().status, QuotationStatus::Accepted);
    }
}
