//! Read models built from committed procurement events.
//!
//! Projections are rebuildable from the event store, tenant-isolated and
//! idempotent under at-least-once delivery (replays at or below the cursor
//! are ignored).

pub mod quotations;

pub use quotations::{QuotationIndexProjection, QuotationProjectionError, QuotationSummary};
